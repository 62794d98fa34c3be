use std::collections::HashSet;

use crate::{
    columns::ColumnType,
    errors::{msg, Error},
    schema::{ClarifiedPath, Schema},
    sql::{
        expr::{
            build::{agg, cmp, cond, value},
            SqlExpr,
        },
        tree::{Column, Join, JoinType, Select},
        Dialect,
    },
    state::Operand,
};

use super::constants::{CTE_PK_COLUMN_ALIAS, CTE_VALUE_COLUMN_ALIAS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    GroupConcat,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn parse(name: &str) -> Result<Self, Error> {
        match name.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(AggregateFunction::Count),
            "group_concat" | "string_agg" => Ok(AggregateFunction::GroupConcat),
            "sum" => Ok(AggregateFunction::Sum),
            "avg" | "average" => Ok(AggregateFunction::Avg),
            "min" => Ok(AggregateFunction::Min),
            "max" => Ok(AggregateFunction::Max),
            _ => Err(Error::InvalidAggregate(name.to_string())),
        }
    }

    /// Text columns list their related values, everything else counts them.
    pub fn default_for(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::String | ColumnType::Editable | ColumnType::Json => {
                AggregateFunction::GroupConcat
            }
            _ => AggregateFunction::Count,
        }
    }

    pub fn apply(&self, dialect: &dyn Dialect, a: SqlExpr) -> SqlExpr {
        match self {
            AggregateFunction::Count => agg::count(a),
            AggregateFunction::GroupConcat => dialect.group_concat(a),
            AggregateFunction::Sum => agg::sum(a),
            AggregateFunction::Avg => agg::avg(a),
            AggregateFunction::Min => agg::min(a),
            AggregateFunction::Max => agg::max(a),
        }
    }

    pub fn is_count(&self) -> bool {
        *self == AggregateFunction::Count
    }
}

/// Identifies one aggregate sub-select so that columns and filters sharing it reuse the CTE.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    pub relation_path: String,
    pub field: String,
    pub function: AggregateFunction,
}

/// Build the grouped select behind an aggregate CTE. The first link's end column becomes the
/// `pk` column; the aggregated field becomes the `v` column.
pub fn build_cte_select(
    schema: &Schema,
    dialect: &dyn Dialect,
    path: &ClarifiedPath,
    field: &str,
    function: AggregateFunction,
) -> Result<(Select, String), String> {
    let table_column =
        |table: &str, column: &str| SqlExpr::atom(dialect.table_column(table, column));
    let table_name = |id| {
        schema
            .get_table(id)
            .map(|t| t.name.clone())
            .ok_or_else(|| msg::unknown_table_id(id))
    };

    let mut links = path.links();
    let first = links.next().ok_or_else(msg::aggregate_on_path_to_one)?;
    let start_table = table_name(first.end.table_id)?;
    let key = table_column(&start_table, &first.end.column);

    let mut aliases = HashSet::from([start_table.clone()]);
    let mut current_alias = start_table.clone();
    let mut joins = Vec::new();
    for link in links {
        let table = table_name(link.end.table_id)?;
        let alias = unique_alias(&mut aliases, &table);
        joins.push(Join {
            table,
            alias: alias.clone(),
            conditions: cmp::eq(
                table_column(&current_alias, &link.start.column),
                table_column(&alias, &link.end.column),
            ),
            join_type: JoinType::Inner,
        });
        current_alias = alias;
    }

    let aggregated = function.apply(dialect, table_column(&current_alias, field));
    let mut select = Select::from(start_table);
    select.columns = vec![
        Column::new(key.clone(), Some(CTE_PK_COLUMN_ALIAS.to_string())),
        Column::new(aggregated, Some(CTE_VALUE_COLUMN_ALIAS.to_string())),
    ];
    select.joins = joins;
    select.grouping = vec![key];
    Ok((select, first.start.column.clone()))
}

fn unique_alias(aliases: &mut HashSet<String>, ideal: &str) -> String {
    let mut suffix_index: usize = 0;
    loop {
        let alias = if suffix_index == 0 {
            ideal.to_owned()
        } else {
            format!("{}_{}", ideal, suffix_index)
        };
        if aliases.insert(alias.clone()) {
            return alias;
        }
        suffix_index += 1;
    }
}

/// The value of an aggregate as seen by the outer query. Counts of no rows read as zero.
pub fn outer_value(cte_value: SqlExpr, function: AggregateFunction) -> SqlExpr {
    if function.is_count() {
        cond::coalesce([cte_value, value::zero()])
    } else {
        cte_value
    }
}

/// An aggregate value that is empty: no related rows for counts, no value otherwise.
pub fn is_empty(a: SqlExpr, function: AggregateFunction) -> SqlExpr {
    if function.is_count() {
        cmp::eq(a, value::zero())
    } else {
        cmp::is_null(a)
    }
}

/// A boolean filter on an aggregate: whether any related value exists.
pub fn has_any(a: SqlExpr, function: AggregateFunction, wanted: bool) -> SqlExpr {
    match (function.is_count(), wanted) {
        (true, true) => cmp::gte(a, value::one()),
        (true, false) => cmp::lt(a, value::one()),
        (false, true) => cmp::is_not_null(a),
        (false, false) => cmp::is_null(a),
    }
}

/// Compare an aggregate value with a rule operand. `needle` is already a literal or pattern.
pub fn compare(
    a: SqlExpr,
    function: AggregateFunction,
    operand: Option<Operand>,
    needle: SqlExpr,
) -> SqlExpr {
    match operand {
        None | Some(Operand::Eq) | Some(Operand::Equals) | Some(Operand::Includes) => {
            cmp::eq(a, needle)
        }
        Some(Operand::Neq) | Some(Operand::DoesNotEqual) | Some(Operand::DoesNotInclude) => {
            cmp::neq(a, needle)
        }
        Some(Operand::Gt) => cmp::gt(a, needle),
        Some(Operand::Lt) => cmp::lt(a, needle),
        Some(Operand::Gte) => cmp::gte(a, needle),
        Some(Operand::Lte) => cmp::lte(a, needle),
        Some(Operand::Contains) | Some(Operand::BeginsWith) | Some(Operand::EndsWith) => {
            cmp::like(a, needle)
        }
        Some(Operand::DoesNotContain) => cmp::nlike(a, needle),
        Some(Operand::IsEmpty) => is_empty(a, function),
        Some(Operand::IsNotEmpty) => cmp::not(is_empty(a, function)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_names_only() {
        assert_eq!(
            AggregateFunction::parse("GROUP_CONCAT").unwrap(),
            AggregateFunction::GroupConcat
        );
        assert_eq!(AggregateFunction::parse("avg").unwrap(), AggregateFunction::Avg);
        assert!(matches!(
            AggregateFunction::parse("drop table"),
            Err(Error::InvalidAggregate(_))
        ));
    }

    #[test]
    fn default_depends_on_type() {
        assert_eq!(
            AggregateFunction::default_for(ColumnType::String),
            AggregateFunction::GroupConcat
        );
        assert_eq!(
            AggregateFunction::default_for(ColumnType::Number),
            AggregateFunction::Count
        );
    }

    #[test]
    fn emptiness_depends_on_function() {
        let a = SqlExpr::atom("v".to_string());
        assert_eq!(is_empty(a.clone(), AggregateFunction::Count).content, "v = 0");
        assert_eq!(is_empty(a.clone(), AggregateFunction::Max).content, "v IS NULL");
        assert_eq!(
            has_any(a, AggregateFunction::Count, false).content,
            "v < 1"
        );
    }
}
