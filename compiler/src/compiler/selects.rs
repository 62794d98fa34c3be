use gridquery_parser::{ast::ColumnPath, parse_column_path};

use crate::{
    columns::{Column, ColumnType},
    errors::{msg, Error},
    schema::ClarifiedPath,
    sql::expr::SqlExpr,
};

use super::{aggregates::AggregateFunction, constants::SEPARATOR, scope::Scope};

/// How a column is read from the database.
#[derive(Debug, Clone)]
pub enum Selection {
    Expr(SqlExpr),
    /// Several fields packed into one string with [`SEPARATOR`].
    Composed(SqlExpr),
    /// An editable value along with the key of the record it belongs to.
    Editable { value: SqlExpr, key: SqlExpr },
    Aggregate {
        value: SqlExpr,
        function: AggregateFunction,
    },
}

impl Selection {
    pub fn value(&self) -> &SqlExpr {
        match self {
            Selection::Expr(e) | Selection::Composed(e) => e,
            Selection::Editable { value, .. } | Selection::Aggregate { value, .. } => value,
        }
    }
}

/// What filters and search compare against for one column.
#[derive(Debug, Clone)]
pub enum FilterTarget {
    /// A named scope builds the predicate.
    Scope(String),
    Exprs(Vec<SqlExpr>),
    Composed(SqlExpr),
    Aggregate {
        value: SqlExpr,
        function: AggregateFunction,
    },
}

struct ResolvedField {
    expr: SqlExpr,
    /// The key of the record holding the field.
    key: SqlExpr,
    aggregate: Option<AggregateFunction>,
}

fn unresolved(column: &str, reason: String) -> Error {
    Error::UnresolvedSelect {
        column: column.to_string(),
        reason,
    }
}

fn resolve_field(
    scope: &mut Scope,
    name: &str,
    column_type: ColumnType,
    explicit_aggregate: Option<&str>,
) -> Result<ResolvedField, Error> {
    let path: ColumnPath =
        parse_column_path(name).map_err(|e| unresolved(name, msg::unparsable_column_name(&e)))?;
    let requested = path
        .aggregate
        .as_deref()
        .or(explicit_aggregate)
        .map(AggregateFunction::parse)
        .transpose()?;
    let base_table = scope.get_base_table();

    if path.is_base_column() {
        if requested.is_some() {
            return Err(unresolved(name, msg::aggregate_on_path_to_one()));
        }
        if !base_table.has_column(&path.field) {
            return Err(unresolved(
                name,
                msg::col_not_in_table(&path.field, &base_table.name),
            ));
        }
        let column = scope.base_column_expr(&path.field);
        return Ok(ResolvedField {
            expr: with_json_path(scope, column, &path.json_path),
            key: scope.key_expr(),
            aggregate: None,
        });
    }

    let clarified = ClarifiedPath::build(scope.schema, base_table, &path.relations)
        .map_err(|reason| unresolved(name, reason))?;
    let ending_table = clarified.ending_table;
    if !ending_table.has_column(&path.field) {
        return Err(unresolved(
            name,
            msg::col_not_in_table(&path.field, &ending_table.name),
        ));
    }

    if clarified.is_to_many() {
        let function = requested.unwrap_or_else(|| AggregateFunction::default_for(column_type));
        let value = scope
            .aggregate_value(&clarified, &path.field, function)
            .map_err(|reason| unresolved(name, reason))?;
        return Ok(ResolvedField {
            expr: value,
            key: scope.key_expr(),
            aggregate: Some(function),
        });
    }

    if requested.is_some() {
        return Err(unresolved(name, msg::aggregate_on_path_to_one()));
    }
    let alias = scope
        .join_chain_to_one(&clarified.relations)
        .map_err(|reason| unresolved(name, reason))?;
    let column = scope.table_column_expr(&alias, &path.field);
    Ok(ResolvedField {
        expr: with_json_path(scope, column, &path.json_path),
        key: scope.table_column_expr(&alias, &ending_table.primary_key),
        aggregate: None,
    })
}

fn with_json_path(scope: &Scope, column: SqlExpr, json_path: &[String]) -> SqlExpr {
    if json_path.is_empty() {
        column
    } else {
        scope.dialect().json_extract(column, json_path)
    }
}

/// Resolve the select of the column at `index`, once per query. Label and scope columns have
/// none.
pub fn resolve_selection(
    scope: &mut Scope,
    index: usize,
    column: &Column,
) -> Result<Option<Selection>, Error> {
    if let Some(selection) = scope.memoized(index) {
        return Ok(selection.clone());
    }
    let selection = if !column.is_selected() {
        None
    } else if let Some(select) = &column.select {
        Some(Selection::Expr(SqlExpr::raw(select.as_str())))
    } else if !column.additional_selects.is_empty() {
        let mut parts = Vec::with_capacity(column.additional_selects.len());
        for field in &column.additional_selects {
            parts.push(resolve_field(scope, field, ColumnType::String, None)?.expr);
        }
        if parts.len() == 1 {
            parts.pop().map(Selection::Expr)
        } else {
            Some(Selection::Composed(scope.dialect().concat(parts, SEPARATOR)))
        }
    } else {
        let resolved = resolve_field(
            scope,
            &column.name,
            column.column_type,
            column.aggregate.as_deref(),
        )?;
        Some(match (resolved.aggregate, column.is_editable()) {
            (Some(function), _) => Selection::Aggregate {
                value: resolved.expr,
                function,
            },
            (None, true) => Selection::Editable {
                value: resolved.expr,
                key: resolved.key,
            },
            (None, false) => Selection::Expr(resolved.expr),
        })
    };
    scope.memoize(index, selection.clone());
    Ok(selection)
}

pub fn filter_target(
    scope: &mut Scope,
    index: usize,
    column: &Column,
) -> Result<FilterTarget, Error> {
    if let Some(name) = &column.scope_filter {
        return Ok(FilterTarget::Scope(name.clone()));
    }
    if !column.filter_on.is_empty() {
        let exprs = column
            .filter_on
            .iter()
            .map(|e| SqlExpr::raw(e.as_str()))
            .collect();
        return Ok(FilterTarget::Exprs(exprs));
    }
    if column.raw {
        if let Some(sort) = column.sort.as_ref().or(column.select.as_ref()) {
            return Ok(FilterTarget::Exprs(vec![SqlExpr::raw(sort.as_str())]));
        }
    }
    Ok(match resolve_selection(scope, index, column)? {
        None => FilterTarget::Exprs(Vec::new()),
        Some(Selection::Expr(e)) => FilterTarget::Exprs(vec![e]),
        Some(Selection::Editable { value, .. }) => FilterTarget::Exprs(vec![value]),
        Some(Selection::Composed(e)) => FilterTarget::Composed(e),
        Some(Selection::Aggregate { value, function }) => {
            FilterTarget::Aggregate { value, function }
        }
    })
}
