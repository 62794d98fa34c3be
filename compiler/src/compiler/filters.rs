use std::collections::BTreeMap;

use serde_json::Value;
use tracing::trace;

use crate::{
    columns::{display_text, parse_time, Column, ColumnType},
    errors::Error,
    sql::expr::{
        build::{cmp, math, strings, value},
        SqlExpr,
    },
    state::{ActiveFilters, NumberRange, ValueRange},
};

use super::{
    aggregates::{self, AggregateFunction},
    query_scopes::ScopeCall,
    scope::Scope,
    selects::{filter_target, FilterTarget},
    values,
};

/// Case-insensitive substring (or prefix/suffix) match.
pub fn lower_like(scope: &Scope, expr: SqlExpr, needle: &str, before: bool, after: bool) -> SqlExpr {
    let dialect = scope.dialect();
    cmp::like(
        strings::lower(dialect.text(expr)),
        values::pattern(dialect, needle, before, after),
    )
}

/// Call a named scope for its condition.
pub fn scope_condition(scope: &Scope, name: &str, argument: &Value) -> Result<SqlExpr, Error> {
    let f = scope
        .query_scopes
        .get(name)
        .ok_or_else(|| Error::UnknownScope(name.to_string()))?;
    let call = ScopeCall {
        dialect: scope.dialect(),
        table: &scope.get_base_table().name,
        argument,
    };
    Ok(f(&call).condition)
}

fn column_at(columns: &[Column], index: usize) -> Result<&Column, Error> {
    columns.get(index).ok_or(Error::InvalidColumnIndex(index))
}

fn is_text_like(column: &Column) -> bool {
    matches!(
        column.column_type,
        ColumnType::String | ColumnType::Editable | ColumnType::Json
    )
}

/// Every per-column filter, in a fixed order. Columns are ANDed together.
pub fn filter_conditions(
    scope: &mut Scope,
    columns: &[Column],
    filters: &ActiveFilters,
) -> Result<Vec<SqlExpr>, Error> {
    let config = &scope.options.config;
    let date_bounds = (
        config.default_date_start.clone(),
        config.default_date_end.clone(),
    );
    let datetime_bounds = (
        format!("{} {}", config.default_date_start, config.default_time_start),
        format!("{} {}", config.default_date_end, config.default_time_end),
    );
    Ok(vec![
        select_filters(scope, columns, &filters.select)?,
        boolean_filters(scope, columns, &filters.boolean)?,
        text_filters(scope, columns, &filters.text)?,
        number_filters(scope, columns, &filters.number)?,
        range_filters(scope, columns, &filters.date, &date_bounds)?,
        range_filters(scope, columns, &filters.datetime, &datetime_bounds)?,
        time_filters(scope, columns, &filters.time)?,
    ])
}

fn select_filters(
    scope: &mut Scope,
    columns: &[Column],
    filters: &BTreeMap<usize, Vec<Value>>,
) -> Result<SqlExpr, Error> {
    let mut conditions = Vec::new();
    for (&index, selected) in filters {
        if selected.is_empty() {
            continue;
        }
        let column = column_at(columns, index)?;
        let target = filter_target(scope, index, column)?;
        let mut alternatives = Vec::new();
        for v in selected {
            let needle = display_text(v);
            alternatives.push(match &target {
                FilterTarget::Scope(name) => scope_condition(scope, name, v)?,
                FilterTarget::Aggregate {
                    value: a,
                    function: AggregateFunction::GroupConcat,
                } => lower_like(scope, a.clone(), &needle, true, true),
                FilterTarget::Aggregate { value: a, .. } => {
                    cmp::eq(a.clone(), values::literal(scope.dialect(), v))
                }
                FilterTarget::Composed(e) => lower_like(scope, e.clone(), &needle, true, true),
                FilterTarget::Exprs(exprs) => cmp::or(exprs.iter().map(|e| {
                    if column.column_type == ColumnType::Json {
                        lower_like(scope, e.clone(), &needle, true, true)
                    } else {
                        cmp::eq(e.clone(), values::literal(scope.dialect(), v))
                    }
                })),
            });
        }
        conditions.push(cmp::or(alternatives));
    }
    Ok(cmp::and(conditions))
}

fn boolean_filters(
    scope: &mut Scope,
    columns: &[Column],
    filters: &BTreeMap<usize, Option<bool>>,
) -> Result<SqlExpr, Error> {
    let mut conditions = Vec::new();
    for (&index, wanted) in filters {
        let Some(wanted) = *wanted else {
            continue;
        };
        let column = column_at(columns, index)?;
        let condition = match filter_target(scope, index, column)? {
            FilterTarget::Scope(name) => scope_condition(scope, &name, &Value::Bool(wanted))?,
            FilterTarget::Aggregate { value: a, function } => {
                aggregates::has_any(a, function, wanted)
            }
            FilterTarget::Composed(e) => truthiness(scope, e, true, wanted),
            FilterTarget::Exprs(exprs) => cmp::and(
                exprs
                    .into_iter()
                    .map(|e| truthiness(scope, e, is_text_like(column), wanted)),
            ),
        };
        conditions.push(condition);
    }
    Ok(cmp::and(conditions))
}

/// Text is true when present and non-blank; anything else when positive.
fn truthiness(scope: &Scope, e: SqlExpr, text: bool, wanted: bool) -> SqlExpr {
    let blank = values::text(scope.dialect(), "");
    match (text, wanted) {
        (true, true) => cmp::and([cmp::is_not_null(e.clone()), cmp::neq(e, blank)]),
        (true, false) => cmp::or([cmp::is_null(e.clone()), cmp::eq(e, blank)]),
        (false, true) => cmp::gt(e, value::zero()),
        (false, false) => cmp::or([cmp::is_null(e.clone()), cmp::eq(e, value::zero())]),
    }
}

fn text_filters(
    scope: &mut Scope,
    columns: &[Column],
    filters: &BTreeMap<usize, Vec<String>>,
) -> Result<SqlExpr, Error> {
    let mut conditions = Vec::new();
    for (&index, entries) in filters {
        let tokens = entries
            .iter()
            .flat_map(|e| e.split_whitespace())
            .collect::<Vec<_>>();
        if tokens.is_empty() {
            continue;
        }
        let column = column_at(columns, index)?;
        let target = filter_target(scope, index, column)?;
        let mut alternatives = Vec::new();
        for token in tokens {
            alternatives.push(match &target {
                FilterTarget::Scope(name) => {
                    scope_condition(scope, name, &Value::String(token.to_string()))?
                }
                FilterTarget::Aggregate { value: a, .. } | FilterTarget::Composed(a) => {
                    lower_like(scope, a.clone(), token, true, true)
                }
                FilterTarget::Exprs(exprs) => cmp::or(
                    exprs
                        .iter()
                        .map(|e| lower_like(scope, e.clone(), token, true, true)),
                ),
            });
        }
        conditions.push(cmp::or(alternatives));
    }
    Ok(cmp::and(conditions))
}

fn number_filters(
    scope: &mut Scope,
    columns: &[Column],
    filters: &BTreeMap<usize, NumberRange>,
) -> Result<SqlExpr, Error> {
    let mut conditions = Vec::new();
    for (&index, range) in filters {
        if range.is_empty() {
            continue;
        }
        let column = column_at(columns, index)?;
        let subject = match filter_target(scope, index, column)? {
            FilterTarget::Scope(name) => {
                let config = &scope.options.config;
                let bounds = Value::from(vec![
                    range.start().unwrap_or(config.number_min),
                    range.end().unwrap_or(config.number_max),
                ]);
                conditions.push(scope_condition(scope, &name, &bounds)?);
                continue;
            }
            FilterTarget::Aggregate { value: a, .. } => a,
            FilterTarget::Composed(e) => e,
            FilterTarget::Exprs(exprs) => match exprs.into_iter().next() {
                Some(e) => e,
                None => continue,
            },
        };
        let subject = match column.round {
            Some(places) => math::round(subject, places),
            None => subject,
        };
        let bounds = [
            range.start().map(|s| cmp::gte(subject.clone(), value::number(s))),
            range.end().map(|e| cmp::lte(subject.clone(), value::number(e))),
        ];
        conditions.push(cmp::and(bounds.into_iter().flatten()));
    }
    Ok(cmp::and(conditions))
}

/// The first filter expression, or a scope call with both bounds filled in.
enum RangeSubject {
    Expr(SqlExpr),
    Scope(String),
}

fn range_subject(
    scope: &mut Scope,
    index: usize,
    column: &Column,
) -> Result<Option<RangeSubject>, Error> {
    Ok(match filter_target(scope, index, column)? {
        FilterTarget::Scope(name) => Some(RangeSubject::Scope(name)),
        FilterTarget::Aggregate { value: a, .. } | FilterTarget::Composed(a) => {
            Some(RangeSubject::Expr(a))
        }
        FilterTarget::Exprs(exprs) => exprs.into_iter().next().map(RangeSubject::Expr),
    })
}

fn range_filters(
    scope: &mut Scope,
    columns: &[Column],
    filters: &BTreeMap<usize, ValueRange>,
    defaults: &(String, String),
) -> Result<SqlExpr, Error> {
    let mut conditions = Vec::new();
    for (&index, range) in filters {
        if range.is_empty() {
            trace!(index, "skipping empty range filter");
            continue;
        }
        let column = column_at(columns, index)?;
        let start = range.start().unwrap_or(defaults.0.as_str());
        let end = range.end().unwrap_or(defaults.1.as_str());
        match range_subject(scope, index, column)? {
            Some(RangeSubject::Scope(name)) => {
                let bounds = Value::from(vec![start, end]);
                conditions.push(scope_condition(scope, &name, &bounds)?);
            }
            Some(RangeSubject::Expr(e)) => {
                let dialect = scope.dialect();
                conditions.push(cmp::between(
                    e,
                    values::text(dialect, start),
                    values::text(dialect, end),
                ));
            }
            None => {}
        }
    }
    Ok(cmp::and(conditions))
}

fn normalized_time(s: &str) -> Result<String, Error> {
    parse_time(s)
        .map(|t| t.format("%H:%M:%S").to_string())
        .ok_or_else(|| Error::InvalidTime(s.to_string()))
}

fn time_filters(
    scope: &mut Scope,
    columns: &[Column],
    filters: &BTreeMap<usize, ValueRange>,
) -> Result<SqlExpr, Error> {
    let config = scope.options.config.clone();
    let day_start = normalized_time(&config.default_time_start)?;
    let day_end = normalized_time(&config.default_time_end)?;
    let mut conditions = Vec::new();
    for (&index, range) in filters {
        if range.is_empty() {
            trace!(index, "skipping empty range filter");
            continue;
        }
        let column = column_at(columns, index)?;
        let start = match range.start() {
            Some(s) => normalized_time(s)?,
            None => day_start.clone(),
        };
        let end = match range.end() {
            Some(e) => normalized_time(e)?,
            None => day_end.clone(),
        };
        match range_subject(scope, index, column)? {
            Some(RangeSubject::Scope(name)) => {
                let bounds = Value::from(vec![start, end]);
                conditions.push(scope_condition(scope, &name, &bounds)?);
            }
            Some(RangeSubject::Expr(e)) => {
                let dialect = scope.dialect();
                let text = |s: &str| values::text(dialect, s);
                let condition = if end < start {
                    // Wraps past midnight.
                    cmp::or([
                        cmp::between(e.clone(), text(&start), text(&day_end)),
                        cmp::between(e, text(&day_start), text(&end)),
                    ])
                } else {
                    cmp::between(e, text(&start), text(&end))
                };
                conditions.push(condition);
            }
            None => {}
        }
    }
    Ok(cmp::and(conditions))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        compiler::query_scopes::QueryScopes,
        options::Options,
        tests::test_utils::{clean, posts_schema},
    };

    fn where_clause(columns: &[Column], filters: &ActiveFilters) -> String {
        let options = Options::default();
        let schema = posts_schema();
        let scopes = QueryScopes::default();
        let mut scope = Scope::build(&options, &schema, &scopes, "posts").unwrap();
        let conditions = filter_conditions(&mut scope, columns, filters).unwrap();
        clean(&cmp::and(conditions).to_string())
    }

    /// The quoted bounds of each `BETWEEN`, in order.
    fn between_bounds(sql: &str) -> Vec<(String, String)> {
        sql.split(" BETWEEN ")
            .skip(1)
            .filter_map(|part| {
                let quoted = part.split('\'').collect::<Vec<_>>();
                Some((quoted.get(1)?.to_string(), quoted.get(3)?.to_string()))
            })
            .collect()
    }

    #[test]
    fn select_values_are_alternatives() {
        let columns = vec![Column::name("category")];
        let mut filters = ActiveFilters::default();
        filters.select.insert(0, vec![json!("news"), json!("howto")]);
        assert_eq!(
            where_clause(&columns, &filters),
            "\"posts\".\"category\" = 'news' OR \"posts\".\"category\" = 'howto'"
        );
    }

    #[test]
    fn text_tokens_are_alternatives() {
        let columns = vec![Column::name("subject")];
        let mut filters = ActiveFilters::default();
        filters.text.insert(0, vec!["Rust  guide".to_string()]);
        assert_eq!(
            where_clause(&columns, &filters),
            "LOWER(\"posts\".\"subject\") LIKE '%rust%' OR \
             LOWER(\"posts\".\"subject\") LIKE '%guide%'"
        );
    }

    #[test]
    fn boolean_false_on_text_means_missing_or_blank() {
        let columns = vec![Column::name("subject")];
        let mut filters = ActiveFilters::default();
        filters.boolean.insert(0, Some(false));
        assert_eq!(
            where_clause(&columns, &filters),
            "\"posts\".\"subject\" IS NULL OR \"posts\".\"subject\" = ''"
        );
        filters.boolean.insert(0, Some(true));
        assert_eq!(
            where_clause(&columns, &filters),
            "\"posts\".\"subject\" IS NOT NULL AND \"posts\".\"subject\" <> ''"
        );
    }

    #[test]
    fn boolean_on_numbers_compares_with_zero() {
        let columns = vec![Column::boolean("flag")];
        let mut filters = ActiveFilters::default();
        filters.boolean.insert(0, Some(false));
        assert_eq!(
            where_clause(&columns, &filters),
            "\"posts\".\"flag\" IS NULL OR \"posts\".\"flag\" = 0"
        );
        filters.boolean.insert(0, Some(true));
        assert_eq!(where_clause(&columns, &filters), "\"posts\".\"flag\" > 0");
    }

    #[test]
    fn unset_boolean_adds_nothing() {
        let columns = vec![Column::boolean("flag")];
        let mut filters = ActiveFilters::default();
        filters.boolean.insert(0, None);
        assert_eq!(where_clause(&columns, &filters), "");
    }

    #[test]
    fn number_bounds_are_rounded_when_asked() {
        let columns = vec![Column::number("rating").round(1)];
        let mut filters = ActiveFilters::default();
        filters.number.insert(
            0,
            NumberRange {
                start: Some(2.5),
                end: Some(4.0),
            },
        );
        assert_eq!(
            where_clause(&columns, &filters),
            "ROUND(\"posts\".\"rating\", 1) >= 2.5 AND ROUND(\"posts\".\"rating\", 1) <= 4"
        );
    }

    #[test]
    fn non_finite_number_bounds_are_ignored() {
        let columns = vec![Column::number("views")];
        let mut filters = ActiveFilters::default();
        filters.number.insert(
            0,
            NumberRange {
                start: Some(f64::NAN),
                end: Some(f64::INFINITY),
            },
        );
        assert_eq!(where_clause(&columns, &filters), "");
        filters.number.insert(
            0,
            NumberRange {
                start: Some(f64::NEG_INFINITY),
                end: Some(10.0),
            },
        );
        assert_eq!(where_clause(&columns, &filters), "\"posts\".\"views\" <= 10");
    }

    #[test]
    fn open_date_bounds_use_sentinels() {
        let columns = vec![Column::date("published_at")];
        let mut filters = ActiveFilters::default();
        filters.date.insert(
            0,
            ValueRange {
                start: None,
                end: Some("2024-06-30".to_string()),
            },
        );
        assert_eq!(
            where_clause(&columns, &filters),
            "\"posts\".\"published_at\" BETWEEN '0000-01-01' AND '2024-06-30'"
        );
    }

    #[test]
    fn time_range_within_a_day() {
        let columns = vec![Column::time("publish_time")];
        let mut filters = ActiveFilters::default();
        filters.time.insert(0, ValueRange::new("09:30", "17:00"));
        assert_eq!(
            where_clause(&columns, &filters),
            "\"posts\".\"publish_time\" BETWEEN '09:30:00' AND '17:00:00'"
        );
    }

    #[test]
    fn time_range_wraps_past_midnight() {
        let columns = vec![Column::time("publish_time")];
        let mut filters = ActiveFilters::default();
        filters.time.insert(0, ValueRange::new("19:00", "07:00"));
        let sql = where_clause(&columns, &filters);
        assert_eq!(
            sql,
            "\"posts\".\"publish_time\" BETWEEN '19:00:00' AND '23:59:59' OR \
             \"posts\".\"publish_time\" BETWEEN '00:00:00' AND '07:00:00'"
        );

        let ranges = between_bounds(&sql);
        let matches = |t: &str| {
            ranges
                .iter()
                .any(|(low, high)| low.as_str() <= t && t <= high.as_str())
        };
        assert!(matches("20:00:00"));
        assert!(matches("03:00:00"));
        assert!(!matches("12:00:00"));
    }

    #[test]
    fn invalid_time_is_an_error() {
        let columns = vec![Column::time("publish_time")];
        let mut filters = ActiveFilters::default();
        filters.time.insert(0, ValueRange::new("late", "07:00"));
        let options = Options::default();
        let schema = posts_schema();
        let scopes = QueryScopes::default();
        let mut scope = Scope::build(&options, &schema, &scopes, "posts").unwrap();
        assert!(matches!(
            filter_conditions(&mut scope, &columns, &filters),
            Err(Error::InvalidTime(_))
        ));
    }

    #[test]
    fn filters_on_different_columns_are_anded() {
        let columns = vec![Column::name("category"), Column::boolean("flag")];
        let mut filters = ActiveFilters::default();
        filters.select.insert(0, vec![json!("news"), json!("howto")]);
        filters.boolean.insert(1, Some(true));
        assert_eq!(
            where_clause(&columns, &filters),
            "(\"posts\".\"category\" = 'news' OR \"posts\".\"category\" = 'howto') AND \
             \"posts\".\"flag\" > 0"
        );
    }
}
