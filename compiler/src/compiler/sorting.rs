use gridquery_parser::parse_json_reference;

use crate::{
    columns::Column,
    errors::Error,
    sql::{expr::SqlExpr, tree::SortEntry},
    state::{FilterState, SortDirection},
};

use super::{scope::Scope, selects::resolve_selection, values};

/// A raw sort or base expression. `table.column->key` references are read through the dialect's
/// JSON accessor.
fn raw_sort_expr(scope: &Scope, raw: &str) -> SqlExpr {
    match parse_json_reference(raw) {
        Ok(reference) => {
            let table = reference
                .table
                .as_deref()
                .unwrap_or(scope.get_base_table().name.as_str());
            let column = scope.table_column_expr(table, &reference.column);
            scope.dialect().json_extract(column, &reference.path)
        }
        Err(_) => SqlExpr::raw(raw),
    }
}

/// Aggregates sort by their outer value, which stays in scope when export mode leaves the
/// column out of the select list.
fn sort_expr(scope: &mut Scope, index: usize, column: &Column) -> Result<Option<SqlExpr>, Error> {
    if let Some(raw) = column.sort.as_ref().or(column.base.as_ref()) {
        return Ok(Some(raw_sort_expr(scope, raw)));
    }
    Ok(resolve_selection(scope, index, column)?.map(|selection| selection.value().clone()))
}

/// Pinned records first, then the chosen column if it can be sorted.
pub fn sort_entries(
    scope: &mut Scope,
    columns: &[Column],
    state: &FilterState,
) -> Result<Vec<SortEntry>, Error> {
    let mut entries = Vec::new();
    if !state.pinned_records.is_empty() {
        let dialect = scope.dialect();
        let ids = state
            .pinned_records
            .iter()
            .map(|key| values::key_literal(dialect, key))
            .collect();
        entries.push(SortEntry {
            expr: dialect.pinned_first(scope.key_expr(), ids),
            direction: SortDirection::Desc,
        });
    }
    let chosen = state
        .sort_index
        .and_then(|index| columns.get(index).map(|column| (index, column)))
        .filter(|(_, column)| column.is_sortable());
    if let Some((index, column)) = chosen {
        if let Some(expr) = sort_expr(scope, index, column)? {
            entries.push(SortEntry {
                expr,
                direction: state.direction,
            });
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::query_scopes::QueryScopes, options::Options, tests::test_utils::posts_schema,
    };

    fn rendered(columns: &[Column], state: &FilterState) -> Vec<String> {
        let options = Options::default();
        let schema = posts_schema();
        let scopes = QueryScopes::default();
        let mut scope = Scope::build(&options, &schema, &scopes, "posts").unwrap();
        sort_entries(&mut scope, columns, state)
            .unwrap()
            .into_iter()
            .map(|e| format!("{} {}", e.expr, e.direction.as_sql()))
            .collect()
    }

    #[test]
    fn raw_json_sorts_use_the_accessor() {
        let columns = vec![Column::name("meta").sort_by("posts.meta->score")];
        let state = FilterState {
            sort_index: Some(0),
            direction: SortDirection::Asc,
            ..Default::default()
        };
        assert_eq!(
            rendered(&columns, &state),
            vec!["json_extract(\"posts\".\"meta\", '$.\"score\"') ASC"]
        );
    }

    #[test]
    fn aggregates_sort_by_their_value() {
        let columns = vec![Column::number("comments.id:count")];
        let state = FilterState {
            sort_index: Some(0),
            ..Default::default()
        };
        assert_eq!(
            rendered(&columns, &state),
            vec!["COALESCE(\"cte0\".\"v\", 0) DESC"]
        );
    }

    #[test]
    fn pinned_records_come_first() {
        let columns = vec![Column::name("subject")];
        let state = FilterState {
            sort_index: Some(0),
            direction: SortDirection::Asc,
            pinned_records: vec!["3".to_string(), "7".to_string()],
            ..Default::default()
        };
        assert_eq!(
            rendered(&columns, &state),
            vec![
                "CASE WHEN \"posts\".\"id\" IN (3, 7) THEN 1 ELSE 0 END DESC",
                "\"posts\".\"subject\" ASC",
            ]
        );
    }

    #[test]
    fn unsortable_columns_are_ignored() {
        let columns = vec![Column::name("subject").unsortable()];
        let state = FilterState {
            sort_index: Some(0),
            ..Default::default()
        };
        assert!(rendered(&columns, &state).is_empty());
    }
}
