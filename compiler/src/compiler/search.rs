use serde_json::Value;

use crate::{columns::Column, errors::Error, sql::expr::build::cmp, sql::expr::SqlExpr};

use super::{
    filters::{lower_like, scope_condition},
    scope::Scope,
    selects::{filter_target, FilterTarget},
};

/// The global search: every whitespace-separated token must match at least one searchable
/// column.
pub fn search_condition(
    scope: &mut Scope,
    columns: &[Column],
    term: &str,
) -> Result<SqlExpr, Error> {
    let mut targets = Vec::new();
    for (index, column) in columns.iter().enumerate() {
        if column.searchable {
            targets.push(filter_target(scope, index, column)?);
        }
    }
    if targets.is_empty() {
        return Ok(SqlExpr::empty());
    }

    let mut token_conditions = Vec::new();
    for token in term.split_whitespace() {
        let mut alternatives = Vec::new();
        for target in &targets {
            match target {
                FilterTarget::Scope(name) => alternatives.push(scope_condition(
                    scope,
                    name,
                    &Value::String(token.to_string()),
                )?),
                FilterTarget::Exprs(exprs) => alternatives.extend(
                    exprs
                        .iter()
                        .map(|e| lower_like(scope, e.clone(), token, true, true)),
                ),
                FilterTarget::Composed(e) | FilterTarget::Aggregate { value: e, .. } => {
                    alternatives.push(lower_like(scope, e.clone(), token, true, true))
                }
            }
        }
        token_conditions.push(cmp::or(alternatives));
    }
    Ok(cmp::and(token_conditions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::query_scopes::QueryScopes, options::Options, schema::Schema,
        tests::test_utils::posts_schema,
    };

    #[test]
    fn tokens_are_anded_and_columns_ored() {
        let options = Options::default();
        let schema = posts_schema();
        let scopes = QueryScopes::default();
        let mut scope = Scope::build(&options, &schema, &scopes, "posts").unwrap();
        let columns = vec![
            Column::name("subject").searchable(),
            Column::name("body").searchable(),
            Column::number("views"),
        ];
        let condition = search_condition(&mut scope, &columns, "Rust  tips").unwrap();
        assert_eq!(
            condition.content,
            "(LOWER(\"posts\".\"subject\") LIKE '%rust%' OR LOWER(\"posts\".\"body\") LIKE '%rust%') AND\n\
             (LOWER(\"posts\".\"subject\") LIKE '%tips%' OR LOWER(\"posts\".\"body\") LIKE '%tips%')"
        );
    }

    #[test]
    fn nothing_searchable_means_no_condition() {
        let options = Options::default();
        let schema: Schema = posts_schema();
        let scopes = QueryScopes::default();
        let mut scope = Scope::build(&options, &schema, &scopes, "posts").unwrap();
        let columns = vec![Column::name("subject")];
        assert!(search_condition(&mut scope, &columns, "x")
            .unwrap()
            .is_empty());
    }
}
