use serde_json::Value;

use crate::{
    columns::{display_text, Column, ColumnType},
    errors::Error,
    sql::expr::{
        build::{cmp, math},
        SqlExpr,
    },
    state::{Group, Logic, Operand, Rule, RuleNode, RuleTree},
};

use super::{
    aggregates::{self, AggregateFunction},
    filters::{lower_like, scope_condition},
    scope::Scope,
    selects::{filter_target, FilterTarget},
    values,
};

/// The condition for a whole rule tree. Expects the tree to have been validated.
pub fn rule_tree_condition(
    scope: &mut Scope,
    columns: &[Column],
    tree: &RuleTree,
) -> Result<SqlExpr, Error> {
    group_condition(scope, columns, &tree.root)
}

fn group_condition(scope: &mut Scope, columns: &[Column], group: &Group) -> Result<SqlExpr, Error> {
    let mut parts = Vec::with_capacity(group.content.len());
    for node in &group.content {
        parts.push(match node {
            RuleNode::Group(inner) => group_condition(scope, columns, inner)?.grouped(),
            RuleNode::Rule { content } => rule_condition(scope, columns, content)?,
        });
    }
    Ok(cmp::condition_set(parts, group.logic))
}

fn rule_condition(scope: &mut Scope, columns: &[Column], rule: &Rule) -> Result<SqlExpr, Error> {
    let Some(index) = rule.column else {
        return Ok(SqlExpr::empty());
    };
    let column = columns.get(index).ok_or(Error::InvalidColumnIndex(index))?;
    let value = rule.value.clone().unwrap_or(Value::Null);

    match filter_target(scope, index, column)? {
        FilterTarget::Scope(name) => {
            let condition = scope_condition(scope, &name, &value)?;
            Ok(match rule.operand {
                Some(Operand::DoesNotInclude) => cmp::not(condition),
                _ => condition,
            })
        }
        FilterTarget::Aggregate { value: a, function } => {
            let operand = match (function, rule.operand) {
                (AggregateFunction::GroupConcat, Some(Operand::Includes)) => {
                    Some(Operand::Contains)
                }
                (AggregateFunction::GroupConcat, Some(Operand::DoesNotInclude)) => {
                    Some(Operand::DoesNotContain)
                }
                (_, operand) => operand,
            };
            let needle = needle(scope, column.column_type, operand, &value);
            Ok(aggregates::compare(a, function, operand, needle))
        }
        FilterTarget::Composed(e) => Ok(expr_condition(scope, column, rule.operand, &value, vec![e])),
        FilterTarget::Exprs(exprs) => Ok(expr_condition(scope, column, rule.operand, &value, exprs)),
    }
}

fn needle(
    scope: &Scope,
    column_type: ColumnType,
    operand: Option<Operand>,
    value: &Value,
) -> SqlExpr {
    let dialect = scope.dialect();
    let text = display_text(value);
    match operand {
        Some(Operand::Contains) | Some(Operand::DoesNotContain) => {
            values::pattern(dialect, &text, true, true)
        }
        Some(Operand::BeginsWith) => values::pattern(dialect, &text, false, true),
        Some(Operand::EndsWith) => values::pattern(dialect, &text, true, false),
        _ => values::typed_literal(dialect, column_type, value),
    }
}

fn wants_true(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}

/// Emptiness tests and boolean columns must hold for every expression; comparisons for any.
fn expr_condition(
    scope: &Scope,
    column: &Column,
    operand: Option<Operand>,
    value: &Value,
    exprs: Vec<SqlExpr>,
) -> SqlExpr {
    if let Some(Operand::IsEmpty) = operand {
        return cmp::condition_set(exprs.into_iter().map(cmp::is_null), Logic::And);
    }
    if let Some(Operand::IsNotEmpty) = operand {
        return cmp::condition_set(exprs.into_iter().map(cmp::is_not_null), Logic::And);
    }
    if column.column_type == ColumnType::Boolean {
        let test = if wants_true(value) {
            cmp::is_not_null
        } else {
            cmp::is_null
        };
        return cmp::condition_set(exprs.into_iter().map(test), Logic::And);
    }

    let text = display_text(value);
    let alternatives = exprs.into_iter().map(|e| {
        let e = match column.round {
            Some(places) => math::round(e, places),
            None => e,
        };
        let literal = || values::typed_literal(scope.dialect(), column.column_type, value);
        match operand {
            Some(Operand::Contains) | Some(Operand::Includes) => {
                lower_like(scope, e, &text, true, true)
            }
            Some(Operand::BeginsWith) => lower_like(scope, e, &text, false, true),
            Some(Operand::EndsWith) => lower_like(scope, e, &text, true, false),
            Some(Operand::DoesNotContain) => cmp::not(lower_like(scope, e, &text, true, true)),
            Some(Operand::Neq) | Some(Operand::DoesNotEqual) | Some(Operand::DoesNotInclude) => {
                cmp::neq(e, literal())
            }
            Some(Operand::Gt) => cmp::gt(e, literal()),
            Some(Operand::Lt) => cmp::lt(e, literal()),
            Some(Operand::Gte) => cmp::gte(e, literal()),
            Some(Operand::Lte) => cmp::lte(e, literal()),
            None | Some(Operand::Eq) | Some(Operand::Equals) => cmp::eq(e, literal()),
            Some(Operand::IsEmpty) | Some(Operand::IsNotEmpty) => SqlExpr::empty(),
        }
    });
    cmp::condition_set(alternatives, Logic::Or)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::query_scopes::QueryScopes, options::Options, state::NodePath,
        tests::test_utils::posts_schema,
    };
    use serde_json::json;

    fn compile_tree(columns: &[Column], tree: &RuleTree) -> String {
        let options = Options::default();
        let schema = posts_schema();
        let scopes = QueryScopes::default();
        let mut scope = Scope::build(&options, &schema, &scopes, "posts").unwrap();
        rule_tree_condition(&mut scope, columns, tree)
            .unwrap()
            .content
    }

    fn rule(column: usize, operand: Operand, value: Value) -> RuleNode {
        RuleNode::rule(Rule {
            column: Some(column),
            operand: Some(operand),
            value: Some(value),
        })
    }

    #[test]
    fn nested_groups_are_parenthesized() {
        let columns = vec![Column::name("subject"), Column::number("views")];
        let mut tree = RuleTree::new(Logic::And);
        tree.root.content.push(rule(0, Operand::BeginsWith, json!("How")));
        tree.root.content.push(RuleNode::Group(Group {
            logic: Logic::Or,
            content: vec![
                rule(1, Operand::Gt, json!("100")),
                rule(1, Operand::IsEmpty, Value::Null),
            ],
        }));
        assert_eq!(
            compile_tree(&columns, &tree),
            "LOWER(\"posts\".\"subject\") LIKE 'how%' AND\n\
             (\"posts\".\"views\" > 100 OR \"posts\".\"views\" IS NULL)"
        );
    }

    #[test]
    fn boolean_columns_test_presence() {
        let columns = vec![Column::boolean("flag")];
        let mut tree = RuleTree::new(Logic::And);
        tree.root.content.push(rule(0, Operand::Eq, json!("true")));
        assert_eq!(compile_tree(&columns, &tree), "\"posts\".\"flag\" IS NOT NULL");
        tree.set_value(&NodePath(vec![0]), Some(json!(false)))
            .unwrap();
        assert_eq!(compile_tree(&columns, &tree), "\"posts\".\"flag\" IS NULL");
    }

    #[test]
    fn does_not_contain_negates_the_match() {
        let columns = vec![Column::name("author.name")];
        let mut tree = RuleTree::new(Logic::And);
        tree.root
            .content
            .push(rule(0, Operand::DoesNotContain, json!("Bot")));
        assert_eq!(
            compile_tree(&columns, &tree),
            "NOT (LOWER(\"users\".\"name\") LIKE '%bot%')"
        );
    }

    #[test]
    fn rounding_applies_before_comparison() {
        let columns = vec![Column::number("rating").round(1)];
        let mut tree = RuleTree::new(Logic::And);
        tree.root.content.push(rule(0, Operand::Eq, json!(4.5)));
        assert_eq!(
            compile_tree(&columns, &tree),
            "ROUND(\"posts\".\"rating\", 1) = 4.5"
        );
    }

    #[test]
    fn empty_rules_are_skipped() {
        let columns = vec![Column::name("subject")];
        let mut tree = RuleTree::new(Logic::Or);
        tree.root.content.push(RuleNode::rule(Rule::default()));
        assert_eq!(compile_tree(&columns, &tree), "");
    }
}
