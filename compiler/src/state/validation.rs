use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::{columns::Column, errors::msg};

use super::rules::{NodePath, Rule, RuleTree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: NodePath,
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.path, self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid rules: {}", join_errors(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A value counts as missing when it is null, blank, or an empty list.
fn is_missing(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn is_boolean_token(value: &Option<Value>) -> bool {
    match value {
        Some(Value::Bool(_)) => true,
        Some(Value::String(s)) => s == "true" || s == "false",
        _ => false,
    }
}

fn validate_rule(path: NodePath, rule: &Rule, columns: &[Column], errors: &mut Vec<FieldError>) {
    let mut fail = |field: &'static str, message: String| {
        errors.push(FieldError {
            path: path.clone(),
            field,
            message,
        })
    };
    match rule.column {
        None => fail("column", msg::field_required("column")),
        Some(index) => {
            let filterable = columns.get(index).map(Column::is_filterable);
            if filterable != Some(true) {
                fail("column", msg::selected_field_invalid("column"));
            }
        }
    }
    if rule.operand.is_none() && !is_boolean_token(&rule.value) {
        fail("operand", msg::field_required("operand"));
    }
    let value_optional = rule.operand.map(|o| o.is_emptiness_test()).unwrap_or(false);
    if !value_optional && is_missing(&rule.value) {
        fail("value", msg::field_required("value"));
    }
}

/// Check every rule of the tree against the table's columns.
pub fn validate_rules(tree: &RuleTree, columns: &[Column]) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    for (path, rule) in tree.rules() {
        validate_rule(path, rule, columns, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}
