use serde_json::Value;

use crate::{
    columns::{as_number, ColumnType},
    sql::{
        expr::{build::value, SqlExpr},
        Dialect,
    },
};

pub fn literal(dialect: &dyn Dialect, v: &Value) -> SqlExpr {
    match v {
        Value::Null => value::null(),
        Value::Bool(true) => value::one(),
        Value::Bool(false) => value::zero(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => value::number(f),
            _ => SqlExpr::atom(n.to_string()),
        },
        Value::String(s) => text(dialect, s),
        other => text(dialect, &other.to_string()),
    }
}

pub fn text(dialect: &dyn Dialect, s: &str) -> SqlExpr {
    SqlExpr::atom(dialect.quote_string(s))
}

/// Strings that hold numbers are compared as numbers on numeric columns.
pub fn typed_literal(dialect: &dyn Dialect, column_type: ColumnType, v: &Value) -> SqlExpr {
    match (column_type, v) {
        (ColumnType::Number, Value::String(_)) => match as_number(v) {
            Some(n) => value::number(n),
            None => literal(dialect, v),
        },
        _ => literal(dialect, v),
    }
}

/// A row key as entered by the user. Integer keys are compared as numbers.
pub fn key_literal(dialect: &dyn Dialect, key: &str) -> SqlExpr {
    match key.trim().parse::<i64>() {
        Ok(n) => SqlExpr::atom(n.to_string()),
        Err(_) => text(dialect, key),
    }
}

/// A lowercased LIKE pattern.
pub fn pattern(dialect: &dyn Dialect, needle: &str, before: bool, after: bool) -> SqlExpr {
    let needle = needle.to_lowercase();
    let pattern = format!(
        "{}{}{}",
        if before { "%" } else { "" },
        needle,
        if after { "%" } else { "" }
    );
    text(dialect, &pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Sqlite;
    use serde_json::json;

    #[test]
    fn literals_by_json_type() {
        let d = Sqlite();
        assert_eq!(literal(&d, &json!(null)).content, "NULL");
        assert_eq!(literal(&d, &json!(true)).content, "1");
        assert_eq!(literal(&d, &json!(42)).content, "42");
        assert_eq!(literal(&d, &json!(4.0)).content, "4");
        assert_eq!(literal(&d, &json!(4.25)).content, "4.25");
        assert_eq!(literal(&d, &json!("o'k")).content, "'o''k'");
    }

    #[test]
    fn numeric_strings_on_number_columns() {
        let d = Sqlite();
        assert_eq!(
            typed_literal(&d, ColumnType::Number, &json!("10")).content,
            "10"
        );
        assert_eq!(
            typed_literal(&d, ColumnType::String, &json!("10")).content,
            "'10'"
        );
        assert_eq!(
            typed_literal(&d, ColumnType::Number, &json!("NaN")).content,
            "'NaN'"
        );
    }

    #[test]
    fn integer_keys_are_unquoted() {
        assert_eq!(key_literal(&Sqlite(), "12").content, "12");
        assert_eq!(key_literal(&Sqlite(), "a-1").content, "'a-1'");
    }

    #[test]
    fn patterns_are_lowercased() {
        assert_eq!(pattern(&Sqlite(), "FoO", true, true).content, "'%foo%'");
        assert_eq!(pattern(&Sqlite(), "a", false, true).content, "'a%'");
    }
}
