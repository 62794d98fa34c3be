use serde_json::Value;
use tracing::warn;

use crate::columns::{as_number, Column, Row};

/// The sum of a column over the given rows. Non-numeric data yields an empty summary.
pub fn summarize(rows: &[Row], column: &Column) -> String {
    let mut total = 0.0;
    for row in rows {
        match row.get(&column.name) {
            None | Some(Value::Null) => {}
            Some(value) => match as_number(value) {
                Some(n) => total += n,
                None => {
                    warn!(column = %column.name, "cannot summarize non-numeric values");
                    return String::new();
                }
            },
        }
    }
    if total.fract() == 0.0 && total.abs() < 1e15 {
        format!("{}", total as i64)
    } else {
        total.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: &[Value]) -> Vec<Row> {
        values
            .iter()
            .map(|v| {
                let mut row = Row::new();
                row.insert("views".to_string(), v.clone());
                row
            })
            .collect()
    }

    #[test]
    fn sums_numbers_and_numeric_strings() {
        let column = Column::number("views");
        assert_eq!(summarize(&rows(&[json!(3), json!("4.5"), json!(null)]), &column), "7.5");
        assert_eq!(summarize(&rows(&[json!(3), json!(4)]), &column), "7");
    }

    #[test]
    fn non_numeric_data_degrades_to_empty() {
        let column = Column::number("views");
        assert_eq!(summarize(&rows(&[json!(3), json!("many")]), &column), "");
    }
}
