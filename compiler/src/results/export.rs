use serde::Serialize;
use serde_json::Value;

use crate::columns::{Column, Row};

/// The rows of a spreadsheet export, before any file format is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSheet {
    pub file_name: String,
    pub headings: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Column widths keyed by heading, as given by the export action.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub widths: Vec<(String, f64)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<(String, Value)>,
}

impl ExportSheet {
    /// Lay out processed export rows under the headings of `columns`.
    pub fn build<'a>(
        file_name: &str,
        columns: impl IntoIterator<Item = &'a Column>,
        rows: &[Row],
    ) -> Self {
        let (headings, names): (Vec<String>, Vec<&str>) = columns
            .into_iter()
            .map(|c| (c.display_label().to_string(), c.name.as_str()))
            .unzip();
        let rows = rows
            .iter()
            .map(|row| {
                names
                    .iter()
                    .map(|name| row.get(*name).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self {
            file_name: file_name.to_string(),
            headings,
            rows,
            widths: Vec::new(),
            styles: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_follow_column_order() {
        let columns = vec![Column::name("subject").label("Subject"), Column::number("views")];
        let mut row = Row::new();
        row.insert("views".to_string(), json!(7));
        row.insert("subject".to_string(), json!("Hi"));
        let sheet = ExportSheet::build("posts.xlsx", &columns, &[row]);
        assert_eq!(sheet.headings, vec!["Subject", "views"]);
        assert_eq!(sheet.rows, vec![vec![json!("Hi"), json!(7)]]);
    }
}
