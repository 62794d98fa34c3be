use serde_json::{json, Value};

use crate::{
    columns::{Callback, CallbackRegistry, Column, Row},
    compiler::{CHECKBOX_ATTRIBUTE, EDIT_ID_SUFFIX, SEPARATOR},
    errors::Error,
    options::Config,
};

use super::highlight::highlight;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Display,
    Export,
}

/// Turns fetched rows into display or export rows, column by column.
pub struct PostProcessor<'a> {
    columns: &'a [Column],
    config: &'a Config,
    registry: &'a CallbackRegistry,
    search: Option<&'a str>,
    mode: OutputMode,
    key_name: Option<String>,
}

impl<'a> PostProcessor<'a> {
    pub fn new(
        columns: &'a [Column],
        config: &'a Config,
        registry: &'a CallbackRegistry,
        mode: OutputMode,
    ) -> Self {
        Self {
            columns,
            config,
            registry,
            search: None,
            mode,
            key_name: None,
        }
    }

    /// Highlight matches of the search term in searchable columns.
    pub fn with_search(mut self, search: Option<&'a str>) -> Self {
        self.search = search.map(str::trim).filter(|s| !s.is_empty());
        self
    }

    /// The qualified primary key handed to editable controls, e.g. `posts.id`.
    pub fn with_key_name(mut self, key_name: &str) -> Self {
        self.key_name = Some(key_name.to_string());
        self
    }

    /// Columns that appear in the output, in order.
    pub fn output_columns(&self) -> impl Iterator<Item = &'a Column> + '_ {
        let mode = self.mode;
        self.columns
            .iter()
            .filter(move |c| mode == OutputMode::Display || !(c.hidden || c.prevent_export))
    }

    pub fn process(&self, rows: Vec<Row>) -> Result<Vec<Row>, Error> {
        rows.into_iter().map(|row| self.process_row(row)).collect()
    }

    fn process_row(&self, row: Row) -> Result<Row, Error> {
        let mut output = match self.mode {
            OutputMode::Display => row.clone(),
            OutputMode::Export => Row::new(),
        };
        for column in self.output_columns() {
            let value = self.cell(column, &row)?;
            output.insert(column.name.clone(), value);
        }
        Ok(output)
    }

    fn cell(&self, column: &Column, row: &Row) -> Result<Value, Error> {
        if let Some(content) = &column.label_content {
            return Ok(Value::String(content.clone()));
        }
        let raw = row.get(&column.name).cloned().unwrap_or(Value::Null);

        let callback = match self.mode {
            OutputMode::Export => column.export_callback.as_ref().or(column.callback.as_ref()),
            OutputMode::Display => {
                if column.is_editable() {
                    return Ok(self.editable(column, raw, row));
                }
                column.callback.as_ref()
            }
        };
        match callback {
            Some(callback) => self.invoke(callback, column, raw, row),
            None => Ok(self.highlighted(column, raw)),
        }
    }

    fn invoke(
        &self,
        callback: &Callback,
        column: &Column,
        raw: Value,
        row: &Row,
    ) -> Result<Value, Error> {
        let args = match &raw {
            Value::String(s) if column.additional_selects.len() > 1 => s
                .split(SEPARATOR)
                .map(|part| Value::String(part.to_string()))
                .collect(),
            _ => vec![raw],
        };
        callback.invoke(&args, row, self.registry, self.config)
    }

    fn highlighted(&self, column: &Column, raw: Value) -> Value {
        let term = match self.search {
            Some(term) => term,
            None => return raw,
        };
        if self.mode == OutputMode::Export
            || self.config.suppress_search_highlights
            || !column.searchable
        {
            return raw;
        }
        match raw {
            Value::String(s) => {
                Value::String(highlight(&s, term, &self.config.highlight_template))
            }
            other => other,
        }
    }

    fn editable(&self, column: &Column, raw: Value, row: &Row) -> Value {
        let field = column
            .name
            .split_once('.')
            .map(|(_, field)| field)
            .unwrap_or(&column.name);
        let row_id = row
            .get(&format!("{}{}", column.name, EDIT_ID_SUFFIX))
            .or_else(|| row.get(CHECKBOX_ATTRIBUTE))
            .cloned()
            .unwrap_or(Value::Null);
        json!({
            "value": raw,
            "key": self.key_name,
            "column": field,
            "row_id": row_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn composed_values_are_split_for_callbacks() {
        let columns = vec![Column::callback(&["subject", "author.name"], |args, _| {
            Value::String(format!("{} by {}", args[0].as_str().unwrap(), args[1].as_str().unwrap()))
        })];
        let config = Config::default();
        let registry = CallbackRegistry::default();
        let processor = PostProcessor::new(&columns, &config, &registry, OutputMode::Display);
        let rows = processor
            .process(vec![row(&[(
                "callback_subject_author_name",
                Value::String(format!("Hello{SEPARATOR}Ann")),
            )])])
            .unwrap();
        assert_eq!(rows[0]["callback_subject_author_name"], json!("Hello by Ann"));
    }

    #[test]
    fn searchable_values_are_highlighted() {
        let columns = vec![Column::name("subject").searchable()];
        let config = Config {
            highlight_template: "[{}]".to_string(),
            ..Config::default()
        };
        let registry = CallbackRegistry::default();
        let processor = PostProcessor::new(&columns, &config, &registry, OutputMode::Display)
            .with_search(Some(" rust "));
        let rows = processor
            .process(vec![row(&[("subject", json!("Learning Rust"))])])
            .unwrap();
        assert_eq!(rows[0]["subject"], json!("Learning [Rust]"));
    }

    #[test]
    fn export_uses_export_callbacks_and_drops_columns() {
        let columns = vec![
            Column::boolean("flag"),
            Column::name("body").prevent_export(),
            Column::name("subject").hide(),
        ];
        let config = Config::default();
        let registry = CallbackRegistry::default();
        let processor = PostProcessor::new(&columns, &config, &registry, OutputMode::Export);
        let rows = processor
            .process(vec![row(&[
                ("flag", json!(1)),
                ("body", json!("text")),
                ("subject", json!("s")),
                (CHECKBOX_ATTRIBUTE, json!(4)),
            ])])
            .unwrap();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0]["flag"], json!("Yes"));
    }

    #[test]
    fn editable_cells_carry_their_row_key() {
        let columns = vec![Column::name("author.name").editable()];
        let config = Config::default();
        let registry = CallbackRegistry::default();
        let processor = PostProcessor::new(&columns, &config, &registry, OutputMode::Display)
            .with_key_name("posts.id");
        let rows = processor
            .process(vec![row(&[
                ("author.name", json!("Ann")),
                ("author.name_edit_id", json!(9)),
            ])])
            .unwrap();
        assert_eq!(
            rows[0]["author.name"],
            json!({"value": "Ann", "key": "posts.id", "column": "name", "row_id": 9})
        );
    }

    #[test]
    fn label_columns_show_their_content() {
        let columns = vec![Column::fixed("Static")];
        let config = Config::default();
        let registry = CallbackRegistry::default();
        let processor = PostProcessor::new(&columns, &config, &registry, OutputMode::Display);
        let rows = processor.process(vec![Row::new()]).unwrap();
        assert_eq!(rows[0]["label"], json!("Static"));
    }

    #[test]
    fn named_callbacks_must_be_registered() {
        let columns =
            vec![Column::name("views").format_with(Callback::Named("stars".to_string()))];
        let config = Config::default();
        let mut registry = CallbackRegistry::default();
        let processor = PostProcessor::new(&columns, &config, &registry, OutputMode::Display);
        assert!(matches!(
            processor.process(vec![row(&[("views", json!(3))])]),
            Err(Error::UnknownCallback(_))
        ));

        registry.register("stars", |args, _| {
            json!("*".repeat(args[0].as_u64().unwrap_or(0) as usize))
        });
        let processor = PostProcessor::new(&columns, &config, &registry, OutputMode::Display);
        let rows = processor.process(vec![row(&[("views", json!(3))])]).unwrap();
        assert_eq!(rows[0]["views"], json!("***"));
    }
}
