use std::collections::HashSet;

use crate::{
    errors::Error,
    schema::Table,
    state::SortDirection,
};

use super::{
    callbacks::{Callback, Formatter},
    column::Column,
    column_type::ColumnType,
};

/// Builds the ordered column list of a table from declarations or from a model's columns.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<Column>,
}

impl ColumnSet {
    pub fn build(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// One plain column per declared column of the table.
    pub fn from_table(table: &Table) -> Self {
        Self {
            columns: table.columns.iter().map(|c| Column::name(c)).collect(),
        }
    }

    /// Keep only the named columns, in declaration order. An empty list keeps everything.
    pub fn include<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        if names.is_empty() {
            return self;
        }
        self.columns
            .retain(|column| names.iter().any(|n| matches_name(column, n.as_ref())));
        self
    }

    pub fn exclude<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.columns
            .retain(|column| !names.iter().any(|n| matches_name(column, n.as_ref())));
        self
    }

    pub fn hide<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        for column in &mut self.columns {
            if names.iter().any(|n| matches_name(column, n.as_ref())) {
                column.hidden = true;
            }
        }
        self
    }

    pub fn search<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        for column in &mut self.columns {
            if names.iter().any(|n| matches_name(column, n.as_ref())) {
                column.searchable = true;
            }
        }
        self
    }

    /// Each entry is `name` or `name|format`. Matching columns become date columns.
    pub fn format_dates<S: AsRef<str>>(self, specs: &[S]) -> Self {
        self.retype(specs, ColumnType::Date, Formatter::Date)
    }

    /// Each entry is `name` or `name|format`. Matching columns become time columns.
    pub fn format_times<S: AsRef<str>>(self, specs: &[S]) -> Self {
        self.retype(specs, ColumnType::Time, Formatter::Time)
    }

    fn retype<S: AsRef<str>>(
        mut self,
        specs: &[S],
        column_type: ColumnType,
        formatter: impl Fn(Option<String>) -> Formatter,
    ) -> Self {
        for spec in specs {
            let (name, format) = match spec.as_ref().split_once('|') {
                Some((name, format)) => (name, Some(format.to_string())),
                None => (spec.as_ref(), None),
            };
            for column in &mut self.columns {
                if matches_name(column, name) {
                    column.column_type = column_type;
                    column.callback = Some(Callback::Format(formatter(format.clone())));
                }
            }
        }
        self
    }

    /// Mark the default sort from a `name|direction` directive. The direction defaults to
    /// descending.
    pub fn sort(mut self, directive: Option<&str>) -> Self {
        let Some(directive) = directive else {
            return self;
        };
        let (name, direction) = match directive.split_once('|') {
            Some((name, direction)) => (name, SortDirection::parse(direction).ok()),
            None => (directive, None),
        };
        if let Some(column) = self.columns.iter_mut().find(|c| matches_name(c, name)) {
            column.default_sort = Some(direction.unwrap_or_default());
        }
        self
    }

    /// Finish building, rejecting duplicate names among sortable columns.
    pub fn finish(self) -> Result<Vec<Column>, Error> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for column in self.columns.iter().filter(|c| c.column_type.is_sortable()) {
            if !seen.insert(column.name.as_str()) && !duplicates.contains(&column.name) {
                duplicates.push(column.name.clone());
            }
        }
        if !duplicates.is_empty() {
            return Err(Error::DuplicateColumns(duplicates));
        }
        Ok(self.columns)
    }
}

/// Match on the full name or on the field after the last relation segment.
fn matches_name(column: &Column, name: &str) -> bool {
    column.name == name
        || column
            .name
            .rsplit_once('.')
            .map(|(_, field)| field == name)
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(columns: &[Column]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn sample() -> ColumnSet {
        ColumnSet::build(vec![
            Column::name("id"),
            Column::name("subject"),
            Column::name("author.name"),
            Column::name("expires_at"),
        ])
    }

    #[test]
    fn include_keeps_declaration_order() {
        let columns = sample().include(&["expires_at", "id"]).finish().unwrap();
        assert_eq!(names(&columns), vec!["id", "expires_at"]);
    }

    #[test]
    fn exclude_and_hide_match_trailing_field() {
        let columns = sample().exclude(&["name"]).hide(&["subject"]).finish().unwrap();
        assert_eq!(names(&columns), vec!["id", "subject", "expires_at"]);
        assert!(columns[1].hidden);
    }

    #[test]
    fn date_specs_retype_columns() {
        let columns = sample().format_dates(&["expires_at|%Y"]).finish().unwrap();
        assert_eq!(columns[3].column_type, ColumnType::Date);
        assert!(matches!(
            &columns[3].callback,
            Some(Callback::Format(Formatter::Date(Some(f)))) if f == "%Y"
        ));
    }

    #[test]
    fn sort_directive_sets_default_sort() {
        let columns = sample().sort(Some("subject|asc")).finish().unwrap();
        assert_eq!(columns[1].default_sort, Some(SortDirection::Asc));
        let columns = sample().sort(Some("id")).finish().unwrap();
        assert_eq!(columns[0].default_sort, Some(SortDirection::Desc));
    }

    #[test]
    fn duplicates_are_listed_once() {
        let error = ColumnSet::build(vec![
            Column::name("id"),
            Column::name("id"),
            Column::name("id"),
            Column::fixed("x"),
            Column::fixed("y"),
        ])
        .finish()
        .unwrap_err();
        match error {
            Error::DuplicateColumns(names) => assert_eq!(names, vec!["id"]),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn duplicate_subject_is_named_in_the_error() {
        let error = ColumnSet::build(vec![
            Column::number("id"),
            Column::name("subject"),
            Column::name("subject").label("Title"),
        ])
        .finish()
        .unwrap_err();
        assert!(matches!(&error, Error::DuplicateColumns(names) if names == &["subject"]));
        assert_eq!(error.to_string(), "Duplicate column names: subject");
    }
}
