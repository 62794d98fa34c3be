use serde_json::Value;

use crate::state::SortDirection;

use super::{
    callbacks::{Callback, Formatter, Row},
    column_type::{Align, ColumnType, FilterKind, SelectOption},
};

/// One displayable, filterable, sortable column of a table.
#[derive(Debug, Clone)]
pub struct Column {
    /// A dotted relation path ending in a field, e.g. `author.team.name`. Also the result alias.
    pub name: String,
    pub label: Option<String>,
    pub group: Option<String>,
    pub tooltip: Option<String>,
    pub header_align: Align,
    pub content_align: Align,
    pub width: Option<String>,
    pub column_type: ColumnType,
    /// A raw SQL select expression that replaces path resolution.
    pub select: Option<String>,
    /// Fields fetched together and handed to the callback as separate arguments.
    pub additional_selects: Vec<String>,
    pub base: Option<String>,
    /// A raw SQL sort expression.
    pub sort: Option<String>,
    pub raw: bool,
    /// Raw SQL expressions that filters and search compare against instead of the select.
    pub filter_on: Vec<String>,
    pub scope: Option<String>,
    pub scope_filter: Option<String>,
    pub aggregate: Option<String>,
    pub callback: Option<Callback>,
    pub export_callback: Option<Callback>,
    pub searchable: bool,
    pub filter: Option<FilterKind>,
    pub sortable: bool,
    pub hidden: bool,
    pub prevent_export: bool,
    pub round: Option<u32>,
    pub default_sort: Option<SortDirection>,
    pub label_content: Option<String>,
    pub summary: bool,
}

impl Column {
    pub fn name(name: &str) -> Self {
        Self::of_type(name, ColumnType::String)
    }

    pub fn of_type(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            group: None,
            tooltip: None,
            header_align: column_type.default_align(),
            content_align: column_type.default_align(),
            width: None,
            column_type,
            select: None,
            additional_selects: Vec::new(),
            base: None,
            sort: None,
            raw: false,
            filter_on: Vec::new(),
            scope: None,
            scope_filter: None,
            aggregate: None,
            callback: column_type.default_callback(),
            export_callback: column_type.default_export_callback(),
            searchable: false,
            filter: None,
            sortable: column_type.is_sortable(),
            hidden: false,
            prevent_export: false,
            round: None,
            default_sort: None,
            label_content: None,
            summary: false,
        }
    }

    pub fn number(name: &str) -> Self {
        Self::of_type(name, ColumnType::Number)
    }

    pub fn boolean(name: &str) -> Self {
        Self::of_type(name, ColumnType::Boolean)
    }

    pub fn date(name: &str) -> Self {
        Self::of_type(name, ColumnType::Date)
    }

    pub fn datetime(name: &str) -> Self {
        Self::of_type(name, ColumnType::Datetime)
    }

    pub fn time(name: &str) -> Self {
        Self::of_type(name, ColumnType::Time)
    }

    pub fn json(name: &str) -> Self {
        Self::of_type(name, ColumnType::Json)
    }

    /// A raw SQL expression, optionally aliased with `AS`.
    pub fn raw(expression: &str) -> Self {
        let lower = expression.to_ascii_lowercase();
        let (select, name) = match lower.rfind(" as ") {
            Some(at) => (
                expression[..at].trim(),
                expression[at + 4..].trim().trim_matches(['`', '"']),
            ),
            None => (expression.trim(), expression.trim()),
        };
        let mut column = Self::name(name);
        column.select = Some(select.to_string());
        column.sort = Some(select.to_string());
        column.raw = true;
        column
    }

    /// A column computed by `f` from several fetched fields.
    pub fn callback(
        fields: &[&str],
        f: impl Fn(&[Value], &Row) -> Value + Send + Sync + 'static,
    ) -> Self {
        let mut column = Self::name(&callback_name(fields));
        column.additional_selects = fields.iter().map(|f| f.to_string()).collect();
        column.callback = Some(Callback::custom(f));
        column
    }

    /// Like [`Column::callback`], with the callback looked up by name when rows are processed.
    pub fn named_callback(fields: &[&str], callback: &str) -> Self {
        let mut column = Self::name(&callback_name(fields));
        column.additional_selects = fields.iter().map(|f| f.to_string()).collect();
        column.callback = Some(Callback::Named(callback.to_string()));
        column
    }

    pub fn scope(scope: &str, alias: &str) -> Self {
        let mut column = Self::of_type(alias, ColumnType::Scope);
        column.scope = Some(scope.to_string());
        column.label = Some(alias.to_string());
        column
    }

    pub fn fixed(content: &str) -> Self {
        let mut column = Self::of_type("label", ColumnType::Label);
        column.label_content = Some(content.to_string());
        column
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Name the column, needed when several fixed-content columns share a table.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn tooltip(mut self, tooltip: &str) -> Self {
        self.tooltip = Some(tooltip.to_string());
        self
    }

    pub fn width(mut self, width: &str) -> Self {
        self.width = Some(width.to_string());
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.header_align = align;
        self.content_align = align;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    /// Enable the filter matching the column's type.
    pub fn filterable(mut self) -> Self {
        self.filter = self.column_type.default_filter();
        self
    }

    /// Enable a select filter offering these options.
    pub fn filterable_options<T: Into<SelectOption>>(
        mut self,
        options: impl IntoIterator<Item = T>,
    ) -> Self {
        self.filter = Some(FilterKind::Select(
            options.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn filter(mut self, filter: FilterKind) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn filter_on(mut self, expressions: &[&str]) -> Self {
        self.filter_on = expressions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn scope_filter(mut self, scope: &str) -> Self {
        self.scope_filter = Some(scope.to_string());
        if self.filter.is_none() {
            self.filter = Some(FilterKind::Text);
        }
        self
    }

    pub fn aggregate(mut self, function: &str) -> Self {
        self.aggregate = Some(function.to_string());
        self
    }

    pub fn base(mut self, base: &str) -> Self {
        self.base = Some(base.to_string());
        self
    }

    pub fn sort_by(mut self, sort: &str) -> Self {
        self.sort = Some(sort.to_string());
        self
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn default_sort(mut self, direction: SortDirection) -> Self {
        self.default_sort = Some(direction);
        self
    }

    pub fn hide(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn prevent_export(mut self) -> Self {
        self.prevent_export = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.column_type = ColumnType::Editable;
        self
    }

    pub fn summarize(mut self) -> Self {
        self.summary = true;
        self
    }

    pub fn format_with(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn export_with(mut self, callback: Callback) -> Self {
        self.export_callback = Some(callback);
        self
    }

    /// Round in SQL when filtering and when displaying.
    pub fn round(mut self, places: u32) -> Self {
        self.round = Some(places);
        self.callback = Some(Callback::Format(Formatter::Round { places }));
        self
    }

    pub fn number_format(mut self, places: u32) -> Self {
        self.callback = Some(Callback::Format(Formatter::Number { places }));
        self
    }

    pub fn date_format(mut self, format: &str) -> Self {
        let format = Some(format.to_string());
        self.callback = Some(Callback::Format(match self.column_type {
            ColumnType::Time => Formatter::Time(format),
            ColumnType::Datetime => Formatter::Datetime(format),
            _ => Formatter::Date(format),
        }));
        self
    }

    pub fn truncate(mut self, length: usize) -> Self {
        self.callback = Some(Callback::Format(Formatter::Truncate(length)));
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn is_filterable(&self) -> bool {
        self.filter.is_some() || self.scope_filter.is_some()
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable && self.column_type.is_sortable()
    }

    pub fn is_selected(&self) -> bool {
        !matches!(self.column_type, ColumnType::Label | ColumnType::Scope)
    }

    pub fn is_editable(&self) -> bool {
        self.column_type == ColumnType::Editable
    }

    /// Map a select filter id to the option's display name.
    pub fn display_value(&self, value: &Value) -> Option<&str> {
        match &self.filter {
            Some(FilterKind::Select(options)) => options
                .iter()
                .find(|o| &o.id == value || same_text(&o.id, value))
                .map(|o| o.name.as_str()),
            _ => None,
        }
    }
}

fn same_text(a: &Value, b: &Value) -> bool {
    super::callbacks::display_text(a) == super::callbacks::display_text(b)
}

fn callback_name(fields: &[&str]) -> String {
    let parts = fields
        .iter()
        .map(|f| {
            f.chars()
                .map(|c| if c.is_alphanumeric() { c } else { '_' })
                .collect::<String>()
        })
        .collect::<Vec<_>>();
    format!("callback_{}", parts.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_columns_split_their_alias() {
        let column = Column::raw("UPPER(posts.subject) AS loud_subject");
        assert_eq!(column.name, "loud_subject");
        assert_eq!(column.select.as_deref(), Some("UPPER(posts.subject)"));
        assert_eq!(column.sort.as_deref(), Some("UPPER(posts.subject)"));
        assert!(column.raw);
    }

    #[test]
    fn raw_alias_is_found_case_insensitively() {
        let column = Column::raw("views * 2 as `double views`");
        assert_eq!(column.name, "double views");
        assert_eq!(column.select.as_deref(), Some("views * 2"));
    }

    #[test]
    fn callback_columns_get_a_derived_name() {
        let column = Column::callback(&["id", "author.name"], |args, _| args[0].clone());
        assert_eq!(column.name, "callback_id_author_name");
        assert_eq!(column.additional_selects, vec!["id", "author.name"]);
    }

    #[test]
    fn type_defaults_are_applied_once() {
        let column = Column::boolean("flag");
        assert!(matches!(
            column.callback,
            Some(Callback::Format(Formatter::Boolean))
        ));
        assert!(matches!(
            column.export_callback,
            Some(Callback::Format(Formatter::YesNo))
        ));
        assert!(!Column::fixed("Hello").is_sortable());
    }

    #[test]
    fn select_options_map_ids_to_names() {
        let column = Column::name("category").filterable_options([(1, "News"), (2, "Opinion")]);
        assert_eq!(column.display_value(&json!(2)), Some("Opinion"));
        assert_eq!(column.display_value(&json!("1")), Some("News"));
        assert_eq!(column.display_value(&json!(3)), None);
    }
}
