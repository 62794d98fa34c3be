use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    columns::{display_text, CallbackRegistry, Column, ColumnType, FilterKind, Row},
    compiler::{Compiler, QueryMode, CHECKBOX_ATTRIBUTE},
    errors::Error,
    results::{highlight, summarize, ExportSheet, OutputMode, PostProcessor},
    state::{
        validate_rules, ActiveFilters, DatePreset, FilterState, MemoryStore, NumberRange,
        Operand, Persistence, RuleTree, SessionStore, SortDirection, StorageKeys, TimePreset,
        ValueRange,
    },
};

use super::{
    actions::{Action, ActionKind, ActionOutcome, MassActions},
    saved_queries::{SavedQueries, SavedQuery},
    source::RowSource,
};

/// One page of processed rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsPage {
    pub rows: Vec<Row>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl ResultsPage {
    pub fn last_page(&self) -> u32 {
        let per_page = u64::from(self.per_page.max(1));
        let pages = self.total / per_page + u64::from(self.total % per_page != 0);
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }
}

/// Bulk state applied from outside the table, e.g. by a link or a parent component.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub sort: Option<usize>,
    pub direction: Option<String>,
    /// Column names to hide. Every other column is shown.
    pub hidden_columns: Option<Vec<String>>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub select_filters: Option<BTreeMap<usize, Vec<Value>>>,
    pub boolean_filters: Option<BTreeMap<usize, Option<bool>>>,
    pub text_filters: Option<BTreeMap<usize, Vec<String>>>,
    pub number_filters: Option<BTreeMap<usize, NumberRange>>,
    pub date_filters: Option<BTreeMap<usize, ValueRange>>,
    pub datetime_filters: Option<BTreeMap<usize, ValueRange>>,
    pub time_filters: Option<BTreeMap<usize, ValueRange>>,
    pub selected: Option<Vec<String>>,
    pub pinned_records: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize)]
struct StoredFilters {
    filters: ActiveFilters,
    search: Option<String>,
}

/// An interactive table: columns, filter state and the collaborators that fetch and persist.
pub struct Datatable {
    name: String,
    compiler: Compiler,
    columns: Vec<Column>,
    state: FilterState,
    callbacks: CallbackRegistry,
    source: Box<dyn RowSource>,
    store: Box<dyn SessionStore>,
    persistence: Persistence,
    keys: StorageKeys,
    actions: MassActions,
    saved_queries: Option<Box<dyn SavedQueries>>,
    default_filters: Vec<(String, Value)>,
    per_page: Option<u32>,
    pinned_records: Vec<String>,
}

impl Datatable {
    pub fn new(compiler: Compiler, columns: Vec<Column>, source: Box<dyn RowSource>) -> Self {
        let name = compiler.base_table().to_string();
        let keys = StorageKeys::new(
            &name,
            compiler.options().config.session_key_prefix.as_deref(),
        );
        Self {
            name,
            compiler,
            columns,
            state: FilterState::default(),
            callbacks: CallbackRegistry::default(),
            source,
            store: Box::new(MemoryStore::default()),
            persistence: Persistence::default(),
            keys,
            actions: MassActions::default(),
            saved_queries: None,
            default_filters: Vec::new(),
            per_page: None,
            pinned_records: Vec::new(),
        }
    }

    /// Names the table for session storage, so that two tables over one base table keep
    /// separate state.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self.keys = StorageKeys::new(
            name,
            self.compiler.options().config.session_key_prefix.as_deref(),
        );
        self
    }

    pub fn with_store(mut self, store: Box<dyn SessionStore>, persistence: Persistence) -> Self {
        self.store = store;
        self.persistence = persistence;
        self
    }

    pub fn with_callbacks(mut self, callbacks: CallbackRegistry) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Result<Self, Error> {
        self.actions = MassActions::new(actions)?;
        Ok(self)
    }

    pub fn with_saved_queries(mut self, saved_queries: Box<dyn SavedQueries>) -> Self {
        self.saved_queries = Some(saved_queries);
        self
    }

    /// Filters applied at mount, by column name. The value takes the shape of the column's
    /// filter kind.
    pub fn with_default_filters(mut self, filters: Vec<(String, Value)>) -> Self {
        self.default_filters = filters;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn with_pinned_records(mut self, keys: Vec<String>) -> Self {
        self.pinned_records = keys;
        self
    }

    /// Initialise the state from defaults and whatever the session store kept.
    pub fn mount(mut self) -> Result<Self, Error> {
        self.initialise_search();
        self.initialise_sort();
        self.initialise_hidden_columns();
        self.initialise_default_filters()?;
        self.initialise_filters();
        self.initialise_per_page();
        self.state.pinned_records = self.pinned_records.clone();
        debug!(table = %self.name, columns = self.columns.len(), "mounted datatable");
        Ok(self)
    }

    // Readers

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Whether any per-column filter or complex query is active.
    pub fn active_filters(&self) -> bool {
        !self.state.filters.is_empty() || self.state.complex_query.is_some()
    }

    pub fn search_or_filter_active(&self) -> bool {
        self.state.search_term().is_some() || self.active_filters()
    }

    pub fn results(&mut self) -> Result<ResultsPage, Error> {
        let sql = self.compiler.compile(&self.columns, &self.state)?;
        let count_sql = self.compiler.compile_count(&self.columns, &self.state)?;
        let rows = self.source.fetch(&sql)?;
        let total = self.source.count(&count_sql)?;
        let key_name = self.qualified_key_name();
        let rows = PostProcessor::new(
            &self.columns,
            &self.compiler.options().config,
            &self.callbacks,
            OutputMode::Display,
        )
        .with_search(self.state.search.as_deref())
        .with_key_name(&key_name)
        .process(rows)?;
        trace!(rows = rows.len(), total, "fetched results");
        Ok(ResultsPage {
            rows,
            total,
            page: self.state.page,
            per_page: self.state.per_page,
        })
    }

    fn qualified_key_name(&self) -> String {
        let primary_key = self
            .compiler
            .schema()
            .get_table_by_name(self.compiler.base_table())
            .map(|t| t.primary_key.as_str())
            .unwrap_or("id");
        format!("{}.{}", self.compiler.base_table(), primary_key)
    }

    /// Every matching row with the export callbacks applied, honoring the selection.
    pub fn export(&mut self, file_name: &str) -> Result<ExportSheet, Error> {
        let sql = self
            .compiler
            .compile_query(&self.columns, &self.state, QueryMode::Export)?;
        let rows = self.source.fetch(&sql)?;
        let processor = PostProcessor::new(
            &self.columns,
            &self.compiler.options().config,
            &self.callbacks,
            OutputMode::Export,
        );
        let rows = processor.process(rows)?;
        debug!(file_name, rows = rows.len(), "exported rows");
        Ok(ExportSheet::build(file_name, processor.output_columns(), &rows))
    }

    pub fn has_summary_row(&self) -> bool {
        self.columns.iter().any(|c| c.summary)
    }

    /// The sum of a column over the given rows, or an empty string when it cannot be summed.
    pub fn summarize(&self, rows: &[Row], index: usize) -> Result<String, Error> {
        let column = self.column(index)?;
        Ok(summarize(rows, column))
    }

    /// Highlight the current search term inside any string, for use from callbacks.
    pub fn highlight_string(&self, value: &str) -> String {
        match self.state.search_term() {
            Some(term) => highlight(value, term, &self.compiler.options().config.highlight_template),
            None => value.to_string(),
        }
    }

    /// The display name of a select filter option.
    pub fn display_value(&self, index: usize, value: &Value) -> Result<String, Error> {
        let column = self.column(index)?;
        Ok(column
            .display_value(value)
            .map(str::to_string)
            .unwrap_or_else(|| display_text(value)))
    }

    fn column(&self, index: usize) -> Result<&Column, Error> {
        self.columns.get(index).ok_or(Error::InvalidColumnIndex(index))
    }

    fn column_mut(&mut self, index: usize) -> Result<&mut Column, Error> {
        self.columns
            .get_mut(index)
            .ok_or(Error::InvalidColumnIndex(index))
    }

    // Sorting and pagination

    /// Sort by a column. A `None` direction toggles when the column is already the sort column.
    pub fn sort(&mut self, index: usize, direction: Option<&str>) -> Result<(), Error> {
        let direction = direction.map(SortDirection::parse).transpose()?;
        self.column(index)?;
        if self.state.sort_index == Some(index) {
            self.state.direction = match direction {
                Some(direction) => direction,
                None => self.state.direction.flipped(),
            };
        } else {
            self.state.sort_index = Some(index);
            if let Some(direction) = direction {
                self.state.direction = direction;
            }
        }
        self.state.page = 1;
        debug!(index, direction = self.state.direction.as_sql(), "sorted");
        self.save_sort();
        Ok(())
    }

    pub fn set_page(&mut self, page: u32) {
        self.state.page = page.max(1);
    }

    pub fn set_per_page(&mut self, per_page: u32) {
        self.state.per_page = per_page.max(1);
        self.state.page = 1;
        self.save_per_page();
    }

    pub fn set_search(&mut self, search: Option<String>) -> Result<(), Error> {
        self.state.search = search;
        self.state.page = 1;
        if self.state.search_term().is_some() {
            self.set_visible_selected()?;
        } else {
            self.state.visible_selected = self.state.selected.clone();
        }
        self.save_search();
        self.save_filters();
        Ok(())
    }

    // Column visibility

    /// Show or hide a column. Hiding drops its select filter.
    pub fn toggle(&mut self, index: usize) -> Result<(), Error> {
        let hidden = self.column(index)?.hidden;
        if !hidden {
            self.state.filters.select.remove(&index);
        }
        self.column_mut(index)?.hidden = !hidden;
        if self.state.sort_index == Some(index) {
            self.apply_default_sort();
        }
        debug!(index, hidden = !hidden, "toggled column");
        self.save_hidden();
        Ok(())
    }

    pub fn reset_hidden_columns(&mut self) {
        for column in &mut self.columns {
            column.hidden = false;
        }
        self.save_hidden();
    }

    /// Column names (or labels) by group.
    pub fn column_groups(&self) -> BTreeMap<String, Vec<String>> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for column in &self.columns {
            if let Some(group) = &column.group {
                groups
                    .entry(group.clone())
                    .or_default()
                    .push(column.display_label().to_string());
            }
        }
        groups
    }

    pub fn toggle_group(&mut self, group: &str) {
        if self.is_group_visible(group) {
            self.hide_group(group);
        } else {
            self.show_group(group);
        }
    }

    pub fn show_group(&mut self, group: &str) {
        self.set_group_hidden(group, false);
    }

    pub fn hide_group(&mut self, group: &str) {
        self.set_group_hidden(group, true);
    }

    fn set_group_hidden(&mut self, group: &str, hidden: bool) {
        for column in &mut self.columns {
            if column.group.as_deref() == Some(group) {
                column.hidden = hidden;
            }
        }
        debug!(group, hidden, "toggled column group");
        self.save_hidden();
    }

    /// True when no column of the group is hidden.
    pub fn is_group_visible(&self, group: &str) -> bool {
        self.columns
            .iter()
            .filter(|c| c.group.as_deref() == Some(group))
            .all(|c| !c.hidden)
    }

    /// True when every column of the group is hidden.
    pub fn is_group_hidden(&self, group: &str) -> bool {
        self.columns
            .iter()
            .filter(|c| c.group.as_deref() == Some(group))
            .all(|c| c.hidden)
    }

    // Filters

    pub fn do_boolean_filter(&mut self, index: usize, value: Option<bool>) -> Result<(), Error> {
        self.column(index)?;
        self.state.filters.boolean.insert(index, value);
        self.after_filter_change()
    }

    pub fn do_select_filter(&mut self, index: usize, value: Value) -> Result<(), Error> {
        self.column(index)?;
        self.state
            .filters
            .select
            .entry(index)
            .or_default()
            .push(value);
        self.after_filter_change()
    }

    /// Each space separated word becomes its own token.
    pub fn do_text_filter(&mut self, index: usize, value: &str) -> Result<(), Error> {
        self.column(index)?;
        let tokens = self.state.filters.text.entry(index).or_default();
        tokens.extend(
            value
                .split(' ')
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );
        self.after_filter_change()
    }

    pub fn do_date_filter_start(&mut self, index: usize, start: &str) -> Result<(), Error> {
        self.column(index)?;
        self.state.filters.date.entry(index).or_default().start = Some(start.to_string());
        self.after_filter_change()
    }

    pub fn do_date_filter_end(&mut self, index: usize, end: &str) -> Result<(), Error> {
        self.column(index)?;
        self.state.filters.date.entry(index).or_default().end = Some(end.to_string());
        self.after_filter_change()
    }

    pub fn do_datetime_filter_start(&mut self, index: usize, start: &str) -> Result<(), Error> {
        self.column(index)?;
        self.state.filters.datetime.entry(index).or_default().start = Some(start.to_string());
        self.after_filter_change()
    }

    pub fn do_datetime_filter_end(&mut self, index: usize, end: &str) -> Result<(), Error> {
        self.column(index)?;
        self.state.filters.datetime.entry(index).or_default().end = Some(end.to_string());
        self.after_filter_change()
    }

    pub fn do_time_filter_start(&mut self, index: usize, start: &str) -> Result<(), Error> {
        self.column(index)?;
        self.state.filters.time.entry(index).or_default().start = Some(start.to_string());
        self.after_filter_change()
    }

    pub fn do_time_filter_end(&mut self, index: usize, end: &str) -> Result<(), Error> {
        self.column(index)?;
        self.state.filters.time.entry(index).or_default().end = Some(end.to_string());
        self.after_filter_change()
    }

    /// A blank or non-numeric bound clears that bound.
    pub fn do_number_filter_start(&mut self, index: usize, start: &str) -> Result<(), Error> {
        self.column(index)?;
        self.state.filters.number.entry(index).or_default().start = parse_bound(start);
        self.clear_empty_number_filter(index);
        self.after_filter_change()
    }

    pub fn do_number_filter_end(&mut self, index: usize, end: &str) -> Result<(), Error> {
        self.column(index)?;
        self.state.filters.number.entry(index).or_default().end = parse_bound(end);
        self.clear_empty_number_filter(index);
        self.after_filter_change()
    }

    /// Drop a number filter once both of its bounds are empty.
    pub fn clear_empty_number_filter(&mut self, index: usize) {
        let empty = self
            .state
            .filters
            .number
            .get(&index)
            .map(NumberRange::is_empty)
            .unwrap_or(false);
        if empty {
            trace!(index, "dropping empty number filter");
            self.state.filters.number.remove(&index);
        }
        self.state.page = 1;
        self.save_filters();
    }

    pub fn apply_date_preset(
        &mut self,
        index: usize,
        preset: DatePreset,
        today: NaiveDate,
    ) -> Result<(), Error> {
        self.column(index)?;
        if let Some(range) = preset.range(today) {
            self.state.filters.date.insert(index, range);
        }
        self.after_filter_change()
    }

    pub fn apply_time_preset(&mut self, index: usize, preset: TimePreset) -> Result<(), Error> {
        self.column(index)?;
        self.state.filters.time.insert(index, preset.range());
        self.after_filter_change()
    }

    /// Remove one selected value, or the whole filter when `position` is `None`.
    pub fn remove_select_filter(&mut self, index: usize, position: Option<usize>) {
        let select = &mut self.state.filters.select;
        match position {
            Some(position) => {
                if let Some(values) = select.get_mut(&index) {
                    if position < values.len() {
                        values.remove(position);
                    }
                }
            }
            None => {
                select.remove(&index);
            }
        }
        if select.get(&index).is_some_and(Vec::is_empty) {
            select.remove(&index);
        }
        self.after_filter_removal();
    }

    /// Remove one token, or the whole filter when `position` is `None`.
    pub fn remove_text_filter(&mut self, index: usize, position: Option<usize>) {
        let text = &mut self.state.filters.text;
        match position {
            Some(position) => {
                if let Some(tokens) = text.get_mut(&index) {
                    if position < tokens.len() {
                        tokens.remove(position);
                    }
                }
            }
            None => {
                text.remove(&index);
            }
        }
        if text.get(&index).is_some_and(Vec::is_empty) {
            text.remove(&index);
        }
        self.after_filter_removal();
    }

    pub fn remove_boolean_filter(&mut self, index: usize) {
        self.state.filters.boolean.remove(&index);
        self.after_filter_removal();
    }

    pub fn remove_number_filter(&mut self, index: usize) {
        self.state.filters.number.remove(&index);
        self.after_filter_removal();
    }

    pub fn remove_date_filter(&mut self, index: usize) {
        self.state.filters.date.remove(&index);
        self.after_filter_removal();
    }

    pub fn remove_datetime_filter(&mut self, index: usize) {
        self.state.filters.datetime.remove(&index);
        self.after_filter_removal();
    }

    pub fn remove_time_filter(&mut self, index: usize) {
        self.state.filters.time.remove(&index);
        self.after_filter_removal();
    }

    pub fn clear_all_filters(&mut self) {
        self.state.filters.clear();
        self.state.complex_query = None;
        self.after_filter_removal();
        debug!("cleared all filters");
    }

    fn after_filter_change(&mut self) -> Result<(), Error> {
        self.set_visible_selected()?;
        self.state.page = 1;
        self.save_filters();
        trace!(filters = ?self.state.filters, "filters changed");
        Ok(())
    }

    fn after_filter_removal(&mut self) {
        self.state.visible_selected = self.state.selected.clone();
        self.state.page = 1;
        self.save_filters();
    }

    // Complex query

    /// Replace the complex query. An invalid tree is rejected and the current one kept.
    pub fn complex_query(&mut self, rules: Option<RuleTree>) -> Result<(), Error> {
        if let Some(tree) = &rules {
            validate_rules(tree, &self.columns)?;
        }
        self.state.complex_query = rules.filter(|tree| !tree.is_empty());
        self.state.page = 1;
        debug!(active = self.state.complex_query.is_some(), "complex query changed");
        self.set_visible_selected()
    }

    /// Operators the rule editor offers for a column.
    pub fn operands(&self, index: usize) -> Result<&'static [Operand], Error> {
        let column = self.column(index)?;
        Ok(if column.scope_filter.is_some() {
            ColumnType::Scope.operands()
        } else {
            column.column_type.operands()
        })
    }

    /// The current complex query in words.
    pub fn describe_complex_query(&self) -> String {
        match &self.state.complex_query {
            Some(tree) => tree.describe(|index| {
                self.columns
                    .get(index)
                    .map(|c| c.display_label().to_string())
            }),
            None => String::new(),
        }
    }

    pub fn save_query(&mut self, name: &str, rules: &RuleTree) -> Result<(), Error> {
        validate_rules(rules, &self.columns)?;
        if let Some(saved) = self.saved_queries.as_mut() {
            saved.save(name, rules)?;
        }
        Ok(())
    }

    pub fn delete_query(&mut self, id: &str) -> Result<(), Error> {
        match self.saved_queries.as_mut() {
            Some(saved) => saved.delete(id),
            None => Ok(()),
        }
    }

    pub fn saved_queries(&self) -> Result<Vec<SavedQuery>, Error> {
        match &self.saved_queries {
            Some(saved) => saved.list(),
            None => Ok(Vec::new()),
        }
    }

    // Selection

    fn matching_keys(&mut self) -> Result<Vec<String>, Error> {
        let sql = self
            .compiler
            .compile_query(&self.columns, &self.state, QueryMode::All)?;
        Ok(self
            .source
            .fetch(&sql)?
            .iter()
            .filter_map(|row| row.get(CHECKBOX_ATTRIBUTE))
            .map(display_text)
            .collect())
    }

    fn set_visible_selected(&mut self) -> Result<(), Error> {
        if self.state.selected.is_empty() {
            self.state.visible_selected.clear();
            return Ok(());
        }
        let visible = self.matching_keys()?;
        self.state.visible_selected = visible
            .into_iter()
            .filter(|key| self.state.selected.contains(key))
            .collect();
        Ok(())
    }

    pub fn update_selected(&mut self, selected: Vec<String>) -> Result<(), Error> {
        self.state.selected = selected;
        if self.search_or_filter_active() {
            self.set_visible_selected()
        } else {
            self.state.visible_selected = self.state.selected.clone();
            Ok(())
        }
    }

    pub fn row_is_selected(&self, row: &Row) -> bool {
        row.get(CHECKBOX_ATTRIBUTE)
            .map(|key| self.state.selected.contains(&display_text(key)))
            .unwrap_or(false)
    }

    /// Select every matching row, or clear them when they are all selected already.
    pub fn toggle_select_all(&mut self) -> Result<(), Error> {
        if self.search_or_filter_active() {
            let visible = self.matching_keys()?;
            if self.state.visible_selected.len() == visible.len() {
                self.state.selected.retain(|key| !visible.contains(key));
                self.state.visible_selected.clear();
            } else {
                for key in &visible {
                    if !self.state.selected.contains(key) {
                        self.state.selected.push(key.clone());
                    }
                }
                self.state.selected.sort();
                self.state.visible_selected = visible;
            }
        } else {
            let count_sql = self.compiler.compile_count(&self.columns, &self.state)?;
            let total = self.source.count(&count_sql)?;
            if self.state.selected.len() as u64 == total {
                self.state.selected.clear();
            } else {
                self.state.selected = self.matching_keys()?;
            }
            self.state.visible_selected = self.state.selected.clone();
        }
        debug!(selected = self.state.selected.len(), "toggled select all");
        Ok(())
    }

    // Mass actions

    pub fn mass_actions(&self) -> &MassActions {
        &self.actions
    }

    /// Run the chosen mass action against the selection.
    pub fn mass_action(&mut self, option: Option<&str>) -> Result<ActionOutcome, Error> {
        let Some(value) = option else {
            return Ok(ActionOutcome::NotRun);
        };
        let action = self
            .actions
            .get(value)
            .cloned()
            .ok_or_else(|| Error::UnknownAction(value.to_string()))?;
        match action.kind {
            ActionKind::Export {
                file_name,
                styles,
                widths,
            } => {
                let mut sheet = self.export(&file_name)?;
                sheet.styles = styles;
                sheet.widths = widths;
                Ok(ActionOutcome::Export(sheet))
            }
            ActionKind::Callback(_) if self.state.selected.is_empty() => Ok(ActionOutcome::NotRun),
            ActionKind::Callback(callback) => {
                if let Some(callback) = callback {
                    callback(&action.value, &self.state.selected);
                }
                debug!(action = %action.value, selected = self.state.selected.len(), "ran mass action");
                Ok(ActionOutcome::Ran)
            }
        }
    }

    // Bulk control

    pub fn apply_to_table(&mut self, options: TableOptions) -> Result<(), Error> {
        if let Some(index) = options.sort {
            self.sort(index, options.direction.as_deref())?;
        }
        if let Some(hidden) = &options.hidden_columns {
            for column in &mut self.columns {
                column.hidden = hidden.contains(&column.name);
            }
            self.save_hidden();
        }
        if let Some(per_page) = options.per_page {
            self.state.per_page = per_page.max(1);
            self.save_per_page();
        }
        if let Some(search) = options.search {
            self.state.search = Some(search);
            self.save_search();
        }
        let filters = &mut self.state.filters;
        if let Some(select) = options.select_filters {
            filters.select = select;
        }
        if let Some(boolean) = options.boolean_filters {
            filters.boolean = boolean;
        }
        if let Some(text) = options.text_filters {
            filters.text = text;
        }
        if let Some(number) = options.number_filters {
            filters.number = number;
        }
        if let Some(date) = options.date_filters {
            filters.date = date;
        }
        if let Some(datetime) = options.datetime_filters {
            filters.datetime = datetime;
        }
        if let Some(time) = options.time_filters {
            filters.time = time;
        }
        if let Some(selected) = options.selected {
            self.state.selected = selected;
        }
        if let Some(pinned) = options.pinned_records {
            self.state.pinned_records = pinned;
        }
        self.state.page = 1;
        self.set_visible_selected()?;
        debug!("applied table options");
        self.save_filters();
        Ok(())
    }

    /// Back to defaults: first page, default sort and page size, nothing searched, filtered,
    /// hidden or selected.
    pub fn reset_table(&mut self) {
        self.reset_hidden_columns();
        self.state.per_page = self.default_per_page();
        self.apply_default_sort();
        self.state.search = None;
        self.state.page = 1;
        self.state.filters.clear();
        self.state.selected.clear();
        self.state.visible_selected.clear();
        self.save_per_page();
        self.save_sort();
        self.save_search();
        self.save_filters();
        debug!(table = %self.name, "reset table");
    }

    // Initialisation

    fn default_per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(self.compiler.options().config.default_per_page)
            .max(1)
    }

    fn apply_default_sort(&mut self) {
        let declared = self
            .columns
            .iter()
            .enumerate()
            .find_map(|(i, c)| c.default_sort.map(|d| (i, d)));
        match declared {
            Some((index, direction)) => {
                self.state.sort_index = Some(index);
                self.state.direction = direction;
            }
            None => {
                self.state.sort_index = self
                    .columns
                    .iter()
                    .position(|c| c.column_type.is_sortable() && !c.hidden);
                self.state.direction = SortDirection::Desc;
            }
        }
    }

    fn initialise_search(&mut self) {
        if !self.persistence.search {
            return;
        }
        if let Some(Value::String(search)) = self.store.get(&self.keys.search()) {
            self.state.search = Some(search);
        }
    }

    fn initialise_sort(&mut self) {
        self.apply_default_sort();
        if !self.persistence.sort {
            return;
        }
        if let Some(index) = self.store.get(&self.keys.sort()).and_then(|v| v.as_u64()) {
            self.state.sort_index = Some(index as usize);
        }
        if let Some(Value::String(direction)) = self.store.get(&self.keys.direction()) {
            if let Ok(direction) = SortDirection::parse(&direction) {
                self.state.direction = direction;
            }
        }
    }

    fn initialise_hidden_columns(&mut self) {
        if !self.persistence.hidden_columns {
            return;
        }
        let Some(Value::Array(hidden)) = self.store.get(&self.keys.hidden_columns()) else {
            return;
        };
        let hidden: Vec<u64> = hidden.iter().filter_map(Value::as_u64).collect();
        for (index, column) in self.columns.iter_mut().enumerate() {
            column.hidden = hidden.contains(&(index as u64));
        }
    }

    fn initialise_default_filters(&mut self) -> Result<(), Error> {
        for (name, value) in std::mem::take(&mut self.default_filters) {
            let Some(index) = self.columns.iter().position(|c| c.name == name) else {
                continue;
            };
            let filters = &mut self.state.filters;
            let column = &self.columns[index];
            let kind = column
                .filter
                .clone()
                .or_else(|| column.column_type.default_filter());
            match kind {
                Some(FilterKind::Select(_)) => {
                    let values = match value {
                        Value::Array(values) => values,
                        other => vec![other],
                    };
                    filters.select.insert(index, values);
                }
                Some(FilterKind::Boolean) => {
                    filters.boolean.insert(index, value.as_bool());
                }
                Some(FilterKind::Text) => {
                    let tokens = match value {
                        Value::Array(values) => values.iter().map(display_text).collect(),
                        other => display_text(&other)
                            .split(' ')
                            .filter(|t| !t.is_empty())
                            .map(str::to_string)
                            .collect(),
                    };
                    filters.text.insert(index, tokens);
                }
                Some(FilterKind::Number) => {
                    filters.number.insert(index, serde_json::from_value(value)?);
                }
                Some(FilterKind::Date) => {
                    filters.date.insert(index, serde_json::from_value(value)?);
                }
                Some(FilterKind::Datetime) => {
                    filters.datetime.insert(index, serde_json::from_value(value)?);
                }
                Some(FilterKind::Time) => {
                    filters.time.insert(index, serde_json::from_value(value)?);
                }
                None => {}
            }
        }
        Ok(())
    }

    fn initialise_filters(&mut self) {
        if !self.persistence.filters {
            return;
        }
        let Some(stored) = self.store.get(&self.keys.filters()) else {
            return;
        };
        match serde_json::from_value::<StoredFilters>(stored) {
            Ok(stored) => {
                let filters = &mut self.state.filters;
                let restored = stored.filters;
                if !restored.select.is_empty() {
                    filters.select = restored.select;
                }
                if !restored.boolean.is_empty() {
                    filters.boolean = restored.boolean;
                }
                if !restored.text.is_empty() {
                    filters.text = restored.text;
                }
                if !restored.number.is_empty() {
                    filters.number = restored.number;
                }
                if !restored.date.is_empty() {
                    filters.date = restored.date;
                }
                if !restored.datetime.is_empty() {
                    filters.datetime = restored.datetime;
                }
                if !restored.time.is_empty() {
                    filters.time = restored.time;
                }
                if stored.search.is_some() {
                    self.state.search = stored.search;
                }
            }
            Err(e) => debug!(error = %e, "ignoring unreadable stored filters"),
        }
    }

    fn initialise_per_page(&mut self) {
        self.state.per_page = self.default_per_page();
        if !self.persistence.per_page {
            return;
        }
        if let Some(per_page) = self.store.get(&self.keys.per_page()).and_then(|v| v.as_u64()) {
            self.state.per_page = u32::try_from(per_page).unwrap_or(u32::MAX).max(1);
        }
    }

    // Persistence

    fn save_sort(&mut self) {
        if !self.persistence.sort {
            return;
        }
        let index = self
            .state
            .sort_index
            .map(Value::from)
            .unwrap_or(Value::Null);
        self.store.put(&self.keys.sort(), index);
        let direction = Value::String(self.state.direction.as_sql().to_ascii_lowercase());
        self.store.put(&self.keys.direction(), direction);
    }

    fn save_per_page(&mut self) {
        if self.persistence.per_page {
            let key = self.keys.per_page();
            self.store.put(&key, Value::from(self.state.per_page));
        }
    }

    fn save_search(&mut self) {
        if self.persistence.search {
            let key = self.keys.search();
            let value = self.state.search.clone().map(Value::String).unwrap_or(Value::Null);
            self.store.put(&key, value);
        }
    }

    fn save_hidden(&mut self) {
        if !self.persistence.hidden_columns {
            return;
        }
        let hidden: Vec<Value> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.hidden)
            .map(|(i, _)| Value::from(i))
            .collect();
        self.store.put(&self.keys.hidden_columns(), Value::Array(hidden));
    }

    fn save_filters(&mut self) {
        if !self.persistence.filters {
            return;
        }
        let stored = StoredFilters {
            filters: self.state.filters.clone(),
            search: self.state.search.clone(),
        };
        match serde_json::to_value(stored) {
            Ok(value) => self.store.put(&self.keys.filters(), value),
            Err(e) => debug!(error = %e, "could not store filters"),
        }
    }
}

fn parse_bound(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
