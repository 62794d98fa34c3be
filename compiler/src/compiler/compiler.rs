use serde_json::Value;
use tracing::debug;

use crate::{
    columns::Column,
    errors::Error,
    schema::{primitive_schema::PrimitiveSchema, Schema},
    sql::{
        expr::{
            build::{agg, cmp},
            SqlExpr,
        },
        tree::{self, Select},
    },
    state::{validate_rules, FilterState},
    Options,
};

use super::{
    constants::{CHECKBOX_ATTRIBUTE, COUNT_ALIAS, EDIT_ID_SUFFIX},
    filters::filter_conditions,
    query_scopes::{QueryScopes, ScopeCall},
    rendering::Render,
    rules::rule_tree_condition,
    scope::Scope,
    search::search_condition,
    selects::{resolve_selection, Selection},
    sorting::sort_entries,
    values,
};

/// Which rows a compiled query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// One page of rows.
    #[default]
    Page,
    /// Every matching row.
    All,
    /// Every matching row, limited to the selection when there is one, without columns that
    /// opt out of exports.
    Export,
}

pub struct Compiler {
    options: Options,
    schema: Schema,
    base_table: String,
    scopes: QueryScopes,
}

impl Compiler {
    pub fn new(schema_json: &str, base_table: &str, options: Options) -> Result<Self, Error> {
        let primitive_schema = serde_json::from_str::<PrimitiveSchema>(schema_json)?;
        let schema = Schema::try_from(primitive_schema)?;
        Self::from_schema(schema, base_table, options)
    }

    pub fn from_schema(schema: Schema, base_table: &str, options: Options) -> Result<Self, Error> {
        if schema.get_table_by_name(base_table).is_none() {
            return Err(Error::UnknownTable(base_table.to_string()));
        }
        Ok(Self {
            options,
            schema,
            base_table: base_table.to_string(),
            scopes: QueryScopes::default(),
        })
    }

    pub fn with_scopes(mut self, scopes: QueryScopes) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    pub fn scopes(&self) -> &QueryScopes {
        &self.scopes
    }

    /// One page of rows.
    pub fn compile(&self, columns: &[Column], state: &FilterState) -> Result<String, Error> {
        self.compile_query(columns, state, QueryMode::Page)
    }

    pub fn compile_query(
        &self,
        columns: &[Column],
        state: &FilterState,
        mode: QueryMode,
    ) -> Result<String, Error> {
        let mut scope = self.scope()?;
        let mut select = Select::from(scope.get_base_table().name.clone());

        let (selected, scope_conditions) = self.select_columns(&mut scope, columns, mode)?;
        select.columns = selected;
        select.conditions = self.conditions(&mut scope, columns, state, scope_conditions, mode)?;
        select.sorting = sort_entries(&mut scope, columns, state)?;
        if mode == QueryMode::Page {
            select.limit = Some(u64::from(state.per_page.max(1)));
            select.offset = Some(state.offset());
        }
        (select.joins, select.ctes) = scope.decompose();

        let sql = format!("{};", select.render(self.options.dialect.as_ref()));
        debug!(
            dialect = self.options.dialect.name(),
            table = %self.base_table,
            columns = columns.len(),
            ctes = select.ctes.len(),
            ?mode,
            "compiled query"
        );
        Ok(sql)
    }

    /// The number of rows matching the search and filters, ignoring pagination and sorting.
    pub fn compile_count(&self, columns: &[Column], state: &FilterState) -> Result<String, Error> {
        let mut scope = self.scope()?;
        let mut select = Select::from(scope.get_base_table().name.clone());

        // Scope columns may add conditions and selected columns may add the joins the
        // conditions refer to.
        let (_, scope_conditions) = self.select_columns(&mut scope, columns, QueryMode::All)?;
        select.conditions =
            self.conditions(&mut scope, columns, state, scope_conditions, QueryMode::All)?;
        select.columns = vec![tree::Column::new(
            agg::count_star(),
            Some(COUNT_ALIAS.to_string()),
        )];
        (select.joins, select.ctes) = scope.decompose();

        Ok(format!("{};", select.render(self.options.dialect.as_ref())))
    }

    fn scope(&self) -> Result<Scope, Error> {
        Scope::build(&self.options, &self.schema, &self.scopes, &self.base_table)
    }

    fn select_columns(
        &self,
        scope: &mut Scope,
        columns: &[Column],
        mode: QueryMode,
    ) -> Result<(Vec<tree::Column>, Vec<SqlExpr>), Error> {
        let mut selected = Vec::new();
        let mut conditions = Vec::new();
        for (index, column) in columns.iter().enumerate() {
            if mode == QueryMode::Export && column.prevent_export {
                continue;
            }
            if let Some(name) = &column.scope {
                let f = self
                    .scopes
                    .get(name)
                    .ok_or_else(|| Error::UnknownScope(name.clone()))?;
                let argument = Value::String(column.display_label().to_string());
                let clause = f(&ScopeCall {
                    dialect: scope.dialect(),
                    table: &scope.get_base_table().name,
                    argument: &argument,
                });
                selected.extend(
                    clause
                        .columns
                        .into_iter()
                        .map(|(expr, alias)| tree::Column::new(expr, Some(alias))),
                );
                conditions.push(clause.condition);
                continue;
            }
            match resolve_selection(scope, index, column)? {
                None => {}
                Some(Selection::Editable { value, key }) => {
                    selected.push(tree::Column::new(value, Some(column.name.clone())));
                    selected.push(tree::Column::new(
                        key,
                        Some(format!("{}{}", column.name, EDIT_ID_SUFFIX)),
                    ));
                }
                Some(selection) => {
                    selected.push(tree::Column::new(
                        selection.value().clone(),
                        Some(column.name.clone()),
                    ));
                }
            }
        }
        selected.push(tree::Column::new(
            scope.key_expr(),
            Some(CHECKBOX_ATTRIBUTE.to_string()),
        ));
        Ok((selected, conditions))
    }

    fn conditions(
        &self,
        scope: &mut Scope,
        columns: &[Column],
        state: &FilterState,
        scope_conditions: Vec<SqlExpr>,
        mode: QueryMode,
    ) -> Result<SqlExpr, Error> {
        let mut conditions = Vec::new();
        if let Some(term) = state.search_term() {
            conditions.push(search_condition(scope, columns, term)?);
        }
        conditions.extend(scope_conditions);
        conditions.extend(filter_conditions(scope, columns, &state.filters)?);
        if let Some(tree) = &state.complex_query {
            validate_rules(tree, columns)?;
            conditions.push(rule_tree_condition(scope, columns, tree)?.grouped());
        }
        if mode == QueryMode::Export && !state.selected.is_empty() {
            let dialect = scope.dialect();
            let keys = state
                .selected
                .iter()
                .map(|key| values::key_literal(dialect, key));
            conditions.push(cmp::in_list(scope.key_expr(), keys));
        }
        Ok(cmp::and(conditions))
    }
}
