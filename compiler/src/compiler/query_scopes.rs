use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::Value;

use crate::sql::{expr::SqlExpr, Dialect};

/// What a named scope is called with.
pub struct ScopeCall<'a> {
    pub dialect: &'a dyn Dialect,
    /// The base table, for qualifying column references.
    pub table: &'a str,
    /// The column label for scope columns, or the filter value for scope filters.
    pub argument: &'a Value,
}

impl ScopeCall<'_> {
    pub fn column(&self, name: &str) -> SqlExpr {
        SqlExpr::atom(self.dialect.table_column(self.table, name))
    }

    pub fn literal(&self, value: &Value) -> SqlExpr {
        super::values::literal(self.dialect, value)
    }
}

/// What a named scope contributes to a query.
#[derive(Debug, Clone, Default)]
pub struct ScopeClause {
    /// Extra select expressions with their aliases.
    pub columns: Vec<(SqlExpr, String)>,
    pub condition: SqlExpr,
}

impl ScopeClause {
    pub fn condition(condition: SqlExpr) -> Self {
        Self {
            columns: Vec::new(),
            condition,
        }
    }

    pub fn select(mut self, expr: SqlExpr, alias: &str) -> Self {
        self.columns.push((expr, alias.to_string()));
        self
    }
}

pub type ScopeFn = Arc<dyn Fn(&ScopeCall) -> ScopeClause + Send + Sync>;

/// Named query fragments that columns and filters can refer to.
#[derive(Clone, Default)]
pub struct QueryScopes {
    scopes: HashMap<String, ScopeFn>,
}

impl QueryScopes {
    pub fn register(
        &mut self,
        name: &str,
        f: impl Fn(&ScopeCall) -> ScopeClause + Send + Sync + 'static,
    ) -> &mut Self {
        self.scopes.insert(name.to_string(), Arc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ScopeFn> {
        self.scopes.get(name)
    }
}

impl fmt::Debug for QueryScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.scopes.keys()).finish()
    }
}
