mod columns;
mod compiler;
mod errors;
mod options;
mod results;
mod schema;
pub mod sql;
mod state;
mod table;
#[cfg(test)]
mod tests;

pub use columns::{
    Align, Callback, CallbackRegistry, Column, ColumnDef, ColumnSet, ColumnType, FilterKind,
    Formatter, Row, SelectOption,
};
pub use compiler::{AggregateFunction, Compiler, QueryMode, QueryScopes, ScopeCall, ScopeClause};
pub use errors::{Error, Result};
pub use options::{Config, DialectKind, Options};
pub use results::{highlight, summarize, ExportSheet, OutputMode, PostProcessor};
pub use schema::primitive_schema::PrimitiveSchema;
pub use schema::Schema;
pub use sql::{MySql, Postgres, Sqlite};
pub use state::{
    validate_rules, ActiveFilters, DatePreset, FieldError, FilterState, Logic, MemoryStore,
    NodePath, NumberRange, Operand, Persistence, Rule, RuleNode, RuleTree, SessionStore,
    SortDirection, StorageKeys, TimePreset, TreeError, ValidationErrors, ValueRange,
};
pub use table::{
    Action, ActionOutcome, Datatable, MassActions, ResultsPage, RowSource, SavedQueries,
    SavedQuery, TableOptions,
};
