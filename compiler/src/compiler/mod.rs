mod aggregates;
mod compiler;
mod constants;
mod filters;
mod join_tree;
pub(crate) mod query_scopes;
mod rendering;
mod rules;
mod scope;
mod search;
mod selects;
mod sorting;
mod values;

pub use aggregates::AggregateFunction;
pub use compiler::{Compiler, QueryMode};
pub use constants::{CHECKBOX_ATTRIBUTE, COUNT_ALIAS, EDIT_ID_SUFFIX, SEPARATOR};
pub use query_scopes::{QueryScopes, ScopeCall, ScopeClause, ScopeFn};
