use serde::{Deserialize, Serialize};

use crate::{errors::Error, state::RuleTree};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: String,
    pub name: String,
    pub rules: RuleTree,
}

/// Where users keep named complex queries. Tables without one cannot save queries.
pub trait SavedQueries {
    fn save(&mut self, name: &str, rules: &RuleTree) -> Result<(), Error>;

    fn delete(&mut self, id: &str) -> Result<(), Error>;

    fn list(&self) -> Result<Vec<SavedQuery>, Error>;
}
