use thiserror::Error;

use crate::state::{TreeError, ValidationErrors};

/// Everything that can go wrong while building, compiling or post-processing a table.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Schema input is not valid JSON: {0}")]
    SchemaJson(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Base table `{0}` does not exist.")]
    UnknownTable(String),

    #[error("Duplicate column names: {}", .0.join(", "))]
    DuplicateColumns(Vec<String>),

    #[error("Cannot resolve column `{column}`: {reason}")]
    UnresolvedSelect { column: String, reason: String },

    #[error("Column index {0} is out of range.")]
    InvalidColumnIndex(usize),

    #[error("Invalid sort direction `{0}`. Expected `asc` or `desc`.")]
    InvalidSortDirection(String),

    #[error("Invalid time `{0}`. Expected HH:MM or HH:MM:SS.")]
    InvalidTime(String),

    #[error("Unknown scope `{0}`.")]
    UnknownScope(String),

    #[error("Unknown callback `{0}`.")]
    UnknownCallback(String),

    #[error("Invalid aggregate function `{0}`.")]
    InvalidAggregate(String),

    #[error("Duplicate action values: {}", .0.join(", "))]
    DuplicateActions(Vec<String>),

    #[error("Unknown action `{0}`.")]
    UnknownAction(String),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Row source failed: {0}")]
    Source(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
