//! The serialized form of a schema, as accepted from JSON.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PrimitiveSchema {
    pub tables: Vec<PrimitiveTable>,
}

#[derive(Debug, Deserialize)]
pub struct PrimitiveTable {
    pub name: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub relations: Vec<PrimitiveRelation>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// Keys left out default to the primary key of the table on the relevant side.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrimitiveRelation {
    BelongsTo {
        name: String,
        table: String,
        foreign_key: String,
        #[serde(default)]
        owner_key: Option<String>,
    },
    HasOne {
        name: String,
        table: String,
        foreign_key: String,
        #[serde(default)]
        local_key: Option<String>,
    },
    HasMany {
        name: String,
        table: String,
        foreign_key: String,
        #[serde(default)]
        local_key: Option<String>,
    },
    HasManyThrough {
        name: String,
        table: String,
        through: String,
        first_key: String,
        second_key: String,
        #[serde(default)]
        local_key: Option<String>,
        #[serde(default)]
        second_local_key: Option<String>,
    },
    BelongsToMany {
        name: String,
        table: String,
        pivot: String,
        foreign_pivot_key: String,
        related_pivot_key: String,
        #[serde(default)]
        parent_key: Option<String>,
        #[serde(default)]
        related_key: Option<String>,
    },
}

impl PrimitiveRelation {
    pub fn name(&self) -> &str {
        match self {
            PrimitiveRelation::BelongsTo { name, .. }
            | PrimitiveRelation::HasOne { name, .. }
            | PrimitiveRelation::HasMany { name, .. }
            | PrimitiveRelation::HasManyThrough { name, .. }
            | PrimitiveRelation::BelongsToMany { name, .. } => name,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            PrimitiveRelation::BelongsTo { table, .. }
            | PrimitiveRelation::HasOne { table, .. }
            | PrimitiveRelation::HasMany { table, .. }
            | PrimitiveRelation::HasManyThrough { table, .. }
            | PrimitiveRelation::BelongsToMany { table, .. } => table,
        }
    }
}
