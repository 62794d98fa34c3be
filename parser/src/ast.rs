/// A parsed column name: zero or more relation hops, a field, an optional JSON path inside that
/// field and an optional aggregate function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPath {
    pub relations: Vec<String>,
    pub field: String,
    pub json_path: Vec<String>,
    pub aggregate: Option<String>,
}

impl ColumnPath {
    pub fn is_base_column(&self) -> bool {
        self.relations.is_empty()
    }

    /// The relation hops joined back together, e.g. `author.posts`.
    pub fn relation_path(&self) -> String {
        self.relations.join(".")
    }
}

/// `table.column->key->key` as found in raw select and sort expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonReference {
    pub table: Option<String>,
    pub column: String,
    pub path: Vec<String>,
}
