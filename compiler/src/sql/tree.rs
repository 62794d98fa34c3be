use crate::state::SortDirection;

pub use super::expr::{SqlExpr, SqlExprPrecedence};

#[derive(Debug, Clone)]
pub struct Select {
    pub base_table: String,
    pub columns: Vec<Column>,
    pub ctes: Vec<Cte>,
    pub joins: Vec<Join>,
    pub conditions: SqlExpr,
    pub grouping: Vec<SqlExpr>,
    pub sorting: Vec<SortEntry>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub expr: SqlExpr,
    pub alias: Option<String>,
}

impl Column {
    pub fn new(expr: SqlExpr, alias: Option<String>) -> Self {
        Self { expr, alias }
    }
}

/// A grouped sub-select supplying one aggregate value per base row.
#[derive(Debug, Clone)]
pub struct Cte {
    pub alias: String,
    pub select: Select,
    /// The column of the base table which the CTE's key column is joined against.
    pub join_column_name: String,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub table: String,
    pub alias: String,
    pub conditions: SqlExpr,
    pub join_type: JoinType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
}

#[derive(Debug, Clone)]
pub struct SortEntry {
    pub expr: SqlExpr,
    pub direction: SortDirection,
}

impl From<String> for Select {
    fn from(base_table: String) -> Self {
        Self {
            base_table,
            columns: vec![],
            ctes: vec![],
            joins: vec![],
            conditions: SqlExpr::default(),
            grouping: vec![],
            sorting: vec![],
            limit: None,
            offset: None,
        }
    }
}
