use crate::{columns::Row, errors::Error};

/// Runs compiled SQL against the relational store.
pub trait RowSource {
    fn fetch(&mut self, sql: &str) -> Result<Vec<Row>, Error>;

    /// Run a count query and read its single `aggregate` value.
    fn count(&mut self, sql: &str) -> Result<u64, Error>;
}
