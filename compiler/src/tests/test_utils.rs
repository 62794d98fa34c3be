use std::{cell::RefCell, rc::Rc};

use serde_json::Value;

use crate::{
    columns::Row,
    errors::Error,
    schema::{primitive_schema::PrimitiveSchema, Schema},
    table::RowSource,
};

pub fn get_test_resource(name: &str) -> String {
    let mut d = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    d.push("resources/test");
    d.push(name);
    // We unwrap here because we only ever expect this fn to run within a unit test
    std::fs::read_to_string(d).unwrap()
}

pub fn posts_schema() -> Schema {
    let primitive: PrimitiveSchema =
        serde_json::from_str(&get_test_resource("posts_schema.json")).unwrap();
    Schema::try_from(primitive).unwrap()
}

/// Collapse runs of whitespace so SQL can be compared without caring about layout.
pub fn clean(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Serves canned rows and remembers every query it was asked to run.
#[derive(Clone, Default)]
pub struct FakeSource {
    pub rows: Rc<RefCell<Vec<Row>>>,
    pub queries: Rc<RefCell<Vec<String>>>,
}

impl FakeSource {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let source = Self::default();
        *source.rows.borrow_mut() = rows;
        source
    }

    pub fn last_query(&self) -> String {
        self.queries.borrow().last().cloned().unwrap_or_default()
    }
}

impl RowSource for FakeSource {
    fn fetch(&mut self, sql: &str) -> Result<Vec<Row>, Error> {
        self.queries.borrow_mut().push(sql.to_string());
        Ok(self.rows.borrow().clone())
    }

    fn count(&mut self, sql: &str) -> Result<u64, Error> {
        self.queries.borrow_mut().push(sql.to_string());
        Ok(self.rows.borrow().len() as u64)
    }
}
