mod chain;
pub mod primitive_schema;
mod schema;

pub use chain::*;
pub use schema::*;
