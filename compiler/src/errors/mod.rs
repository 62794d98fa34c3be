mod error;
pub mod msg;

pub use error::*;
