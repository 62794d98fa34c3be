mod actions;
mod datatable;
mod saved_queries;
mod source;

pub use actions::*;
pub use datatable::*;
pub use saved_queries::*;
pub use source::*;
