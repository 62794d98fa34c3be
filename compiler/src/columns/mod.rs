mod callbacks;
mod column;
mod column_set;
mod column_type;
mod definition;

pub use callbacks::*;
pub use column::*;
pub use column_set::*;
pub use column_type::*;
pub use definition::*;
