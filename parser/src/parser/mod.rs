mod column;
mod json;
mod utils;

pub use column::column_path;
pub use json::json_reference;
