mod parser;

pub mod ast;
pub mod tokens;

use chumsky::Parser;

/// Parse a column declaration name such as `posts.comments.body:group_concat` or
/// `settings->theme->color`.
pub fn parse_column_path(input: &str) -> Result<ast::ColumnPath, String> {
    parser::column_path()
        .parse(input)
        .map_err(|_| format!("Invalid column path `{input}`"))
}

/// Parse a raw SQL reference into a JSON document, such as `users.settings->theme`.
pub fn parse_json_reference(input: &str) -> Result<ast::JsonReference, String> {
    parser::json_reference()
        .parse(input)
        .map_err(|_| format!("Invalid JSON reference `{input}`"))
}
