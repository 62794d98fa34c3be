pub const PATH_SEPARATOR: char = '.';
pub const AGGREGATE_PREFIX: char = ':';
pub const JSON_ARROW: &str = "->";
pub const DB_IDENTIFIER_QUOTE: char = '`';
pub const JSON_KEY_QUOTE: char = '"';
pub const STRING_ESCAPE_PREFIX: char = '\\';
