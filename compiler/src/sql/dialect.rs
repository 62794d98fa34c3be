use super::expr::{
    build::{cmp, cond, value},
    SqlExpr,
};

pub trait Dialect {
    /// A short lowercase name used in logs.
    fn name(&self) -> &'static str;

    /// Quote a table or column for use in SQL.
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string for use in SQL.
    fn quote_string(&self, string: &str) -> String;

    /// Render a table and column reference
    fn table_column(&self, table: &str, column: &str) -> String {
        let quoted_table = self.quote_identifier(table);
        let quoted_column = self.quote_identifier(column);
        format!("{}.{}", quoted_table, quoted_column)
    }

    /// Pack several values into one string, with NULLs rendered as empty strings.
    fn concat(&self, parts: Vec<SqlExpr>, separator: &str) -> SqlExpr;

    /// Extract a scalar from a JSON document. The result is unquoted text.
    fn json_extract(&self, column: SqlExpr, path: &[String]) -> SqlExpr;

    /// Join the distinct non-null values of a group into one comma separated string.
    fn group_concat(&self, a: SqlExpr) -> SqlExpr;

    /// Make a value usable as text, for pattern matching.
    fn text(&self, a: SqlExpr) -> SqlExpr {
        a
    }

    /// A sort key that is higher for rows whose key appears in `ids`.
    fn pinned_first(&self, key: SqlExpr, ids: Vec<SqlExpr>) -> SqlExpr {
        cond::case_when(cmp::in_list(key, ids), value::one(), value::zero())
    }
}

/// A JSON path of the form `$."a"."b"`, shared by the dialects that take path strings.
pub fn json_path_string(path: &[String]) -> String {
    let keys: String = path
        .iter()
        .map(|key| format!(".\"{}\"", key.replace('"', "\\\"")))
        .collect();
    format!("${keys}")
}

pub fn quote_with_doubling(s: &str, quote: char) -> String {
    let doubled = format!("{quote}{quote}");
    format!("{quote}{}{quote}", s.replace(quote, &doubled))
}
