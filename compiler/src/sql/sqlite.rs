use super::{
    dialect::{json_path_string, quote_with_doubling, Dialect},
    expr::{
        build::{cond, sql_func, strings},
        SqlExpr,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sqlite();

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with_doubling(ident, '"')
    }

    fn quote_string(&self, string: &str) -> String {
        quote_with_doubling(string, '\'')
    }

    fn concat(&self, parts: Vec<SqlExpr>, separator: &str) -> SqlExpr {
        let separator = SqlExpr::atom(self.quote_string(separator));
        let mut pieces = Vec::with_capacity(parts.len() * 2);
        for (index, part) in parts.into_iter().enumerate() {
            if index > 0 {
                pieces.push(separator.clone());
            }
            pieces.push(cond::coalesce([part, SqlExpr::atom("''".to_string())]));
        }
        strings::concat_op(pieces)
    }

    fn json_extract(&self, column: SqlExpr, path: &[String]) -> SqlExpr {
        let path = SqlExpr::atom(self.quote_string(&json_path_string(path)));
        sql_func("json_extract", [column, path])
    }

    fn group_concat(&self, a: SqlExpr) -> SqlExpr {
        // SQLite does not accept DISTINCT together with a separator argument.
        let separator = SqlExpr::atom(self.quote_string(", "));
        sql_func("GROUP_CONCAT", [a, separator])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(s: &str) -> SqlExpr {
        SqlExpr::atom(s.to_string())
    }

    #[test]
    fn concat_coalesces_each_part() {
        let expr = Sqlite().concat(vec![atom("a"), atom("b")], "|sep|");
        assert_eq!(
            expr.content,
            "(COALESCE(a, '') || '|sep|' || COALESCE(b, ''))"
        );
    }

    #[test]
    fn json_paths_quote_each_key() {
        let expr = Sqlite().json_extract(atom("meta"), &["a".to_string(), "b c".to_string()]);
        assert_eq!(expr.content, r#"json_extract(meta, '$."a"."b c"')"#);
    }

    #[test]
    fn identifiers_double_embedded_quotes() {
        assert_eq!(Sqlite().quote_identifier(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(Sqlite().quote_string("it's"), "'it''s'");
    }
}
