use itertools::Itertools;

use super::{
    dialect::{quote_with_doubling, Dialect},
    expr::{
        build::{cond, sql_func},
        SqlExpr,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Postgres();

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with_doubling(ident, '"')
    }

    fn quote_string(&self, string: &str) -> String {
        quote_with_doubling(string, '\'')
    }

    fn concat(&self, parts: Vec<SqlExpr>, separator: &str) -> SqlExpr {
        let separator = SqlExpr::atom(self.quote_string(separator));
        let args = std::iter::once(separator).chain(parts.into_iter().map(|part| {
            cond::coalesce([self.text(part), SqlExpr::atom("''".to_string())])
        }));
        sql_func("CONCAT_WS", args)
    }

    fn json_extract(&self, column: SqlExpr, path: &[String]) -> SqlExpr {
        let keys = path.iter().map(|key| key.replace(['{', '}', ','], "")).join(",");
        let path = self.quote_string(&format!("{{{keys}}}"));
        SqlExpr::atom(format!("({} #>> {})", column, path))
    }

    fn group_concat(&self, a: SqlExpr) -> SqlExpr {
        SqlExpr::atom(format!("string_agg(DISTINCT {}, ', ')", self.text(a)))
    }

    fn text(&self, a: SqlExpr) -> SqlExpr {
        SqlExpr::atom(format!("CAST({} AS TEXT)", a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(s: &str) -> SqlExpr {
        SqlExpr::atom(s.to_string())
    }

    #[test]
    fn json_paths_use_text_extraction() {
        let expr = Postgres().json_extract(atom(r#""posts"."meta""#), &["a".into(), "b".into()]);
        assert_eq!(expr.content, r#"("posts"."meta" #>> '{a,b}')"#);
    }

    #[test]
    fn group_concat_casts_to_text() {
        assert_eq!(
            Postgres().group_concat(atom("x")).content,
            "string_agg(DISTINCT CAST(x AS TEXT), ', ')"
        );
    }
}
