use super::{
    dialect::{json_path_string, Dialect},
    expr::{
        build::{cond, sql_func},
        SqlExpr,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MySql();

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn quote_string(&self, string: &str) -> String {
        format!("'{}'", string.replace('\\', r"\\").replace('\'', "''"))
    }

    fn concat(&self, parts: Vec<SqlExpr>, separator: &str) -> SqlExpr {
        let separator = SqlExpr::atom(self.quote_string(separator));
        let args = std::iter::once(separator).chain(
            parts
                .into_iter()
                .map(|part| cond::coalesce([part, SqlExpr::atom("''".to_string())])),
        );
        sql_func("CONCAT_WS", args)
    }

    fn json_extract(&self, column: SqlExpr, path: &[String]) -> SqlExpr {
        let path = SqlExpr::atom(self.quote_string(&json_path_string(path)));
        sql_func("JSON_UNQUOTE", [sql_func("JSON_EXTRACT", [column, path])])
    }

    fn group_concat(&self, a: SqlExpr) -> SqlExpr {
        SqlExpr::atom(format!("GROUP_CONCAT(DISTINCT {} SEPARATOR ', ')", a))
    }

    fn pinned_first(&self, key: SqlExpr, ids: Vec<SqlExpr>) -> SqlExpr {
        sql_func("FIELD", std::iter::once(key).chain(ids))
    }
}
