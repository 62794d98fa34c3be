use itertools::Itertools;

use crate::sql::{tree::*, Dialect};

use super::constants::INDENT_SPACER;

pub trait Render {
    fn render(&self, dialect: &dyn Dialect) -> String;
}

impl Render for SqlExpr {
    fn render(&self, _: &dyn Dialect) -> String {
        self.to_string()
    }
}

impl Render for Select {
    fn render(&self, dialect: &dyn Dialect) -> String {
        let base_table_name = dialect.quote_identifier(&self.base_table);

        let select = "SELECT".to_string();
        let columns = indent(self.columns.render(dialect));
        let from = format!("FROM {}", base_table_name);
        let joins = self.joins.render(dialect);

        let ctes = self.ctes.render(dialect);
        let main = [select, columns, from, joins]
            .into_iter()
            .filter(|s| !s.is_empty())
            .join("\n");
        let where_ = if self.conditions.is_empty() {
            String::new()
        } else {
            let conditions = indent(self.conditions.render(dialect));
            format!("WHERE\n{conditions}")
        };
        let group = if self.grouping.is_empty() {
            String::new()
        } else {
            let grouping = self
                .grouping
                .iter()
                .map(|g| g.render(dialect))
                .filter(|s| !s.is_empty())
                .join(", ");
            format!("GROUP BY {grouping}")
        };
        let order = if self.sorting.is_empty() {
            String::new()
        } else {
            let sorting = indent(self.sorting.render(dialect));
            format!("ORDER BY\n{sorting}")
        };
        let limit = match (self.limit, self.offset) {
            (Some(limit), Some(offset)) if offset > 0 => format!("LIMIT {limit} OFFSET {offset}"),
            (Some(limit), _) => format!("LIMIT {limit}"),
            (None, _) => String::new(),
        };
        [ctes, main, where_, group, order, limit]
            .into_iter()
            .filter(|s| !s.is_empty())
            .join("\n")
    }
}

impl Render for Vec<Column> {
    fn render(&self, dialect: &dyn Dialect) -> String {
        self.iter().map(|c| c.render(dialect)).join(",\n")
    }
}

impl Render for Column {
    fn render(&self, dialect: &dyn Dialect) -> String {
        let expr = self.expr.render(dialect);
        match &self.alias {
            Some(alias) => format!("{} AS {}", expr, dialect.quote_identifier(alias)),
            None => expr,
        }
    }
}

impl Render for Vec<Cte> {
    fn render(&self, dialect: &dyn Dialect) -> String {
        if self.is_empty() {
            return String::new();
        }
        let ctes = indent(
            self.iter()
                .map(|cte| cte.render(dialect))
                .filter(|s| !s.is_empty())
                .join(",\n"),
        );
        format!("WITH\n{ctes}")
    }
}

impl Render for Cte {
    fn render(&self, dialect: &dyn Dialect) -> String {
        let alias = dialect.quote_identifier(&self.alias);
        let select = indent(self.select.render(dialect));
        format!("{alias} AS (\n{select}\n)")
    }
}

impl Render for Vec<Join> {
    fn render(&self, dialect: &dyn Dialect) -> String {
        self.iter()
            .map(|j| j.render(dialect))
            .filter(|s| !s.is_empty())
            .join("\n")
    }
}

impl Render for Join {
    fn render(&self, dialect: &dyn Dialect) -> String {
        let quoted_table = dialect.quote_identifier(&self.table);
        let table_expr = if self.alias == self.table {
            quoted_table
        } else {
            let quoted_alias = dialect.quote_identifier(&self.alias);
            format!("{} AS {}", quoted_table, quoted_alias)
        };
        let condition_set = indent(self.conditions.render(dialect));
        let join_type = match self.join_type {
            JoinType::Inner => "JOIN",
            JoinType::LeftOuter => "LEFT JOIN",
        };
        format!("{join_type} {table_expr} ON\n{condition_set}")
    }
}

impl Render for Vec<SortEntry> {
    fn render(&self, dialect: &dyn Dialect) -> String {
        self.iter().map(|e| e.render(dialect)).join(",\n")
    }
}

impl Render for SortEntry {
    fn render(&self, _: &dyn Dialect) -> String {
        format!("{} {}", self.expr, self.direction.as_sql())
    }
}

fn indent(s: String) -> String {
    s.lines()
        .map(|line| format!("{}{}", INDENT_SPACER, line))
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sql::Sqlite, state::SortDirection};

    #[test]
    fn select_clauses_appear_in_order() {
        let mut select = Select::from("posts".to_string());
        select.columns = vec![
            Column::new(SqlExpr::atom("\"posts\".\"id\"".to_string()), None),
            Column::new(
                SqlExpr::atom("\"users\".\"name\"".to_string()),
                Some("author.name".to_string()),
            ),
        ];
        select.joins = vec![Join {
            table: "users".to_string(),
            alias: "users".to_string(),
            conditions: SqlExpr::atom("\"posts\".\"author_id\" = \"users\".\"id\"".to_string()),
            join_type: JoinType::LeftOuter,
        }];
        select.conditions = SqlExpr::atom("\"posts\".\"flag\" = 1".to_string());
        select.sorting = vec![SortEntry {
            expr: SqlExpr::atom("\"posts\".\"id\"".to_string()),
            direction: SortDirection::Asc,
        }];
        select.limit = Some(10);
        select.offset = Some(20);
        assert_eq!(
            select.render(&Sqlite()),
            [
                "SELECT",
                "  \"posts\".\"id\",",
                "  \"users\".\"name\" AS \"author.name\"",
                "FROM \"posts\"",
                "LEFT JOIN \"users\" ON",
                "  \"posts\".\"author_id\" = \"users\".\"id\"",
                "WHERE",
                "  \"posts\".\"flag\" = 1",
                "ORDER BY",
                "  \"posts\".\"id\" ASC",
                "LIMIT 10 OFFSET 20",
            ]
            .join("\n")
        );
    }

    #[test]
    fn first_page_has_no_offset() {
        let mut select = Select::from("posts".to_string());
        select.columns = vec![Column::new(SqlExpr::atom("1".to_string()), None)];
        select.limit = Some(5);
        select.offset = Some(0);
        assert_eq!(select.render(&Sqlite()), "SELECT\n  1\nFROM \"posts\"\nLIMIT 5");
    }
}
