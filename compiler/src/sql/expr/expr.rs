use std::fmt::{Display, Formatter};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SqlExpr {
    pub content: String,
    pub precedence: SqlExprPrecedence,
}

impl SqlExpr {
    pub fn empty() -> SqlExpr {
        SqlExpr {
            content: String::new(),
            precedence: SqlExprPrecedence::Atom,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_null(&self) -> bool {
        self.content == "NULL"
    }

    pub fn atom(content: String) -> SqlExpr {
        SqlExpr {
            content,
            precedence: SqlExprPrecedence::Atom,
        }
    }

    /// Wrap a caller-supplied SQL fragment. Anything beyond a plain (possibly qualified or
    /// quoted) identifier or function call is treated as loosely bound so that it gets
    /// parenthesized when combined with other expressions.
    pub fn raw(content: impl Into<String>) -> SqlExpr {
        let content = content.into().trim().to_string();
        let precedence = if looks_atomic(&content) {
            SqlExprPrecedence::Atom
        } else {
            SqlExprPrecedence::LogicalOr
        };
        SqlExpr {
            content,
            precedence,
        }
    }

    fn parenthesize(&mut self) {
        self.content = format!("({})", self.content);
        self.precedence = SqlExprPrecedence::Atom;
    }

    pub fn for_precedence(mut self, precedence: SqlExprPrecedence) -> SqlExpr {
        if precedence > self.precedence {
            self.parenthesize();
        }
        self
    }

    /// Parenthesize unless the expression is already atomic.
    pub fn grouped(self) -> SqlExpr {
        if self.is_empty() {
            return self;
        }
        self.for_precedence(SqlExprPrecedence::Atom)
    }
}

fn looks_atomic(content: &str) -> bool {
    if content.is_empty() {
        return true;
    }
    let is_identifier = content
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '`' | '"' | '*'));
    if is_identifier {
        return true;
    }
    // A single function call such as `COUNT(comments.id)`
    let Some(open) = content.find('(') else {
        return false;
    };
    let name = &content[..open];
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in content[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return open + i == content.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

impl Display for SqlExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
/// https://www.postgresql.org/docs/current/sql-syntax-lexical.html#SQL-PRECEDENCE
pub enum SqlExprPrecedence {
    /// A literal value, a column name, a function call, or parentheses.
    #[default]
    Atom = 0,
    /// `*` `/` `%`
    Multiplication = -1,
    /// `+` `-` `||`
    Addition = -2,
    /// `=` `<>` `>` `>=` `<` `<=` `IS` `IS NOT` `IN` `LIKE` `NOT LIKE` `BETWEEN`
    Comparison = -3,
    /// `NOT`
    LogicalNot = -4,
    /// `AND`
    LogicalAnd = -5,
    /// `OR`
    LogicalOr = -6,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_identifiers_stay_atomic() {
        assert_eq!(SqlExpr::raw("posts.subject").precedence, SqlExprPrecedence::Atom);
        assert_eq!(SqlExpr::raw("COUNT(comments.id)").precedence, SqlExprPrecedence::Atom);
        assert_eq!(
            SqlExpr::raw("views + 1").precedence,
            SqlExprPrecedence::LogicalOr
        );
        assert_eq!(
            SqlExpr::raw("LOWER(a) || LOWER(b)").precedence,
            SqlExprPrecedence::LogicalOr
        );
    }

    #[test]
    fn grouped_wraps_compound_expressions_once() {
        let expr = SqlExpr {
            content: "a = 1 OR b = 2".to_string(),
            precedence: SqlExprPrecedence::LogicalOr,
        };
        assert_eq!(expr.grouped().content, "(a = 1 OR b = 2)");
        assert_eq!(SqlExpr::atom("a".to_string()).grouped().content, "a");
    }
}
