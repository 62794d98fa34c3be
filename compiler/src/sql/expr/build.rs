use itertools::Itertools;

use crate::state::Logic;

use super::{SqlExpr, SqlExprPrecedence};

fn binary_op(a: SqlExpr, op: &str, b: SqlExpr, precedence: SqlExprPrecedence) -> SqlExpr {
    SqlExpr {
        content: format!(
            "{} {} {}",
            a.for_precedence(precedence),
            op,
            b.for_precedence(precedence)
        ),
        precedence,
    }
}

pub fn sql_func(name: &str, args: impl IntoIterator<Item = SqlExpr>) -> SqlExpr {
    SqlExpr::atom(format!("{}({})", name, args.into_iter().join(", ")))
}

pub mod agg {
    use super::*;

    pub fn avg(a: SqlExpr) -> SqlExpr {
        sql_func("AVG", [a])
    }

    pub fn count(a: SqlExpr) -> SqlExpr {
        sql_func("COUNT", [a])
    }

    pub fn count_star() -> SqlExpr {
        SqlExpr::atom("COUNT(*)".to_string())
    }

    pub fn max(a: SqlExpr) -> SqlExpr {
        sql_func("MAX", [a])
    }

    pub fn min(a: SqlExpr) -> SqlExpr {
        sql_func("MIN", [a])
    }

    pub fn sum(a: SqlExpr) -> SqlExpr {
        sql_func("SUM", [a])
    }
}

pub mod cmp {
    use super::*;

    /// A set of conditions joined by `AND` or `OR`
    pub fn condition_set(conditions: impl IntoIterator<Item = SqlExpr>, logic: Logic) -> SqlExpr {
        let separator = match logic {
            Logic::And => " AND\n",
            Logic::Or => " OR ",
        };
        let precedence = match logic {
            Logic::And => SqlExprPrecedence::LogicalAnd,
            Logic::Or => SqlExprPrecedence::LogicalOr,
        };
        let parts = conditions
            .into_iter()
            .filter(|e| !e.is_empty())
            .collect::<Vec<_>>();
        if parts.len() == 1 {
            return parts.into_iter().next().unwrap_or_default();
        }
        SqlExpr {
            content: parts
                .into_iter()
                .map(|c| c.for_precedence(precedence).content)
                .join(separator),
            precedence,
        }
    }

    pub fn and(conditions: impl IntoIterator<Item = SqlExpr>) -> SqlExpr {
        condition_set(conditions, Logic::And)
    }

    pub fn or(conditions: impl IntoIterator<Item = SqlExpr>) -> SqlExpr {
        condition_set(conditions, Logic::Or)
    }

    pub fn comparison(a: SqlExpr, op: &str, b: SqlExpr) -> SqlExpr {
        binary_op(a, op, b, SqlExprPrecedence::Comparison)
    }

    pub fn eq(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, "=", b)
    }

    pub fn neq(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, "<>", b)
    }

    pub fn gt(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, ">", b)
    }

    pub fn gte(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, ">=", b)
    }

    pub fn lt(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, "<", b)
    }

    pub fn lte(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, "<=", b)
    }

    pub fn like(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, "LIKE", b)
    }

    pub fn nlike(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, "NOT LIKE", b)
    }

    pub fn is_null(a: SqlExpr) -> SqlExpr {
        SqlExpr {
            content: format!(
                "{} IS NULL",
                a.for_precedence(SqlExprPrecedence::Comparison)
            ),
            precedence: SqlExprPrecedence::Comparison,
        }
    }

    pub fn is_not_null(a: SqlExpr) -> SqlExpr {
        SqlExpr {
            content: format!(
                "{} IS NOT NULL",
                a.for_precedence(SqlExprPrecedence::Comparison)
            ),
            precedence: SqlExprPrecedence::Comparison,
        }
    }

    pub fn between(a: SqlExpr, low: SqlExpr, high: SqlExpr) -> SqlExpr {
        let precedence = SqlExprPrecedence::Comparison;
        SqlExpr {
            content: format!(
                "{} BETWEEN {} AND {}",
                a.for_precedence(precedence),
                low.for_precedence(precedence),
                high.for_precedence(precedence)
            ),
            precedence,
        }
    }

    pub fn in_list(a: SqlExpr, items: impl IntoIterator<Item = SqlExpr>) -> SqlExpr {
        let precedence = SqlExprPrecedence::Comparison;
        SqlExpr {
            content: format!(
                "{} IN ({})",
                a.for_precedence(precedence),
                items.into_iter().join(", ")
            ),
            precedence,
        }
    }

    pub fn not(a: SqlExpr) -> SqlExpr {
        let precedence = SqlExprPrecedence::LogicalNot;
        SqlExpr {
            content: format!("NOT {}", a.for_precedence(SqlExprPrecedence::Atom)),
            precedence,
        }
    }
}

pub mod cond {
    use super::*;

    pub fn coalesce(args: impl IntoIterator<Item = SqlExpr>) -> SqlExpr {
        sql_func("COALESCE", args)
    }

    pub fn case_when(condition: SqlExpr, then: SqlExpr, otherwise: SqlExpr) -> SqlExpr {
        SqlExpr::atom(format!(
            "CASE WHEN {} THEN {} ELSE {} END",
            condition, then, otherwise
        ))
    }
}

pub mod math {
    use super::*;

    pub fn round(a: SqlExpr, places: u32) -> SqlExpr {
        sql_func("ROUND", [a, SqlExpr::atom(places.to_string())])
    }
}

pub mod strings {
    use super::*;

    pub fn lower(a: SqlExpr) -> SqlExpr {
        sql_func("LOWER", [a])
    }

    pub fn concat_op(parts: impl IntoIterator<Item = SqlExpr>) -> SqlExpr {
        let precedence = SqlExprPrecedence::Addition;
        SqlExpr {
            content: parts
                .into_iter()
                .map(|p| p.for_precedence(precedence).content)
                .join(" || "),
            precedence,
        }
        .grouped()
    }
}

pub mod value {
    use super::*;

    pub fn null() -> SqlExpr {
        SqlExpr::atom("NULL".to_string())
    }

    pub fn zero() -> SqlExpr {
        SqlExpr::atom("0".to_string())
    }

    pub fn one() -> SqlExpr {
        SqlExpr::atom("1".to_string())
    }

    pub fn number(n: f64) -> SqlExpr {
        if n.fract() == 0.0 && n.abs() < 1e15 {
            SqlExpr::atom(format!("{}", n as i64))
        } else {
            SqlExpr::atom(n.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(s: &str) -> SqlExpr {
        SqlExpr::atom(s.to_string())
    }

    #[test]
    fn nested_or_inside_and_is_parenthesized() {
        let or = cmp::or([cmp::eq(atom("a"), atom("1")), cmp::eq(atom("b"), atom("2"))]);
        let and = cmp::and([or, cmp::eq(atom("c"), atom("3"))]);
        assert_eq!(and.content, "(a = 1 OR b = 2) AND\nc = 3");
    }

    #[test]
    fn single_condition_keeps_its_precedence() {
        let set = cmp::and([SqlExpr::empty(), cmp::eq(atom("a"), atom("1"))]);
        assert_eq!(set.precedence, SqlExprPrecedence::Comparison);
        assert!(cmp::or(Vec::<SqlExpr>::new()).is_empty());
    }

    #[test]
    fn numbers_drop_integral_fractions() {
        assert_eq!(value::number(3.0).content, "3");
        assert_eq!(value::number(2.5).content, "2.5");
        assert_eq!(value::number(-4.0).content, "-4");
    }

    #[test]
    fn between_and_in_list() {
        let between = cmp::between(atom("t"), atom("'a'"), atom("'b'"));
        assert_eq!(between.content, "t BETWEEN 'a' AND 'b'");
        let list = cmp::in_list(atom("id"), [atom("1"), atom("2")]);
        assert_eq!(list.content, "id IN (1, 2)");
    }
}
