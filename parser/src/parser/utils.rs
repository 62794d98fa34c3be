use chumsky::{prelude::*, text::*};

use crate::tokens::*;

/// `Psr` is an abbreviation for "Parser". This is abbreviated because it is used in many places,
/// and we don't want it to conflict with Chumsky's `Parser` trait.
///
/// We can't write this as a type alias without [trait aliases][1].
///
/// [1]: https://github.com/rust-lang/rust/issues/41517
pub trait Psr<T>: Parser<char, T, Error = Simple<char>> + Clone + 'static {}
impl<S, T> Psr<T> for S where S: Parser<char, T, Error = Simple<char>> + Clone + 'static {}

pub fn exactly(s: &str) -> impl Psr<String> {
    just(s.chars().collect::<Vec<char>>()).collect::<String>()
}

pub fn db_identifier() -> impl Psr<String> {
    ident().or(quoted(DB_IDENTIFIER_QUOTE))
}

pub fn quoted(quote: char) -> impl Psr<String> {
    just(quote)
        .ignore_then(
            filter(move |c| *c != STRING_ESCAPE_PREFIX && *c != quote)
                .or(escape(quote))
                .repeated(),
        )
        .then_ignore(just(quote))
        .collect::<String>()
}

fn escape(quote: char) -> impl Psr<char> {
    just(STRING_ESCAPE_PREFIX).ignore_then(just(STRING_ESCAPE_PREFIX).or(just(quote)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted() {
        let p = || quoted('`').then_ignore(end());
        assert_eq!(p().parse("`first name`"), Ok("first name".to_string()));
        assert_eq!(p().parse(r"`a\`b`"), Ok("a`b".to_string()));
        assert_eq!(p().parse(r"`a\\b`"), Ok(r"a\b".to_string()));
        assert!(p().parse("`open").is_err());
    }
}
