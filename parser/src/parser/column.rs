use chumsky::prelude::*;

use crate::ast::ColumnPath;
use crate::tokens::*;

use super::utils::*;

pub fn column_path() -> impl Psr<ColumnPath> {
    db_identifier()
        .separated_by(just(PATH_SEPARATOR))
        .at_least(1)
        .then(json_path())
        .then(aggregate().or_not())
        .padded()
        .then_ignore(end())
        .try_map(|((mut segments, json_path), aggregate), span| {
            let field = segments
                .pop()
                .ok_or_else(|| Simple::custom(span, "a column path needs a field"))?;
            Ok(ColumnPath {
                relations: segments,
                field,
                json_path,
                aggregate,
            })
        })
}

pub fn json_path() -> impl Psr<Vec<String>> {
    exactly(JSON_ARROW)
        .ignore_then(db_identifier().or(quoted(JSON_KEY_QUOTE)))
        .repeated()
}

fn aggregate() -> impl Psr<String> {
    just(AGGREGATE_PREFIX).ignore_then(db_identifier())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_column_path() {
        assert_eq!(
            column_path().parse("subject"),
            Ok(ColumnPath {
                relations: vec![],
                field: "subject".to_string(),
                json_path: vec![],
                aggregate: None,
            })
        );
        assert_eq!(
            column_path().parse("dummy_has_one.name"),
            Ok(ColumnPath {
                relations: strings(&["dummy_has_one"]),
                field: "name".to_string(),
                json_path: vec![],
                aggregate: None,
            })
        );
        assert_eq!(
            column_path().parse("author.posts.id:count"),
            Ok(ColumnPath {
                relations: strings(&["author", "posts"]),
                field: "id".to_string(),
                json_path: vec![],
                aggregate: Some("count".to_string()),
            })
        );
        assert_eq!(
            column_path().parse("settings->theme->\"main color\""),
            Ok(ColumnPath {
                relations: vec![],
                field: "settings".to_string(),
                json_path: strings(&["theme", "main color"]),
                aggregate: None,
            })
        );
        assert_eq!(
            column_path().parse("`order details`.total"),
            Ok(ColumnPath {
                relations: strings(&["order details"]),
                field: "total".to_string(),
                json_path: vec![],
                aggregate: None,
            })
        );

        assert!(column_path().parse("").is_err());
        assert!(column_path().parse(".foo").is_err());
        assert!(column_path().parse("foo..bar").is_err());
        assert!(column_path().parse("foo.").is_err());
        assert!(column_path().parse("foo:").is_err());
        assert!(column_path().parse("subject AS string").is_err());
        assert!(column_path().parse("COUNT(id)").is_err());
    }
}
