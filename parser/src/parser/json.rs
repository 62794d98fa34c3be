use chumsky::prelude::*;

use crate::ast::JsonReference;
use crate::tokens::*;

use super::column::json_path;
use super::utils::*;

pub fn json_reference() -> impl Psr<JsonReference> {
    db_identifier()
        .separated_by(just(PATH_SEPARATOR))
        .at_least(1)
        .then(json_path())
        .padded()
        .then_ignore(end())
        .try_map(|(mut parts, path), span| {
            if path.is_empty() {
                return Err(Simple::custom(span, "no JSON accessor"));
            }
            let column = parts
                .pop()
                .ok_or_else(|| Simple::custom(span.clone(), "missing column"))?;
            let table = match parts.len() {
                0 => None,
                1 => parts.pop(),
                _ => return Err(Simple::custom(span, "too many qualifiers")),
            };
            Ok(JsonReference {
                table,
                column,
                path,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_reference() {
        assert_eq!(
            json_reference().parse("users.settings->theme"),
            Ok(JsonReference {
                table: Some("users".to_string()),
                column: "settings".to_string(),
                path: vec!["theme".to_string()],
            })
        );
        assert_eq!(
            json_reference().parse("meta->a->b"),
            Ok(JsonReference {
                table: None,
                column: "meta".to_string(),
                path: vec!["a".to_string(), "b".to_string()],
            })
        );
        assert!(json_reference().parse("users.settings").is_err());
        assert!(json_reference().parse("db.users.settings->a").is_err());
        assert!(json_reference().parse("lower(name)").is_err());
    }
}
