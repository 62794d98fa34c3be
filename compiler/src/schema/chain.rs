use crate::errors::msg;

use super::{Link, Relation, Schema, Table};

/// A dotted relation path resolved against the schema, starting from a base table.
#[derive(Debug, Clone)]
pub struct ClarifiedPath<'a> {
    pub relations: Vec<&'a Relation>,
    pub ending_table: &'a Table,
}

impl<'a> ClarifiedPath<'a> {
    pub fn build(schema: &'a Schema, base: &'a Table, names: &[String]) -> Result<Self, String> {
        let mut relations = Vec::with_capacity(names.len());
        let mut current = base;
        for name in names {
            let relation = current
                .get_relation(name)
                .ok_or_else(|| msg::unknown_relation(name, &current.name))?;
            current = schema
                .get_table(relation.target)
                .ok_or_else(|| msg::unknown_table_in_relation(name, &relation.target.to_string()))?;
            relations.push(relation);
        }
        Ok(Self {
            relations,
            ending_table: current,
        })
    }

    /// True when following the path can fan out to many rows.
    pub fn is_to_many(&self) -> bool {
        self.relations.iter().any(|r| r.kind.is_to_many())
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.relations.iter().flat_map(|r| r.links.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::primitive_schema::PrimitiveSchema;
    use crate::tests::test_utils::get_test_resource;

    fn schema() -> Schema {
        let primitive: PrimitiveSchema =
            serde_json::from_str(&get_test_resource("posts_schema.json")).unwrap();
        Schema::try_from(primitive).unwrap()
    }

    #[test]
    fn to_one_chain_follows_belongs_to() {
        let schema = schema();
        let posts = schema.get_table_by_name("posts").unwrap();
        let names = vec!["author".to_string(), "team".to_string()];
        let path = ClarifiedPath::build(&schema, posts, &names).unwrap();
        assert_eq!(path.ending_table.name, "teams");
        assert!(!path.is_to_many());
        assert_eq!(path.links().count(), 2);
    }

    #[test]
    fn many_to_many_chain_is_to_many() {
        let schema = schema();
        let posts = schema.get_table_by_name("posts").unwrap();
        let path = ClarifiedPath::build(&schema, posts, &["tags".to_string()]).unwrap();
        assert!(path.is_to_many());
        assert_eq!(path.ending_table.name, "tags");
    }

    #[test]
    fn unknown_relation_names_the_table() {
        let schema = schema();
        let posts = schema.get_table_by_name("posts").unwrap();
        let error = ClarifiedPath::build(&schema, posts, &["editor".to_string()]).unwrap_err();
        assert_eq!(error, "Relation `editor` not found on table `posts`.");
    }
}
