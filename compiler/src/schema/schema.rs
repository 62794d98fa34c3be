use std::collections::HashMap;

use crate::errors::{msg, Error};

use super::primitive_schema::{PrimitiveRelation, PrimitiveSchema, PrimitiveTable};

pub type TableName = String;
pub type TableId = usize;

#[derive(Debug)]
pub struct Schema {
    pub tables: HashMap<TableId, Table>,
    pub table_lookup: HashMap<TableName, TableId>,
}

impl Schema {
    pub fn get_table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(&id)
    }

    pub fn get_table_by_name(&self, name: &str) -> Option<&Table> {
        self.table_lookup
            .get(name)
            .and_then(|id| self.tables.get(id))
    }
}

#[derive(Debug)]
pub struct Table {
    pub id: TableId,
    pub name: TableName,
    pub primary_key: String,
    /// An empty list means the columns were not declared and are not checked.
    pub columns: Vec<String>,
    relations: HashMap<String, Relation>,
}

impl Table {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.is_empty() || self.columns.iter().any(|c| c == name)
    }

    pub fn get_relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
    HasManyThrough,
    BelongsToMany,
}

impl RelationKind {
    pub fn is_to_many(&self) -> bool {
        matches!(
            self,
            RelationKind::HasMany | RelationKind::HasManyThrough | RelationKind::BelongsToMany
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub table_id: TableId,
    pub column: String,
}

/// An equality between a column in one table and a column in the next.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub start: Reference,
    pub end: Reference,
}

#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub target: TableId,
    /// At least one link. Relations through a pivot or intermediate table have two.
    pub links: Vec<Link>,
}

impl Relation {
    pub fn link_to_one(&self) -> Option<&Link> {
        if self.kind.is_to_many() {
            return None;
        }
        self.links.first()
    }
}

struct TableRefs<'p> {
    by_name: HashMap<&'p str, (TableId, &'p PrimitiveTable)>,
}

impl<'p> TableRefs<'p> {
    fn get(&self, relation: &str, name: &str) -> Result<(TableId, &'p PrimitiveTable), Error> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::Schema(msg::unknown_table_in_relation(relation, name)))
    }
}

fn reference(table: (TableId, &PrimitiveTable), column: &str) -> Result<Reference, Error> {
    let (table_id, primitive_table) = table;
    if !primitive_table.columns.is_empty() && !primitive_table.columns.iter().any(|c| c == column)
    {
        return Err(Error::Schema(msg::col_not_in_table(
            column,
            &primitive_table.name,
        )));
    }
    Ok(Reference {
        table_id,
        column: column.to_string(),
    })
}

fn link(
    start: (TableId, &PrimitiveTable),
    start_column: &str,
    end: (TableId, &PrimitiveTable),
    end_column: &str,
) -> Result<Link, Error> {
    Ok(Link {
        start: reference(start, start_column)?,
        end: reference(end, end_column)?,
    })
}

fn convert_relation(
    refs: &TableRefs,
    owner: (TableId, &PrimitiveTable),
    relation: &PrimitiveRelation,
) -> Result<Relation, Error> {
    let name = relation.name();
    let target = refs.get(name, relation.table())?;
    let (owner_pk, target_pk) = (&owner.1.primary_key, &target.1.primary_key);
    let (kind, links) = match relation {
        PrimitiveRelation::BelongsTo {
            foreign_key,
            owner_key,
            ..
        } => {
            let owner_key = owner_key.as_ref().unwrap_or(target_pk);
            let links = vec![link(owner, foreign_key, target, owner_key)?];
            (RelationKind::BelongsTo, links)
        }
        PrimitiveRelation::HasOne {
            foreign_key,
            local_key,
            ..
        } => {
            let local_key = local_key.as_ref().unwrap_or(owner_pk);
            let links = vec![link(owner, local_key, target, foreign_key)?];
            (RelationKind::HasOne, links)
        }
        PrimitiveRelation::HasMany {
            foreign_key,
            local_key,
            ..
        } => {
            let local_key = local_key.as_ref().unwrap_or(owner_pk);
            let links = vec![link(owner, local_key, target, foreign_key)?];
            (RelationKind::HasMany, links)
        }
        PrimitiveRelation::HasManyThrough {
            through,
            first_key,
            second_key,
            local_key,
            second_local_key,
            ..
        } => {
            let through = refs.get(name, through)?;
            let local_key = local_key.as_ref().unwrap_or(owner_pk);
            let second_local_key = second_local_key.as_ref().unwrap_or(&through.1.primary_key);
            let links = vec![
                link(owner, local_key, through, first_key)?,
                link(through, second_local_key, target, second_key)?,
            ];
            (RelationKind::HasManyThrough, links)
        }
        PrimitiveRelation::BelongsToMany {
            pivot,
            foreign_pivot_key,
            related_pivot_key,
            parent_key,
            related_key,
            ..
        } => {
            let pivot = refs.get(name, pivot)?;
            let parent_key = parent_key.as_ref().unwrap_or(owner_pk);
            let related_key = related_key.as_ref().unwrap_or(target_pk);
            let links = vec![
                link(owner, parent_key, pivot, foreign_pivot_key)?,
                link(pivot, related_pivot_key, target, related_key)?,
            ];
            (RelationKind::BelongsToMany, links)
        }
    };
    Ok(Relation {
        name: name.to_string(),
        kind,
        target: target.0,
        links,
    })
}

impl TryFrom<PrimitiveSchema> for Schema {
    type Error = Error;

    fn try_from(value: PrimitiveSchema) -> Result<Self, Self::Error> {
        let mut by_name = HashMap::new();
        for (id, table) in value.tables.iter().enumerate() {
            if by_name.insert(table.name.as_str(), (id, table)).is_some() {
                return Err(Error::Schema(msg::duplicate_table(&table.name)));
            }
        }
        let refs = TableRefs { by_name };

        let mut tables = HashMap::new();
        let mut table_lookup = HashMap::new();
        for (id, primitive_table) in value.tables.iter().enumerate() {
            let mut relations = HashMap::new();
            for primitive_relation in &primitive_table.relations {
                let relation = convert_relation(&refs, (id, primitive_table), primitive_relation)?;
                if relations.contains_key(&relation.name) {
                    return Err(Error::Schema(msg::duplicate_relation(
                        &relation.name,
                        &primitive_table.name,
                    )));
                }
                relations.insert(relation.name.clone(), relation);
            }
            let table = Table {
                id,
                name: primitive_table.name.clone(),
                primary_key: primitive_table.primary_key.clone(),
                columns: primitive_table.columns.clone(),
                relations,
            };
            table_lookup.insert(table.name.clone(), id);
            tables.insert(id, table);
        }
        Ok(Schema {
            tables,
            table_lookup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_utils::get_test_resource;

    fn schema_from(json: &str) -> Result<Schema, Error> {
        let primitive: PrimitiveSchema = serde_json::from_str(json)?;
        Schema::try_from(primitive)
    }

    #[test]
    fn fixture_schema_builds() {
        let schema = schema_from(&get_test_resource("posts_schema.json")).unwrap();
        let posts = schema.get_table_by_name("posts").unwrap();
        let author = posts.get_relation("author").unwrap();
        assert_eq!(author.kind, RelationKind::BelongsTo);
        assert_eq!(author.links[0].start.column, "author_id");
        assert_eq!(author.links[0].end.column, "id");
        let tags = posts.get_relation("tags").unwrap();
        assert!(tags.kind.is_to_many());
        assert_eq!(tags.links.len(), 2);
        assert!(tags.link_to_one().is_none());
    }

    #[test]
    fn unknown_relation_target_is_rejected() {
        let json = r#"{"tables": [{"name": "posts", "relations": [
            {"kind": "belongs_to", "name": "author", "table": "people", "foreign_key": "author_id"}
        ]}]}"#;
        let error = schema_from(json).unwrap_err();
        assert!(error.to_string().contains("people"));
    }

    #[test]
    fn undeclared_key_column_is_rejected() {
        let json = r#"{"tables": [
            {"name": "posts", "columns": ["id"], "relations": [
                {"kind": "belongs_to", "name": "author", "table": "users", "foreign_key": "user_id"}
            ]},
            {"name": "users", "columns": ["id"]}
        ]}"#;
        let error = schema_from(json).unwrap_err();
        assert!(error.to_string().contains("user_id"));
    }
}
