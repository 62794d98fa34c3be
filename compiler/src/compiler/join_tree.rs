use crate::errors::msg;
use crate::schema::{Link, Relation};
use crate::sql::expr::build::cmp;
use crate::sql::tree::{Join, JoinType};

use super::scope::Scope;

/// The to-one joins of a query, shared between every column that walks the same relations.
#[derive(Debug)]
pub struct JoinTree {
    alias: String,
    /// Kept in insertion order so that rendered SQL is deterministic.
    dependents: Vec<JoinEdge>,
}

#[derive(Debug)]
struct JoinEdge {
    relation_name: String,
    link: Link,
    subtree: JoinTree,
}

impl JoinTree {
    pub fn new(alias: String) -> Self {
        Self {
            alias,
            dependents: Vec::new(),
        }
    }

    pub fn get_alias(&self) -> &str {
        &self.alias
    }

    /// Walk (and grow) the tree along `relations`, returning the alias of the last table.
    pub fn integrate_chain(
        &mut self,
        relations: &[&Relation],
        get_alias: &mut impl FnMut(&Relation) -> String,
    ) -> Result<String, String> {
        let Some((next, remainder)) = relations.split_first() else {
            return Ok(self.alias.clone());
        };
        let position = self
            .dependents
            .iter()
            .position(|edge| edge.relation_name == next.name);
        let index = match position {
            Some(index) => index,
            None => {
                let link = next
                    .link_to_one()
                    .ok_or_else(|| msg::relation_without_link(&next.name))?
                    .clone();
                self.dependents.push(JoinEdge {
                    relation_name: next.name.clone(),
                    link,
                    subtree: JoinTree::new(get_alias(next)),
                });
                self.dependents.len() - 1
            }
        };
        self.dependents[index]
            .subtree
            .integrate_chain(remainder, get_alias)
    }

    /// Destroy this JoinTree and return the joins needed to render a query.
    pub fn decompose(self, scope: &Scope) -> Vec<Join> {
        let mut joins = Vec::new();
        for edge in self.dependents {
            let ending_alias = edge.subtree.get_alias().to_owned();
            let table = scope
                .schema
                .get_table(edge.link.end.table_id)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| ending_alias.clone());
            joins.push(Join {
                table,
                alias: ending_alias.clone(),
                conditions: cmp::eq(
                    scope.table_column_expr(&self.alias, &edge.link.start.column),
                    scope.table_column_expr(&ending_alias, &edge.link.end.column),
                ),
                join_type: JoinType::LeftOuter,
            });
            joins.extend(edge.subtree.decompose(scope));
        }
        joins
    }
}
