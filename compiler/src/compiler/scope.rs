use std::collections::{HashMap, HashSet};

use crate::{
    errors::Error,
    options::Options,
    schema::{ClarifiedPath, Relation, Schema, Table},
    sql::{
        expr::build::cmp,
        tree::{Cte, Join, JoinType, SqlExpr},
        Dialect,
    },
};

use super::{
    aggregates::{build_cte_select, outer_value, AggregateFunction, AggregateKey},
    constants::*,
    join_tree::JoinTree,
    query_scopes::QueryScopes,
    selects::Selection,
};

/// Per-query compilation state: aliases, joins, CTEs and resolved columns.
pub struct Scope<'a> {
    pub options: &'a Options,
    pub schema: &'a Schema,
    pub query_scopes: &'a QueryScopes,
    base_table: &'a Table,
    join_tree: JoinTree,
    aliases: HashSet<String>,
    ctes: Vec<Cte>,
    cte_lookup: HashMap<AggregateKey, String>,
    cte_naming_index: usize,
    selections: HashMap<usize, Option<Selection>>,
}

impl<'a> Scope<'a> {
    pub fn build(
        options: &'a Options,
        schema: &'a Schema,
        query_scopes: &'a QueryScopes,
        base_table_name: &str,
    ) -> Result<Self, Error> {
        let base_table = schema
            .get_table_by_name(base_table_name)
            .ok_or_else(|| Error::UnknownTable(base_table_name.to_string()))?;
        Ok(Self {
            options,
            schema,
            query_scopes,
            base_table,
            join_tree: JoinTree::new(base_table.name.to_owned()),
            aliases: HashSet::from([base_table.name.to_owned()]),
            ctes: Vec::new(),
            cte_lookup: HashMap::new(),
            cte_naming_index: 0,
            selections: HashMap::new(),
        })
    }

    pub fn get_base_table(&self) -> &'a Table {
        self.base_table
    }

    pub fn dialect(&self) -> &'a dyn Dialect {
        self.options.dialect.as_ref()
    }

    pub fn table_column_expr(&self, table_name: &str, column_name: &str) -> SqlExpr {
        SqlExpr::atom(self.options.dialect.table_column(table_name, column_name))
    }

    pub fn base_column_expr(&self, column_name: &str) -> SqlExpr {
        self.table_column_expr(&self.base_table.name, column_name)
    }

    /// The primary key of the base table, used as the row key.
    pub fn key_expr(&self) -> SqlExpr {
        self.base_column_expr(&self.base_table.primary_key)
    }

    pub(super) fn memoized(&self, index: usize) -> Option<&Option<Selection>> {
        self.selections.get(&index)
    }

    pub(super) fn memoize(&mut self, index: usize, selection: Option<Selection>) {
        self.selections.insert(index, selection);
    }

    /// Join a chain of to-one relations and return the alias of its last table.
    pub fn join_chain_to_one(&mut self, relations: &[&Relation]) -> Result<String, String> {
        let schema = self.schema;
        let mut aliases = std::mem::take(&mut self.aliases);
        let mut get_alias = |relation: &Relation| -> String {
            let ideal_alias = schema
                .get_table(relation.target)
                .map(|t| t.name.as_str())
                .unwrap_or(relation.name.as_str());
            let mut suffix_index: usize = 0;
            loop {
                let alias = if suffix_index == 0 {
                    ideal_alias.to_owned()
                } else {
                    format!("{}_{}", ideal_alias, suffix_index)
                };
                if aliases.insert(alias.clone()) {
                    return alias;
                }
                suffix_index += 1;
            }
        };
        let alias = self.join_tree.integrate_chain(relations, &mut get_alias);
        self.aliases = aliases;
        alias
    }

    /// The outer-query value of an aggregate over a to-many path, registering its CTE once.
    pub fn aggregate_value(
        &mut self,
        path: &ClarifiedPath,
        field: &str,
        function: AggregateFunction,
    ) -> Result<SqlExpr, String> {
        let key = AggregateKey {
            relation_path: path
                .relations
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
                .join("."),
            field: field.to_string(),
            function,
        };
        let cte_alias = match self.cte_lookup.get(&key) {
            Some(alias) => alias.clone(),
            None => {
                let (select, join_column_name) =
                    build_cte_select(self.schema, self.dialect(), path, field, function)?;
                let alias = self.get_cte_alias();
                self.ctes.push(Cte {
                    alias: alias.clone(),
                    select,
                    join_column_name,
                });
                self.cte_lookup.insert(key, alias.clone());
                alias
            }
        };
        let value = self.table_column_expr(&cte_alias, CTE_VALUE_COLUMN_ALIAS);
        Ok(outer_value(value, function))
    }

    fn get_cte_alias(&mut self) -> String {
        loop {
            let alias = format!("{}{}", CTE_ALIAS_PREFIX, self.cte_naming_index);
            self.cte_naming_index += 1;
            if self.aliases.insert(alias.clone()) {
                return alias;
            }
        }
    }

    /// Take the joins and CTEs accumulated so far. To-one joins come first.
    pub fn decompose(&mut self) -> (Vec<Join>, Vec<Cte>) {
        let join_tree = std::mem::replace(
            &mut self.join_tree,
            JoinTree::new(self.base_table.name.to_owned()),
        );
        let mut joins = join_tree.decompose(self);
        let ctes = std::mem::take(&mut self.ctes);
        joins.extend(ctes.iter().map(|cte| self.build_join_for_cte(cte)));
        (joins, ctes)
    }

    fn build_join_for_cte(&self, cte: &Cte) -> Join {
        Join {
            table: cte.alias.clone(),
            alias: cte.alias.clone(),
            conditions: cmp::eq(
                self.base_column_expr(&cte.join_column_name),
                self.table_column_expr(&cte.alias, CTE_PK_COLUMN_ALIAS),
            ),
            join_type: JoinType::LeftOuter,
        }
    }
}
