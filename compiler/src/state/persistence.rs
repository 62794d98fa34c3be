use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Somewhere to keep table state between requests, such as a user session.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<Value>;

    fn put(&mut self, key: &str, value: Value);

    fn forget(&mut self, key: &str);

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn forget(&mut self, key: &str) {
        self.values.remove(key);
    }
}

/// Which parts of the state survive between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Persistence {
    pub search: bool,
    pub sort: bool,
    pub per_page: bool,
    pub hidden_columns: bool,
    pub filters: bool,
}

impl Default for Persistence {
    fn default() -> Self {
        Self {
            search: true,
            sort: true,
            per_page: true,
            hidden_columns: true,
            filters: true,
        }
    }
}

impl Persistence {
    pub fn none() -> Self {
        Self {
            search: false,
            sort: false,
            per_page: false,
            hidden_columns: false,
            filters: false,
        }
    }
}

/// Session keys for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    prefix: String,
}

impl StorageKeys {
    pub fn new(table_name: &str, prefix: Option<&str>) -> Self {
        let table = snake_case(table_name);
        let prefix = match prefix {
            Some(p) if !p.is_empty() => format!("{p}.{table}"),
            _ => table,
        };
        Self { prefix }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix, suffix)
    }

    pub fn search(&self) -> String {
        self.key("_search")
    }

    pub fn sort(&self) -> String {
        self.key("_sort")
    }

    pub fn direction(&self) -> String {
        self.key("_direction")
    }

    pub fn per_page(&self) -> String {
        self.key("_perpage")
    }

    pub fn hidden_columns(&self) -> String {
        self.key("_hidden_columns")
    }

    pub fn filters(&self) -> String {
        self.key("_filter")
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if previous_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            previous_lower = false;
        } else if c == '-' || c == ' ' || c == '.' || c == ':' {
            out.push('_');
            previous_lower = false;
        } else {
            out.push(c);
            previous_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_snake_cased_and_prefixed() {
        let keys = StorageKeys::new("PostsTable", None);
        assert_eq!(keys.search(), "posts_table_search");
        assert_eq!(keys.per_page(), "posts_table_perpage");
        let keys = StorageKeys::new("posts-table", Some("admin"));
        assert_eq!(keys.filters(), "admin.posts_table_filter");
    }

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryStore::default();
        assert!(!store.has("a"));
        store.put("a", json!([1, 2]));
        assert_eq!(store.get("a"), Some(json!([1, 2])));
        store.forget("a");
        assert!(!store.has("a"));
    }
}
