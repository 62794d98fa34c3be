use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Error;

use super::rules::RuleTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(token: &str) -> Result<Self, Error> {
        match token.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(Error::InvalidSortDirection(token.to_string())),
        }
    }

    pub fn is_ascending(&self) -> bool {
        *self == SortDirection::Asc
    }

    pub fn flipped(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NumberRange {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl NumberRange {
    /// The lower bound, if it is a finite number.
    pub fn start(&self) -> Option<f64> {
        self.start.filter(|n| n.is_finite())
    }

    pub fn end(&self) -> Option<f64> {
        self.end.filter(|n| n.is_finite())
    }

    pub fn is_empty(&self) -> bool {
        self.start().is_none() && self.end().is_none()
    }
}

/// Bounds of a date, datetime or time filter, as entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ValueRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ValueRange {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: Some(start.to_string()),
            end: Some(end.to_string()),
        }
    }

    pub fn start(&self) -> Option<&str> {
        present(&self.start)
    }

    pub fn end(&self) -> Option<&str> {
        present(&self.end)
    }

    pub fn is_empty(&self) -> bool {
        self.start().is_none() && self.end().is_none()
    }
}

fn present(bound: &Option<String>) -> Option<&str> {
    bound.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Per-column filter values, keyed by column index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ActiveFilters {
    pub select: BTreeMap<usize, Vec<Value>>,
    /// `None` means the filter is shown but not constraining.
    pub boolean: BTreeMap<usize, Option<bool>>,
    pub text: BTreeMap<usize, Vec<String>>,
    pub number: BTreeMap<usize, NumberRange>,
    pub date: BTreeMap<usize, ValueRange>,
    pub datetime: BTreeMap<usize, ValueRange>,
    pub time: BTreeMap<usize, ValueRange>,
}

impl ActiveFilters {
    pub fn is_empty(&self) -> bool {
        self.select.values().all(|v| v.is_empty())
            && self.boolean.values().all(|v| v.is_none())
            && self.text.values().all(|v| v.is_empty())
            && self.number.values().all(|v| v.is_empty())
            && self.date.values().all(|v| v.is_empty())
            && self.datetime.values().all(|v| v.is_empty())
            && self.time.values().all(|v| v.is_empty())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn remove_column(&mut self, index: usize) {
        self.select.remove(&index);
        self.boolean.remove(&index);
        self.text.remove(&index);
        self.number.remove(&index);
        self.date.remove(&index);
        self.datetime.remove(&index);
        self.time.remove(&index);
    }
}

/// Everything a query depends on besides the column list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub search: Option<String>,
    pub filters: ActiveFilters,
    pub complex_query: Option<RuleTree>,
    pub sort_index: Option<usize>,
    pub direction: SortDirection,
    /// Row keys ticked by the user.
    pub selected: Vec<String>,
    /// The part of `selected` that is visible under the current search and filters.
    pub visible_selected: Vec<String>,
    pub pinned_records: Vec<String>,
    pub per_page: u32,
    /// 1-based.
    pub page: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: None,
            filters: ActiveFilters::default(),
            complex_query: None,
            sort_index: None,
            direction: SortDirection::default(),
            selected: Vec::new(),
            visible_selected: Vec::new(),
            pinned_records: Vec::new(),
            per_page: 10,
            page: 1,
        }
    }
}

impl FilterState {
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn has_search_or_filters(&self) -> bool {
        self.search_term().is_some()
            || !self.filters.is_empty()
            || self
                .complex_query
                .as_ref()
                .map(|q| !q.is_empty())
                .unwrap_or(false)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sort_direction_parses_case_insensitively() {
        assert_eq!(SortDirection::parse("ASC").unwrap(), SortDirection::Asc);
        assert!(matches!(
            SortDirection::parse("sideways"),
            Err(Error::InvalidSortDirection(_))
        ));
        assert_eq!(SortDirection::Asc.flipped(), SortDirection::Desc);
    }

    #[test]
    fn blank_bounds_are_absent() {
        let range = ValueRange {
            start: Some("  ".to_string()),
            end: None,
        };
        assert!(range.is_empty());
        assert_eq!(ValueRange::new("a", "").end(), None);
    }

    #[test]
    fn unconstrained_filters_count_as_empty() {
        let mut filters = ActiveFilters::default();
        filters.boolean.insert(2, None);
        filters.select.insert(1, vec![]);
        assert!(filters.is_empty());
        filters.select.insert(1, vec![json!("a")]);
        assert!(!filters.is_empty());
        filters.remove_column(1);
        assert!(filters.is_empty());
    }

    #[test]
    fn offset_is_page_based() {
        let state = FilterState {
            per_page: 25,
            page: 3,
            ..FilterState::default()
        };
        assert_eq!(state.offset(), 50);
        let state = FilterState {
            page: 0,
            ..FilterState::default()
        };
        assert_eq!(state.offset(), 0);
    }

    #[test]
    fn state_deserializes_with_string_keys() {
        let state: FilterState = serde_json::from_str(
            r#"{"search": "foo", "filters": {"number": {"3": {"start": 1.5}}}, "page": 2}"#,
        )
        .unwrap();
        assert_eq!(state.filters.number[&3].start, Some(1.5));
        assert_eq!(state.per_page, 10);
        assert!(state.has_search_or_filters());
    }
}
