use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::Operand;

use super::callbacks::{Callback, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    Datetime,
    Time,
    Json,
    Editable,
    /// Fixed content, never selected from the database.
    Label,
    /// Selected by a named scope rather than by path.
    Scope,
}

impl ColumnType {
    pub fn is_sortable(&self) -> bool {
        !matches!(self, ColumnType::Label | ColumnType::Scope)
    }

    pub fn default_filter(&self) -> Option<FilterKind> {
        match self {
            ColumnType::String | ColumnType::Editable | ColumnType::Json => Some(FilterKind::Text),
            ColumnType::Number => Some(FilterKind::Number),
            ColumnType::Boolean => Some(FilterKind::Boolean),
            ColumnType::Date => Some(FilterKind::Date),
            ColumnType::Datetime => Some(FilterKind::Datetime),
            ColumnType::Time => Some(FilterKind::Time),
            ColumnType::Label | ColumnType::Scope => None,
        }
    }

    /// Operators offered by the rule editor for this type.
    pub fn operands(&self) -> &'static [Operand] {
        match self {
            ColumnType::String | ColumnType::Editable | ColumnType::Json => &[
                Operand::Equals,
                Operand::DoesNotEqual,
                Operand::Contains,
                Operand::DoesNotContain,
                Operand::BeginsWith,
                Operand::EndsWith,
                Operand::IsEmpty,
                Operand::IsNotEmpty,
            ],
            ColumnType::Number | ColumnType::Date | ColumnType::Datetime | ColumnType::Time => &[
                Operand::Eq,
                Operand::Neq,
                Operand::Gt,
                Operand::Lt,
                Operand::Gte,
                Operand::Lte,
            ],
            ColumnType::Scope => &[Operand::Includes, Operand::DoesNotInclude],
            ColumnType::Boolean | ColumnType::Label => &[],
        }
    }

    pub fn default_callback(&self) -> Option<Callback> {
        match self {
            ColumnType::Boolean => Some(Callback::Format(Formatter::Boolean)),
            ColumnType::Date => Some(Callback::Format(Formatter::Date(None))),
            ColumnType::Datetime => Some(Callback::Format(Formatter::Datetime(None))),
            ColumnType::Time => Some(Callback::Format(Formatter::Time(None))),
            ColumnType::Json => Some(Callback::Format(Formatter::JsonList)),
            _ => None,
        }
    }

    pub fn default_export_callback(&self) -> Option<Callback> {
        match self {
            ColumnType::Boolean => Some(Callback::Format(Formatter::YesNo)),
            _ => None,
        }
    }

    pub fn default_align(&self) -> Align {
        match self {
            ColumnType::Number => Align::Right,
            ColumnType::Boolean => Align::Center,
            _ => Align::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    Text,
    Number,
    Boolean,
    Date,
    Datetime,
    Time,
    Select(Vec<SelectOption>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: Value,
    pub name: String,
}

impl From<&str> for SelectOption {
    fn from(name: &str) -> Self {
        Self {
            id: Value::String(name.to_string()),
            name: name.to_string(),
        }
    }
}

impl From<(i64, &str)> for SelectOption {
    fn from((id, name): (i64, &str)) -> Self {
        Self {
            id: Value::from(id),
            name: name.to_string(),
        }
    }
}
