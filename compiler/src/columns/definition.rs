//! Column declarations read from JSON or TOML, for callers that configure tables as data.

use serde::Deserialize;

use crate::{errors::Error, state::SortDirection};

use super::{
    callbacks::{Callback, Formatter},
    column::Column,
    column_type::{ColumnType, FilterKind, SelectOption},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Filterable {
    Flag(bool),
    Options(Vec<SelectOption>),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ColumnDef {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub column_type: Option<ColumnType>,
    pub raw: Option<String>,
    pub fields: Vec<String>,
    pub scope: Option<String>,
    pub content: Option<String>,
    pub label: Option<String>,
    pub group: Option<String>,
    pub tooltip: Option<String>,
    pub searchable: bool,
    pub filterable: Option<Filterable>,
    pub filter_on: Vec<String>,
    pub scope_filter: Option<String>,
    pub aggregate: Option<String>,
    pub base: Option<String>,
    pub sort: Option<String>,
    pub unsortable: bool,
    pub default_sort: Option<SortDirection>,
    pub hidden: bool,
    pub prevent_export: bool,
    pub editable: bool,
    pub round: Option<u32>,
    pub format: Option<String>,
    pub callback: Option<String>,
    pub export_callback: Option<String>,
    pub summary: bool,
}

impl TryFrom<ColumnDef> for Column {
    type Error = Error;

    fn try_from(def: ColumnDef) -> Result<Self, Self::Error> {
        let missing_name = || Error::UnresolvedSelect {
            column: String::new(),
            reason: "A column definition needs a name, raw expression, fields, scope or content."
                .to_string(),
        };
        let mut column = if let Some(raw) = &def.raw {
            Column::raw(raw)
        } else if let Some(content) = &def.content {
            let column = Column::fixed(content);
            match &def.name {
                Some(name) => column.named(name),
                None => column,
            }
        } else if let Some(scope) = &def.scope {
            let alias = def.name.as_deref().unwrap_or(scope);
            Column::scope(scope, alias)
        } else if !def.fields.is_empty() {
            let fields = def.fields.iter().map(String::as_str).collect::<Vec<_>>();
            let callback = def.callback.as_deref().ok_or_else(|| Error::UnresolvedSelect {
                column: def.fields.join(", "),
                reason: "Columns with several fields need a callback.".to_string(),
            })?;
            let column = Column::named_callback(&fields, callback);
            match &def.name {
                Some(name) => column.named(name),
                None => column,
            }
        } else {
            let name = def.name.as_deref().ok_or_else(missing_name)?;
            Column::of_type(name, def.column_type.unwrap_or_default())
        };

        if let Some(label) = &def.label {
            column = column.label(label);
        }
        column.group = def.group;
        column.tooltip = def.tooltip;
        column.searchable = def.searchable;
        column.filter = match def.filterable {
            Some(Filterable::Flag(true)) => column.column_type.default_filter(),
            Some(Filterable::Options(options)) => Some(FilterKind::Select(options)),
            Some(Filterable::Flag(false)) | None => None,
        };
        if !def.filter_on.is_empty() {
            column.filter_on = def.filter_on;
        }
        if let Some(scope) = &def.scope_filter {
            column = column.scope_filter(scope);
        }
        column.aggregate = def.aggregate;
        column.base = def.base;
        if def.sort.is_some() {
            column.sort = def.sort;
        }
        if def.unsortable {
            column.sortable = false;
        }
        column.default_sort = def.default_sort;
        column.hidden = def.hidden;
        column.prevent_export = def.prevent_export;
        column.summary = def.summary;
        if def.editable {
            column = column.editable();
        }
        if let Some(places) = def.round {
            column = column.round(places);
        }
        if let Some(format) = &def.format {
            column = match column.column_type {
                ColumnType::Number => match format.parse::<u32>() {
                    Ok(places) => column.number_format(places),
                    Err(_) => column,
                },
                _ => column.date_format(format),
            };
        }
        if def.fields.is_empty() {
            if let Some(name) = def.callback {
                column.callback = Some(Callback::Named(name));
            }
        }
        if let Some(name) = def.export_callback {
            column.export_callback = Some(match name.as_str() {
                "yes_no" => Callback::Format(Formatter::YesNo),
                _ => Callback::Named(name),
            });
        }
        Ok(column)
    }
}
