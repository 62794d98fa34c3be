use std::{collections::BTreeMap, fmt, sync::Arc};

use serde_json::Value;

use crate::{errors::Error, results::ExportSheet};

/// Called with the action value and the selected row keys.
pub type ActionFn = Arc<dyn Fn(&str, &[String]) + Send + Sync>;

#[derive(Clone)]
pub enum ActionKind {
    Callback(Option<ActionFn>),
    Export {
        file_name: String,
        styles: Vec<(String, Value)>,
        widths: Vec<(String, f64)>,
    },
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Callback(callback) => f
                .debug_tuple("Callback")
                .field(&callback.as_ref().map(|_| ".."))
                .finish(),
            ActionKind::Export { file_name, .. } => {
                f.debug_struct("Export").field("file_name", file_name).finish()
            }
        }
    }
}

/// A mass action offered for the selected rows.
#[derive(Debug, Clone)]
pub struct Action {
    pub value: String,
    pub label: String,
    pub group: Option<String>,
    pub kind: ActionKind,
}

impl Action {
    pub fn value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            label: value.to_string(),
            group: None,
            kind: ActionKind::Callback(None),
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn callback(mut self, f: impl Fn(&str, &[String]) + Send + Sync + 'static) -> Self {
        self.kind = ActionKind::Callback(Some(Arc::new(f)));
        self
    }

    pub fn export(mut self, file_name: &str) -> Self {
        self.kind = ActionKind::Export {
            file_name: file_name.to_string(),
            styles: Vec::new(),
            widths: Vec::new(),
        };
        self
    }

    /// Only meaningful for exports.
    pub fn styles(mut self, new_styles: Vec<(String, Value)>) -> Self {
        if let ActionKind::Export { styles, .. } = &mut self.kind {
            *styles = new_styles;
        }
        self
    }

    /// Only meaningful for exports.
    pub fn widths(mut self, new_widths: Vec<(String, f64)>) -> Self {
        if let ActionKind::Export { widths, .. } = &mut self.kind {
            *widths = new_widths;
        }
        self
    }

    pub fn is_export(&self) -> bool {
        matches!(self.kind, ActionKind::Export { .. })
    }

    /// Put every action into `group`.
    pub fn group_by(group: &str, actions: Vec<Action>) -> Vec<Action> {
        actions.into_iter().map(|a| a.group(group)).collect()
    }
}

/// What running a mass action produced.
#[derive(Debug)]
pub enum ActionOutcome {
    /// Nothing chosen, or nothing selected for a callback action.
    NotRun,
    Ran,
    Export(ExportSheet),
}

/// The mass actions of a table. Values are unique.
#[derive(Debug, Clone, Default)]
pub struct MassActions {
    actions: Vec<Action>,
}

impl MassActions {
    pub fn new(actions: Vec<Action>) -> Result<Self, Error> {
        let mut duplicates: Vec<String> = Vec::new();
        for (i, action) in actions.iter().enumerate() {
            let repeated = actions[..i].iter().any(|a| a.value == action.value);
            if repeated && !duplicates.contains(&action.value) {
                duplicates.push(action.value.clone());
            }
        }
        if !duplicates.is_empty() {
            return Err(Error::DuplicateActions(duplicates));
        }
        Ok(Self { actions })
    }

    pub fn get(&self, value: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.value == value)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions by group, ungrouped ones under `None`.
    pub fn options(&self) -> BTreeMap<Option<&str>, Vec<&Action>> {
        let mut options: BTreeMap<Option<&str>, Vec<&Action>> = BTreeMap::new();
        for action in &self.actions {
            options
                .entry(action.group.as_deref())
                .or_default()
                .push(action);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_values_are_rejected() {
        let result = MassActions::new(vec![
            Action::value("delete"),
            Action::value("archive"),
            Action::value("delete"),
            Action::value("delete"),
        ]);
        match result {
            Err(Error::DuplicateActions(values)) => assert_eq!(values, vec!["delete"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn options_are_grouped() {
        let mut actions = Action::group_by(
            "Export",
            vec![
                Action::value("csv").export("posts.csv"),
                Action::value("xlsx").export("posts.xlsx"),
            ],
        );
        actions.push(Action::value("delete").label("Delete"));
        let actions = MassActions::new(actions).unwrap();
        let options = actions.options();
        assert_eq!(options[&Some("Export")].len(), 2);
        assert_eq!(options[&None][0].label, "Delete");
        assert!(actions.get("csv").unwrap().is_export());
    }
}
