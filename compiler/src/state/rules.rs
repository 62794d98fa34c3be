use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    pub fn keyword(&self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<>")]
    Neq,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "equals")]
    Equals,
    #[serde(rename = "does not equal")]
    DoesNotEqual,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "does not contain")]
    DoesNotContain,
    #[serde(rename = "begins with")]
    BeginsWith,
    #[serde(rename = "ends with")]
    EndsWith,
    #[serde(rename = "is empty")]
    IsEmpty,
    #[serde(rename = "is not empty")]
    IsNotEmpty,
    #[serde(rename = "includes")]
    Includes,
    #[serde(rename = "does not include")]
    DoesNotInclude,
}

impl Operand {
    pub fn label(&self) -> &'static str {
        match self {
            Operand::Eq => "=",
            Operand::Gt => ">",
            Operand::Lt => "<",
            Operand::Neq => "<>",
            Operand::Gte => ">=",
            Operand::Lte => "<=",
            Operand::Equals => "equals",
            Operand::DoesNotEqual => "does not equal",
            Operand::Contains => "contains",
            Operand::DoesNotContain => "does not contain",
            Operand::BeginsWith => "begins with",
            Operand::EndsWith => "ends with",
            Operand::IsEmpty => "is empty",
            Operand::IsNotEmpty => "is not empty",
            Operand::Includes => "includes",
            Operand::DoesNotInclude => "does not include",
        }
    }

    /// Operands that test for emptiness and ignore the rule's value.
    pub fn is_emptiness_test(&self) -> bool {
        matches!(self, Operand::IsEmpty | Operand::IsNotEmpty)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Rule {
    pub column: Option<usize>,
    pub operand: Option<Operand>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Group {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub content: Vec<RuleNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleNode {
    Group(Group),
    Rule { content: Rule },
}

impl RuleNode {
    pub fn rule(rule: Rule) -> Self {
        RuleNode::Rule { content: rule }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            RuleNode::Group(group) => Some(group),
            RuleNode::Rule { .. } => None,
        }
    }
}

/// The address of a node, as child indices from the root group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn split_last(&self) -> Option<(NodePath, usize)> {
        self.0
            .split_last()
            .map(|(last, parent)| (NodePath(parent.to_vec()), *last))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `self` is `other` or lies inside it.
    pub fn is_within(&self, other: &NodePath) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl From<&[usize]> for NodePath {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.0.iter().map(|i| i.to_string()).collect::<Vec<_>>();
        write!(f, "[{}]", parts.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("No node exists at {0}.")]
    InvalidPath(NodePath),
    #[error("The node at {0} is not a group.")]
    NotAGroup(NodePath),
    #[error("The node at {0} is not a rule.")]
    NotARule(NodePath),
    #[error("The root group cannot be removed, replaced or moved.")]
    RootNotAddressable,
    #[error("Cannot move {0} into itself.")]
    MoveIntoDescendant(NodePath),
}

/// The boolean rule tree edited by the query builder. The root is always a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct RuleTree {
    pub root: Group,
}

impl RuleTree {
    pub fn new(logic: Logic) -> Self {
        Self {
            root: Group {
                logic,
                content: Vec::new(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.content.is_empty()
    }

    pub fn get(&self, path: &NodePath) -> Option<&RuleNode> {
        let (first, rest) = path.0.split_first()?;
        let mut node = self.root.content.get(*first)?;
        for index in rest {
            node = node.as_group()?.content.get(*index)?;
        }
        Some(node)
    }

    pub fn group(&self, path: &NodePath) -> Option<&Group> {
        if path.is_root() {
            return Some(&self.root);
        }
        self.get(path).and_then(RuleNode::as_group)
    }

    fn node_mut(&mut self, path: &NodePath) -> Result<&mut RuleNode, TreeError> {
        let (first, rest) = path
            .0
            .split_first()
            .ok_or(TreeError::RootNotAddressable)?;
        let invalid = || TreeError::InvalidPath(path.clone());
        let mut node = self.root.content.get_mut(*first).ok_or_else(invalid)?;
        for index in rest {
            node = match node {
                RuleNode::Group(group) => group.content.get_mut(*index).ok_or_else(invalid)?,
                RuleNode::Rule { .. } => return Err(invalid()),
            };
        }
        Ok(node)
    }

    fn group_mut(&mut self, path: &NodePath) -> Result<&mut Group, TreeError> {
        if path.is_root() {
            return Ok(&mut self.root);
        }
        match self.node_mut(path)? {
            RuleNode::Group(group) => Ok(group),
            RuleNode::Rule { .. } => Err(TreeError::NotAGroup(path.clone())),
        }
    }

    fn rule_mut(&mut self, path: &NodePath) -> Result<&mut Rule, TreeError> {
        match self.node_mut(path)? {
            RuleNode::Rule { content } => Ok(content),
            RuleNode::Group(_) => Err(TreeError::NotARule(path.clone())),
        }
    }

    /// Replace the node at `path`.
    pub fn set(&mut self, path: &NodePath, node: RuleNode) -> Result<RuleNode, TreeError> {
        let slot = self.node_mut(path)?;
        Ok(std::mem::replace(slot, node))
    }

    /// Append `node` to the group at `group_path` and return its path.
    pub fn insert_child(
        &mut self,
        group_path: &NodePath,
        node: RuleNode,
    ) -> Result<NodePath, TreeError> {
        let group = self.group_mut(group_path)?;
        group.content.push(node);
        Ok(group_path.child(group.content.len() - 1))
    }

    pub fn add_rule(&mut self, group_path: &NodePath) -> Result<NodePath, TreeError> {
        self.insert_child(group_path, RuleNode::rule(Rule::default()))
    }

    pub fn add_group(&mut self, group_path: &NodePath) -> Result<NodePath, TreeError> {
        self.insert_child(group_path, RuleNode::Group(Group::default()))
    }

    pub fn remove_at(&mut self, path: &NodePath) -> Result<RuleNode, TreeError> {
        let (parent, index) = path.split_last().ok_or(TreeError::RootNotAddressable)?;
        let group = self
            .group_mut(&parent)
            .map_err(|_| TreeError::InvalidPath(path.clone()))?;
        if index >= group.content.len() {
            return Err(TreeError::InvalidPath(path.clone()));
        }
        Ok(group.content.remove(index))
    }

    /// Append a copy of the node at `path` to the same parent group.
    pub fn duplicate(&mut self, path: &NodePath) -> Result<NodePath, TreeError> {
        let (parent, _) = path.split_last().ok_or(TreeError::RootNotAddressable)?;
        let copy = self
            .get(path)
            .cloned()
            .ok_or_else(|| TreeError::InvalidPath(path.clone()))?;
        self.insert_child(&parent, copy)
    }

    /// Move the node at `from` to the end of the group at `to_group`. Returns the new path.
    pub fn move_node(
        &mut self,
        from: &NodePath,
        to_group: &NodePath,
    ) -> Result<NodePath, TreeError> {
        if from.is_root() {
            return Err(TreeError::RootNotAddressable);
        }
        if to_group.is_within(from) {
            return Err(TreeError::MoveIntoDescendant(from.clone()));
        }
        if self.get(from).is_none() {
            return Err(TreeError::InvalidPath(from.clone()));
        }
        if self.group(to_group).is_none() {
            return Err(TreeError::NotAGroup(to_group.clone()));
        }
        let node = self.remove_at(from)?;
        let target = shift_after_removal(to_group, from);
        self.insert_child(&target, node)
    }

    /// Point the rule at another column. The operand and value no longer apply and are cleared.
    pub fn set_column(&mut self, path: &NodePath, column: Option<usize>) -> Result<(), TreeError> {
        let rule = self.rule_mut(path)?;
        rule.column = column;
        rule.operand = None;
        rule.value = None;
        Ok(())
    }

    pub fn set_operand(
        &mut self,
        path: &NodePath,
        operand: Option<Operand>,
    ) -> Result<(), TreeError> {
        self.rule_mut(path)?.operand = operand;
        Ok(())
    }

    pub fn set_value(&mut self, path: &NodePath, value: Option<Value>) -> Result<(), TreeError> {
        self.rule_mut(path)?.value = value;
        Ok(())
    }

    pub fn set_logic(&mut self, path: &NodePath, logic: Logic) -> Result<(), TreeError> {
        self.group_mut(path)?.logic = logic;
        Ok(())
    }

    /// A human readable rendering, e.g. `Subject contains foo AND (Views > 3 OR Flag true)`.
    pub fn describe(&self, column_label: impl Fn(usize) -> Option<String>) -> String {
        describe_group(&self.root, &column_label)
    }

    /// Every rule in the tree with its path, depth first.
    pub fn rules(&self) -> Vec<(NodePath, &Rule)> {
        let mut found = Vec::new();
        collect_rules(&self.root, NodePath::root(), &mut found);
        found
    }
}

fn collect_rules<'a>(group: &'a Group, path: NodePath, found: &mut Vec<(NodePath, &'a Rule)>) {
    for (index, node) in group.content.iter().enumerate() {
        match node {
            RuleNode::Group(child) => collect_rules(child, path.child(index), found),
            RuleNode::Rule { content } => found.push((path.child(index), content)),
        }
    }
}

/// Removing `removed` shifts later siblings (and their subtrees) one position left.
fn shift_after_removal(path: &NodePath, removed: &NodePath) -> NodePath {
    let Some((parent, removed_index)) = removed.split_last() else {
        return path.clone();
    };
    let depth = parent.0.len();
    let mut indices = path.0.clone();
    if path.is_within(&parent) && indices.len() > depth && indices[depth] > removed_index {
        indices[depth] -= 1;
    }
    NodePath(indices)
}

fn describe_group(group: &Group, column_label: &impl Fn(usize) -> Option<String>) -> String {
    let separator = format!(" {} ", group.logic.keyword());
    group
        .content
        .iter()
        .map(|node| match node {
            RuleNode::Group(child) => format!("({})", describe_group(child, column_label)),
            RuleNode::Rule { content } => describe_rule(content, column_label),
        })
        .filter(|s| !s.is_empty() && s != "()")
        .collect::<Vec<_>>()
        .join(&separator)
}

fn describe_rule(rule: &Rule, column_label: &impl Fn(usize) -> Option<String>) -> String {
    let column = rule
        .column
        .and_then(column_label)
        .unwrap_or_default();
    let operand = rule.operand.map(|o| o.label()).unwrap_or_default();
    let value = match &rule.value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    [column.as_str(), operand, value.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(indices: &[usize]) -> NodePath {
        NodePath::from(indices)
    }

    fn rule(column: usize, operand: Operand, value: Value) -> RuleNode {
        RuleNode::rule(Rule {
            column: Some(column),
            operand: Some(operand),
            value: Some(value),
        })
    }

    fn sample() -> RuleTree {
        serde_json::from_value(json!({
            "logic": "and",
            "content": [
                {"type": "rule", "content": {"column": 1, "operand": "contains", "value": "foo"}},
                {"type": "group", "logic": "or", "content": [
                    {"type": "rule", "content": {"column": 2, "operand": ">", "value": 3}},
                    {"type": "rule", "content": {"column": 3, "value": "true"}}
                ]}
            ]
        }))
        .unwrap()
    }

    fn label(index: usize) -> Option<String> {
        ["Id", "Subject", "Views", "Flag"]
            .get(index)
            .map(|s| s.to_string())
    }

    #[test]
    fn serde_shape_round_trips_operands() {
        let tree = sample();
        let Some(RuleNode::Rule { content }) = tree.get(&path(&[0])) else {
            panic!("expected a rule");
        };
        assert_eq!(content.operand, Some(Operand::Contains));
        let back = serde_json::to_value(&tree).unwrap();
        assert_eq!(back["content"][1]["content"][0]["content"]["operand"], json!(">"));
    }

    #[test]
    fn describe_parenthesizes_nested_groups() {
        assert_eq!(
            sample().describe(label),
            "Subject contains foo AND (Views > 3 OR Flag true)"
        );
    }

    #[test]
    fn changing_column_clears_operand_and_value() {
        let mut tree = sample();
        tree.set_column(&path(&[0]), Some(2)).unwrap();
        let Some(RuleNode::Rule { content }) = tree.get(&path(&[0])) else {
            panic!("expected a rule");
        };
        assert_eq!(content.column, Some(2));
        assert_eq!(content.operand, None);
        assert_eq!(content.value, None);
    }

    #[test]
    fn add_duplicate_and_remove() {
        let mut tree = sample();
        let added = tree.add_rule(&path(&[1])).unwrap();
        assert_eq!(added, path(&[1, 2]));
        let copy = tree.duplicate(&path(&[0])).unwrap();
        assert_eq!(copy, path(&[2]));
        assert_eq!(tree.get(&copy), tree.get(&path(&[0])));
        tree.remove_at(&path(&[0])).unwrap();
        assert_eq!(tree.root.content.len(), 2);
        assert!(tree.remove_at(&NodePath::root()).is_err());
        assert!(matches!(
            tree.add_rule(&path(&[1])),
            Err(TreeError::NotAGroup(_))
        ));
    }

    #[test]
    fn move_into_later_sibling_group_adjusts_target() {
        let mut tree = sample();
        tree.insert_child(&NodePath::root(), rule(0, Operand::Eq, json!(1)))
            .unwrap();
        // Removing the first rule shifts the target group to index 0.
        let moved = tree.move_node(&path(&[0]), &path(&[1])).unwrap();
        assert_eq!(moved, path(&[0, 2]));
        assert_eq!(tree.root.content.len(), 2);
        assert!(tree.get(&path(&[0])).unwrap().as_group().is_some());
    }

    #[test]
    fn move_into_self_is_rejected_without_mutation() {
        let mut tree = sample();
        let before = tree.clone();
        assert!(matches!(
            tree.move_node(&path(&[1]), &path(&[1])),
            Err(TreeError::MoveIntoDescendant(_))
        ));
        assert!(tree.move_node(&path(&[0]), &path(&[5])).is_err());
        assert_eq!(tree, before);
    }

    #[test]
    fn rules_are_listed_depth_first() {
        let tree = sample();
        let paths = tree.rules().into_iter().map(|(p, _)| p).collect::<Vec<_>>();
        assert_eq!(paths, vec![path(&[0]), path(&[1, 0]), path(&[1, 1])]);
    }
}
