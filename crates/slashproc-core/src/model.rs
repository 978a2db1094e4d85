//! Schema and data model shared by every source.
//!
//! Groups and variables are the same [`Node`] type tagged by [`NodeKind`],
//! kept in flat id-keyed maps. The hierarchy lives only in `parents`, so
//! there is no pointer graph to keep consistent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel parent id attaching a source's top group to the global forest.
pub const ROOT: &str = "root";

/// Whether a node is a container or a leaf metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Group,
    Variable,
}

/// A group or variable declaration.
///
/// The id is the key of the map the node lives in and is repeated here so a
/// node can be passed around on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct Node {
    #[serde(skip)]
    pub kind: NodeKind,
    #[serde(skip)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Only meaningful for variables. May be an empty string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(
        default,
        rename = "desc",
        alias = "description",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl Node {
    pub fn group(id: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Group,
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn variable(id: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Variable,
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a parent, keeping the list free of duplicates.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.add_parent(parent);
        self
    }

    pub fn add_parent(&mut self, parent: impl Into<String>) {
        let parent = parent.into();
        if !self.parents.contains(&parent) {
            self.parents.push(parent);
        }
    }

    /// True if `root` is among the parents.
    pub fn is_root_attached(&self) -> bool {
        self.parents.iter().any(|p| p == ROOT)
    }
}

/// Group declarations keyed by id.
pub type Groups = BTreeMap<String, Node>;

/// Variable declarations keyed by id.
pub type Vars = BTreeMap<String, Node>;

/// A collected data tree: objects are groups, scalars are variable values.
pub type DataTree = Map<String, Value>;

/// Builds a group map from nodes, keyed by their ids.
pub fn groups_from<I: IntoIterator<Item = Node>>(nodes: I) -> Groups {
    nodes
        .into_iter()
        .map(|mut n| {
            n.kind = NodeKind::Group;
            (n.id.clone(), n)
        })
        .collect()
}

/// Builds a variable map from nodes, keyed by their ids.
pub fn vars_from<I: IntoIterator<Item = Node>>(nodes: I) -> Vars {
    nodes
        .into_iter()
        .map(|mut n| {
            n.kind = NodeKind::Variable;
            (n.id.clone(), n)
        })
        .collect()
}

/// Restores `id` and `kind` on nodes that came from a deserialized map.
pub fn adopt_keys(map: &mut BTreeMap<String, Node>, kind: NodeKind) {
    for (id, node) in map.iter_mut() {
        node.id = id.clone();
        node.kind = kind;
    }
}

/// The immutable schema half of a registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub groups: Groups,
    pub vars: Vars,
}

impl Schema {
    pub fn new(groups: Groups, vars: Vars) -> Self {
        Self { groups, vars }
    }

    /// The group attached to `root` and its map key, if exactly one exists.
    pub fn root_group(&self) -> Option<(&str, &Node)> {
        let mut roots = self
            .groups
            .iter()
            .filter(|(_, g)| g.is_root_attached())
            .map(|(id, g)| (id.as_str(), g));
        match (roots.next(), roots.next()) {
            (Some(root), None) => Some(root),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_serializes_desc_and_skips_missing() {
        let node = Node::variable("total")
            .with_label("Total Uptime")
            .with_unit("Seconds")
            .with_parent("uptime");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({"label": "Total Uptime", "unit": "Seconds", "parents": ["uptime"]})
        );
    }

    #[test]
    fn test_node_deserializes_desc_alias() {
        let mut groups: Groups = serde_json::from_value(json!({
            "uptime": {"label": "uptime", "description": "Uptime", "parents": ["root"]}
        }))
        .unwrap();
        adopt_keys(&mut groups, NodeKind::Group);
        let g = &groups["uptime"];
        assert_eq!(g.id, "uptime");
        assert_eq!(g.description.as_deref(), Some("Uptime"));
        assert!(g.is_root_attached());
    }

    #[test]
    fn test_add_parent_deduplicates() {
        let mut node = Node::variable("mhz");
        node.add_parent("core0");
        node.add_parent("core1");
        node.add_parent("core0");
        assert_eq!(node.parents, vec!["core0", "core1"]);
    }

    #[test]
    fn test_root_group_requires_single_candidate() {
        let schema = Schema::new(
            groups_from([
                Node::group("a").with_parent(ROOT),
                Node::group("b").with_parent("a"),
            ]),
            Vars::new(),
        );
        assert_eq!(schema.root_group().map(|(id, _)| id), Some("a"));

        let schema = Schema::new(
            groups_from([
                Node::group("a").with_parent(ROOT),
                Node::group("b").with_parent(ROOT),
            ]),
            Vars::new(),
        );
        assert!(schema.root_group().is_none());
    }

    #[test]
    fn test_root_group_uses_map_key() {
        let mut groups = Groups::new();
        groups.insert("other".into(), Node::group("uptime").with_parent(ROOT));
        let schema = Schema::new(groups, Vars::new());
        assert_eq!(schema.root_group().map(|(id, _)| id), Some("other"));
    }
}
