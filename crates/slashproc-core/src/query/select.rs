//! Filtering schema maps and data trees by selector.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::{DataTree, Node};

/// Selector tokens meaning "everything" for group and var listings.
pub const WILDCARDS: [&str; 2] = ["all", "star"];

/// The matched and unmatched halves of a lookup.
///
/// `found` is `None` when a filtered lookup matched nothing, so the reply
/// carries only `notfound`. A full listing always has `Some`, even if empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<BTreeMap<String, T>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notfound: Vec<String>,
}

impl<T> Selection<T> {
    pub fn everything(found: BTreeMap<String, T>) -> Self {
        Self {
            found: Some(found),
            notfound: Vec::new(),
        }
    }

    fn partial(found: BTreeMap<String, T>, notfound: Vec<String>) -> Self {
        Self {
            found: (!found.is_empty()).then_some(found),
            notfound,
        }
    }
}

/// Picks group or var declarations by id.
pub fn select_nodes(map: &BTreeMap<String, Node>, selectors: &[String]) -> Selection<Node> {
    if selectors.is_empty() || selectors.iter().any(|s| WILDCARDS.contains(&s.as_str())) {
        return Selection::everything(map.clone());
    }

    let mut found = BTreeMap::new();
    let mut notfound = Vec::new();
    for selector in selectors {
        match map.get(selector) {
            Some(node) => {
                found.insert(selector.clone(), node.clone());
            }
            None => notfound.push(selector.clone()),
        }
    }
    Selection::partial(found, notfound)
}

/// Scans a data tree for every node whose key is a selector.
///
/// Matches are keyed by their path below the root group (`core0/model_name`),
/// the root group itself by its own id. A matched node is returned whole and
/// not searched further.
pub fn select_data(data: DataTree, root_id: &str, selectors: &[String]) -> Selection<Value> {
    if selectors.is_empty() {
        return Selection::everything(data.into_iter().collect());
    }

    let mut scan = DataScan {
        root_prefix: format!("{root_id}/"),
        wanted: selectors.iter().map(String::as_str).collect(),
        matched: BTreeSet::new(),
        found: BTreeMap::new(),
    };
    scan.walk(&data, "");

    let notfound = selectors
        .iter()
        .filter(|s| !scan.matched.contains(s.as_str()))
        .cloned()
        .collect();
    Selection::partial(scan.found, notfound)
}

struct DataScan<'a> {
    root_prefix: String,
    wanted: BTreeSet<&'a str>,
    matched: BTreeSet<String>,
    found: BTreeMap<String, Value>,
}

impl DataScan<'_> {
    fn walk(&mut self, node: &Map<String, Value>, prefix: &str) {
        for (key, value) in node {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}/{key}")
            };

            if self.wanted.contains(key.as_str()) {
                self.matched.insert(key.clone());
                let label = path
                    .strip_prefix(&self.root_prefix)
                    .map(str::to_string)
                    .unwrap_or_else(|| path.clone());
                self.found.insert(label, value.clone());
            } else if let Value::Object(child) = value {
                self.walk(child, &path);
            }
        }
    }
}
