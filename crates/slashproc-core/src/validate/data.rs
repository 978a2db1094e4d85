//! Conformance of a collected data tree against its declared schema.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::trace;

use crate::canon::is_canonical;
use crate::model::{DataTree, Groups, Vars};

use super::{Diagnostic, DiagnosticKind as K, Report};

/// Walks `data` against `groups` and `vars`, reporting every offending key.
///
/// The tree must hold exactly one top-level key, the source's own root group.
pub fn validate_data(source_id: &str, groups: &Groups, vars: &Vars, data: &DataTree) -> Report {
    let mut walk = Walk {
        groups,
        vars,
        remaining: groups.keys().map(String::as_str).collect(),
        out: Vec::new(),
    };

    if data.len() != 1 || !data.contains_key(source_id) {
        let found: Vec<_> = data.keys().map(String::as_str).collect();
        walk.out.push(Diagnostic::new(
            K::RootGroupMissing,
            source_id,
            format!(
                "first level in data must be the single key '{source_id}', found [{}]",
                found.join(", ")
            ),
        ));
    }

    walk.node(data, "");
    trace!(
        source = source_id,
        unvisited = walk.remaining.len(),
        "data walk finished"
    );

    Report::from_diagnostics(walk.out)
}

struct Walk<'a> {
    groups: &'a Groups,
    vars: &'a Vars,
    /// Groups not yet seen in the tree. Partial data is legal, so leftovers are not reported.
    remaining: BTreeSet<&'a str>,
    out: Vec<Diagnostic>,
}

impl Walk<'_> {
    fn node(&mut self, node: &DataTree, prefix: &str) {
        for (key, value) in node {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}/{key}")
            };

            if !is_canonical(key) {
                self.out.push(Diagnostic::new(
                    K::BadKeyFormat,
                    &path,
                    format!("key '{key}' does not conform to the key format"),
                ));
            }

            match value {
                Value::Object(child) => {
                    if self.groups.contains_key(key) {
                        self.remaining.remove(key.as_str());
                        self.node(child, &path);
                    } else {
                        self.out.push(Diagnostic::new(
                            K::UnknownGroup,
                            &path,
                            format!("group '{key}' not found"),
                        ));
                    }
                }
                Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                    if !self.vars.contains_key(key) {
                        self.out.push(Diagnostic::new(
                            K::UnknownVariable,
                            &path,
                            format!("variable '{key}' not found"),
                        ));
                    }
                }
                Value::Null | Value::Array(_) => {
                    self.out.push(Diagnostic::new(
                        K::UnsupportedValue,
                        &path,
                        format!("key '{key}' holds neither a group nor a scalar value"),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, ROOT, groups_from, vars_from};
    use serde_json::json;

    fn tree(value: Value) -> DataTree {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn cpu_schema() -> (Groups, Vars) {
        let groups = groups_from([
            Node::group("cpuinfo").with_parent(ROOT),
            Node::group("core0").with_parent("cpuinfo"),
            Node::group("core1").with_parent("cpuinfo"),
        ]);
        let vars = vars_from([
            Node::variable("mhz").with_parent("core0").with_parent("core1"),
            Node::variable("model_name")
                .with_parent("core0")
                .with_parent("core1"),
        ]);
        (groups, vars)
    }

    #[test]
    fn test_conforming_tree() {
        let (groups, vars) = cpu_schema();
        let data = tree(json!({
            "cpuinfo": {
                "core0": {"mhz": "2400.000", "model_name": "Xeon"},
                "core1": {"mhz": "2400.000", "model_name": "Xeon"}
            }
        }));
        let report = validate_data("cpuinfo", &groups, &vars, &data);
        assert!(report.ok, "{:?}", report.diagnostics);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_partial_tree_is_legal() {
        let (groups, vars) = cpu_schema();
        let data = tree(json!({"cpuinfo": {"core0": {"mhz": 2400}}}));
        assert!(validate_data("cpuinfo", &groups, &vars, &data).ok);
    }

    #[test]
    fn test_reports_every_unknown_key() {
        let (groups, vars) = cpu_schema();
        let data = tree(json!({
            "cpuinfo": {
                "core0": {"mhz": "1", "bogus": "x"},
                "core1": {"other": "y"},
                "core9": {"mhz": "1"}
            }
        }));
        let report = validate_data("cpuinfo", &groups, &vars, &data);
        assert!(!report.ok);
        assert_eq!(report.count(K::UnknownVariable), 2);
        assert_eq!(report.count(K::UnknownGroup), 1);
        assert_eq!(report.diagnostics.len(), 3);
        let paths: Vec<_> = report.diagnostics.iter().map(|d| d.subject.as_str()).collect();
        assert!(paths.contains(&"cpuinfo/core0/bogus"));
        assert!(paths.contains(&"cpuinfo/core9"));
    }

    #[test]
    fn test_single_unknown_leaf() {
        let (groups, vars) = cpu_schema();
        let data = tree(json!({"cpuinfo": {"core0": {"undeclared": "1"}}}));
        let report = validate_data("cpuinfo", &groups, &vars, &data);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, K::UnknownVariable);
    }

    #[test]
    fn test_root_group_missing() {
        let (groups, vars) = cpu_schema();
        let data = tree(json!({"core0": {"mhz": "1"}}));
        let report = validate_data("cpuinfo", &groups, &vars, &data);
        assert!(report.has(K::RootGroupMissing));

        let data = tree(json!({"cpuinfo": {}, "core0": {}}));
        let report = validate_data("cpuinfo", &groups, &vars, &data);
        assert_eq!(report.count(K::RootGroupMissing), 1);
    }

    #[test]
    fn test_bad_key_format() {
        let (groups, vars) = cpu_schema();
        let data = tree(json!({"cpuinfo": {"core0": {"Model Name": "x"}}}));
        let report = validate_data("cpuinfo", &groups, &vars, &data);
        assert!(report.has(K::BadKeyFormat));
        assert!(report.has(K::UnknownVariable));
    }

    #[test]
    fn test_unsupported_value() {
        let (groups, vars) = cpu_schema();
        let data = tree(json!({"cpuinfo": {"core0": {"mhz": null, "model_name": ["a"]}}}));
        let report = validate_data("cpuinfo", &groups, &vars, &data);
        assert_eq!(report.count(K::UnsupportedValue), 2);
    }

    #[test]
    fn test_group_reappearing_is_not_an_error() {
        let groups = groups_from([
            Node::group("net").with_parent(ROOT),
            Node::group("ipv4").with_parent("net"),
            Node::group("ipv6").with_parent("net"),
            Node::group("conf").with_parent("ipv4").with_parent("ipv6"),
        ]);
        let vars = vars_from([Node::variable("forwarding").with_parent("conf")]);
        let data = tree(json!({
            "net": {
                "ipv4": {"conf": {"forwarding": "0"}},
                "ipv6": {"conf": {"forwarding": "1"}}
            }
        }));
        let report = validate_data("net", &groups, &vars, &data);
        assert!(report.ok);
    }

    #[test]
    fn test_shape_disambiguates_shared_id() {
        let groups = groups_from([
            Node::group("top").with_parent(ROOT),
            Node::group("stat").with_parent("top"),
        ]);
        let vars = vars_from([Node::variable("stat").with_parent("top")]);
        let data = tree(json!({"top": {"stat": "1"}}));
        assert!(validate_data("top", &groups, &vars, &data).ok);
        let data = tree(json!({"top": {"stat": {}}}));
        assert!(validate_data("top", &groups, &vars, &data).ok);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::model::{Node, ROOT, groups_from, vars_from};
    use proptest::prelude::*;
    use serde_json::Map;

    /// `undeclared[i]` stray leaves under group `core{i}`, next to one declared var.
    fn cores_with_strays(undeclared: &[usize]) -> (Groups, Vars, DataTree) {
        let mut groups = vec![Node::group("cpuinfo").with_parent(ROOT)];
        let mut mhz = Node::variable("mhz");
        let mut cores = Map::new();

        for (i, strays) in undeclared.iter().enumerate() {
            let id = format!("core{i}");
            groups.push(Node::group(&id).with_parent("cpuinfo"));
            mhz.add_parent(&id);

            let mut core = Map::new();
            core.insert("mhz".into(), Value::String("2400.000".into()));
            for j in 0..*strays {
                core.insert(format!("stray{j}"), Value::String(j.to_string()));
            }
            cores.insert(id, Value::Object(core));
        }

        let mut data = Map::new();
        data.insert("cpuinfo".into(), Value::Object(cores));
        (groups_from(groups), vars_from([mhz]), data)
    }

    proptest! {
        #[test]
        fn test_one_diagnostic_per_undeclared_leaf(
            undeclared in prop::collection::vec(0usize..6, 1..5)
        ) {
            let (groups, vars, data) = cores_with_strays(&undeclared);
            let report = validate_data("cpuinfo", &groups, &vars, &data);
            let total: usize = undeclared.iter().sum();
            prop_assert_eq!(report.count(K::UnknownVariable), total);
            prop_assert_eq!(report.diagnostics.len(), total);
            prop_assert_eq!(report.ok, total == 0);
        }
    }
}
