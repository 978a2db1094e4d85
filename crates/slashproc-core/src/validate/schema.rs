//! Structural checks over a source's groups and variables.

use std::collections::{BTreeSet, HashMap};

use crate::canon::is_canonical;
use crate::model::{Groups, Node, ROOT, Vars};

use super::{Diagnostic, DiagnosticKind as K, Report};

/// Validates a group hierarchy and variable catalog for the source `source_id`.
///
/// Never fails: every finding lands in the returned report.
pub fn validate_schema(source_id: &str, groups: &Groups, vars: &Vars) -> Report {
    let mut out = Vec::new();

    check_groups(&mut out, groups);
    check_root(&mut out, source_id, groups);
    check_cycles(&mut out, groups);
    check_vars(&mut out, groups, vars);

    Report::from_diagnostics(out)
}

fn check_groups(out: &mut Vec<Diagnostic>, groups: &Groups) {
    for (id, group) in groups {
        if !is_canonical(id) {
            out.push(Diagnostic::new(
                K::NonCanonicalId,
                id,
                format!("group '{id}' is not a canonical key"),
            ));
        }
        if id == ROOT {
            out.push(Diagnostic::new(
                K::ReservedId,
                id,
                format!("'{ROOT}' is reserved for the forest sentinel"),
            ));
        }
        if group.label.is_none() {
            out.push(Diagnostic::new(
                K::MissingLabel,
                id,
                format!("recommend 'label' be defined for group '{id}'"),
            ));
        }
        if group.description.is_none() {
            out.push(Diagnostic::new(
                K::MissingDescription,
                id,
                format!("'desc' not defined for group '{id}'"),
            ));
        }
        if group.parents.is_empty() {
            out.push(Diagnostic::new(
                K::MissingParents,
                id,
                format!("'parents' not defined for group '{id}'"),
            ));
        }
        for parent in &group.parents {
            if parent != ROOT && !groups.contains_key(parent) {
                out.push(Diagnostic::new(
                    K::UnknownParent,
                    parent,
                    format!("parent '{parent}' of group '{id}' not in groups"),
                ));
            }
        }
    }
}

/// Roots are judged by their map key. `Node::id` is informational and may
/// not have been set by the source.
fn check_root(out: &mut Vec<Diagnostic>, source_id: &str, groups: &Groups) {
    let roots: Vec<(&String, &Node)> = groups
        .iter()
        .filter(|(_, g)| g.is_root_attached())
        .collect();

    match roots.as_slice() {
        [] => out.push(Diagnostic::new(
            K::NoRoot,
            source_id,
            format!("no group has parent '{ROOT}'"),
        )),
        [(id, root)] => {
            if root.parents.len() != 1 {
                out.push(Diagnostic::new(
                    K::RootNotSole,
                    id.as_str(),
                    format!("group '{id}' must have '{ROOT}' as its only parent"),
                ));
            }
            if id.as_str() != source_id {
                out.push(Diagnostic::new(
                    K::RootNameMismatch,
                    id.as_str(),
                    format!("root group '{id}' must be named after the source '{source_id}'"),
                ));
            }
        }
        many => {
            let ids: Vec<_> = many.iter().map(|(id, _)| id.as_str()).collect();
            out.push(Diagnostic::new(
                K::MultipleRoots,
                source_id,
                format!(
                    "one and only one group may have parent '{ROOT}', found: {}",
                    ids.join(", ")
                ),
            ));
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// DFS over parent edges. A parent seen while still on the stack closes a cycle.
fn check_cycles(out: &mut Vec<Diagnostic>, groups: &Groups) {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut reported: BTreeSet<Vec<&str>> = BTreeSet::new();

    for id in groups.keys() {
        visit(id, groups, &mut marks, &mut stack, &mut reported, out);
    }
}

fn visit<'a>(
    id: &'a str,
    groups: &'a Groups,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
    reported: &mut BTreeSet<Vec<&'a str>>,
    out: &mut Vec<Diagnostic>,
) {
    match marks.get(id) {
        Some(Mark::Done) => return,
        Some(Mark::OnStack) => {
            let start = stack.iter().position(|s| *s == id).unwrap_or(0);
            let cycle = &stack[start..];
            let mut members = cycle.to_vec();
            members.sort_unstable();
            if reported.insert(members) {
                let mut path: Vec<&str> = cycle.to_vec();
                path.push(id);
                out.push(Diagnostic::new(
                    K::CyclicGroups,
                    id,
                    format!("groups form a parent cycle: {}", path.join(" -> ")),
                ));
            }
            return;
        }
        None => {}
    }

    let Some(group) = groups.get(id) else {
        return;
    };

    marks.insert(id, Mark::OnStack);
    stack.push(id);
    for parent in &group.parents {
        if parent != ROOT && groups.contains_key(parent) {
            visit(parent, groups, marks, stack, reported, out);
        }
    }
    stack.pop();
    marks.insert(id, Mark::Done);
}

fn check_vars(out: &mut Vec<Diagnostic>, groups: &Groups, vars: &Vars) {
    for (id, var) in vars {
        if !is_canonical(id) {
            out.push(Diagnostic::new(
                K::NonCanonicalId,
                id,
                format!("var '{id}' is not a canonical key"),
            ));
        }
        if groups.contains_key(id) {
            out.push(Diagnostic::new(
                K::SharedId,
                id,
                format!("'{id}' is declared both as a group and as a var"),
            ));
        }
        if var.label.is_none() {
            out.push(Diagnostic::new(
                K::MissingLabel,
                id,
                format!("recommend 'label' be defined for var '{id}'"),
            ));
        }
        if var.unit.is_none() {
            out.push(Diagnostic::new(
                K::MissingUnit,
                id,
                format!("recommend 'unit' be defined for var '{id}'"),
            ));
        }
        if var.description.is_none() {
            out.push(Diagnostic::new(
                K::MissingDescription,
                id,
                format!("'desc' not defined for var '{id}'"),
            ));
        }
        if var.parents.is_empty() {
            out.push(Diagnostic::new(
                K::UnknownVariableParent,
                id,
                format!("var '{id}' has no parent group"),
            ));
        }
        for parent in &var.parents {
            if !groups.contains_key(parent) {
                out.push(Diagnostic::new(
                    K::UnknownVariableParent,
                    parent,
                    format!("parent '{parent}' of var '{id}' not in groups"),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{groups_from, vars_from};

    fn uptime_groups() -> Groups {
        groups_from([Node::group("uptime")
            .with_label("Uptime")
            .with_description("System uptime")
            .with_parent(ROOT)])
    }

    fn uptime_vars() -> Vars {
        vars_from([
            Node::variable("total")
                .with_label("Total Uptime")
                .with_unit("Seconds")
                .with_description("Seconds since boot")
                .with_parent("uptime"),
            Node::variable("idle")
                .with_label("Idle Uptime")
                .with_unit("Seconds")
                .with_description("Seconds spent idle")
                .with_parent("uptime"),
        ])
    }

    #[test]
    fn test_valid_schema_has_no_diagnostics() {
        let report = validate_schema("uptime", &uptime_groups(), &uptime_vars());
        assert!(report.ok);
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    }

    #[test]
    fn test_missing_metadata_only_warns() {
        let groups = groups_from([Node::group("uptime").with_parent(ROOT)]);
        let vars = vars_from([Node::variable("total").with_parent("uptime")]);
        let report = validate_schema("uptime", &groups, &vars);
        assert!(report.ok);
        assert_eq!(report.errors().count(), 0);
        assert!(report.has(K::MissingLabel));
        assert!(report.has(K::MissingUnit));
        assert_eq!(report.count(K::MissingDescription), 2);
    }

    #[test]
    fn test_multiple_roots() {
        let groups = groups_from([
            Node::group("a").with_parent(ROOT),
            Node::group("b").with_parent(ROOT),
        ]);
        let report = validate_schema("a", &groups, &Vars::new());
        assert!(!report.ok);
        assert_eq!(report.count(K::MultipleRoots), 1);
    }

    #[test]
    fn test_no_root() {
        let groups = groups_from([Node::group("a").with_parent("b"), Node::group("b").with_parent("a")]);
        let report = validate_schema("a", &groups, &Vars::new());
        assert!(report.has(K::NoRoot));
    }

    #[test]
    fn test_root_name_mismatch() {
        let groups = groups_from([Node::group("cpu").with_parent(ROOT)]);
        let report = validate_schema("cpuinfo", &groups, &Vars::new());
        assert!(!report.ok);
        assert!(report.has(K::RootNameMismatch));
    }

    #[test]
    fn test_root_name_comes_from_map_key() {
        // Deserialized maps leave Node::id empty.
        let groups: Groups = serde_json::from_value(serde_json::json!({
            "uptime": {"label": "Uptime", "desc": "d", "parents": ["root"]}
        }))
        .unwrap();
        let report = validate_schema("uptime", &groups, &Vars::new());
        assert!(report.ok, "{:?}", report.diagnostics);
        assert!(!report.has(K::RootNameMismatch));

        let mut groups = Groups::new();
        groups.insert("other".into(), Node::group("uptime").with_parent(ROOT));
        let report = validate_schema("uptime", &groups, &Vars::new());
        assert!(!report.ok);
        let d = report.diagnostics.iter().find(|d| d.kind == K::RootNameMismatch).unwrap();
        assert_eq!(d.subject, "other");
    }

    #[test]
    fn test_root_must_be_sole_parent() {
        let groups = groups_from([
            Node::group("a").with_parent(ROOT),
            Node::group("b").with_parent("a"),
            Node::group("c").with_parent(ROOT).with_parent("b"),
        ]);
        let report = validate_schema("a", &groups, &Vars::new());
        assert!(report.has(K::MultipleRoots));

        let groups = groups_from([Node::group("a").with_parent(ROOT).with_parent("a")]);
        let report = validate_schema("a", &groups, &Vars::new());
        assert!(report.has(K::RootNotSole));
    }

    #[test]
    fn test_cycle_detected_once() {
        let groups = groups_from([
            Node::group("top").with_parent(ROOT),
            Node::group("a").with_parent("b"),
            Node::group("b").with_parent("a"),
        ]);
        let report = validate_schema("top", &groups, &Vars::new());
        assert!(!report.ok);
        assert_eq!(report.count(K::CyclicGroups), 1);
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let groups = groups_from([
            Node::group("top").with_parent(ROOT),
            Node::group("loop").with_parent("top").with_parent("loop"),
        ]);
        let report = validate_schema("top", &groups, &Vars::new());
        assert_eq!(report.count(K::CyclicGroups), 1);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let groups = groups_from([
            Node::group("top").with_parent(ROOT),
            Node::group("left").with_parent("top"),
            Node::group("right").with_parent("top"),
            Node::group("bottom").with_parent("left").with_parent("right"),
        ]);
        let report = validate_schema("top", &groups, &Vars::new());
        assert!(!report.has(K::CyclicGroups));
        assert_eq!(report.errors().count(), 0);
    }

    #[test]
    fn test_unknown_parent_names_missing_group() {
        let groups = groups_from([
            Node::group("top").with_parent(ROOT),
            Node::group("sub1").with_parent("missing_group"),
        ]);
        let report = validate_schema("top", &groups, &Vars::new());
        assert!(!report.ok);
        let diag = report
            .diagnostics
            .iter()
            .find(|d| d.kind == K::UnknownParent)
            .unwrap();
        assert_eq!(diag.subject, "missing_group");
        assert!(diag.message.contains("missing_group"));
    }

    #[test]
    fn test_missing_parents() {
        let groups = groups_from([Node::group("top").with_parent(ROOT), Node::group("orphan")]);
        let vars = vars_from([Node::variable("v")]);
        let report = validate_schema("top", &groups, &vars);
        assert_eq!(report.count(K::MissingParents), 1);
        let d = report
            .diagnostics
            .iter()
            .find(|d| d.kind == K::UnknownVariableParent)
            .unwrap();
        assert_eq!(d.subject, "v");
    }

    #[test]
    fn test_non_canonical_ids() {
        let mut groups = uptime_groups();
        groups.insert("Bad Group".into(), Node::group("Bad Group").with_parent("uptime"));
        let mut vars = uptime_vars();
        vars.insert("Idle-Time".into(), Node::variable("Idle-Time").with_parent("uptime"));
        let report = validate_schema("uptime", &groups, &vars);
        assert_eq!(report.count(K::NonCanonicalId), 2);
    }

    #[test]
    fn test_reserved_root_id() {
        let groups = groups_from([Node::group("root").with_parent(ROOT)]);
        let report = validate_schema("root", &groups, &Vars::new());
        assert!(report.has(K::ReservedId));
    }

    #[test]
    fn test_unknown_variable_parent() {
        let vars = vars_from([Node::variable("total").with_parent("nowhere")]);
        let report = validate_schema("uptime", &uptime_groups(), &vars);
        assert!(!report.ok);
        assert_eq!(report.count(K::UnknownVariableParent), 1);
    }

    #[test]
    fn test_multi_parent_variable() {
        let groups = groups_from([
            Node::group("cpuinfo").with_parent(ROOT),
            Node::group("core0").with_parent("cpuinfo"),
            Node::group("core1").with_parent("cpuinfo"),
        ]);
        let vars = vars_from([Node::variable("mhz").with_parent("core0").with_parent("core1")]);
        let report = validate_schema("cpuinfo", &groups, &vars);
        assert_eq!(report.errors().count(), 0);
    }

    #[test]
    fn test_shared_id_warns() {
        let groups = groups_from([Node::group("top").with_parent(ROOT)]);
        let vars = vars_from([Node::variable("top").with_parent("top")]);
        let report = validate_schema("top", &groups, &vars);
        assert!(report.ok);
        assert!(report.has(K::SharedId));
    }
}
