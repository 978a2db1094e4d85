//! Per-process `/proc/<pid>/status` files, arranged as a process tree.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::canon::canonicalize;
use crate::collector::FileSystem;
use crate::model::{DataTree, Groups, Node, Schema, Vars, groups_from};

use super::{Source, SourceError, SourceInfo};

/// One parsed status file.
#[derive(Debug)]
struct Process {
    pid: u32,
    ppid: u32,
    name: String,
    /// `(raw_key, key, value, unit)` in file order.
    fields: Vec<(String, String, String, Option<String>)>,
}

/// Every process is a group named after its pid. A process whose parent
/// was also sampled nests under the parent's group, the rest (pid 1,
/// kernel threads, orphans of a racing read) hang off the root group.
///
/// A status key is one variable whose parents are all the processes
/// reporting it. Processes that exit while being read are skipped.
pub struct ProcessTreeSource<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    info: SourceInfo,
    known: BTreeMap<String, Node>,
}

impl<F: FileSystem> ProcessTreeSource<F> {
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, info: SourceInfo) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            info,
            known: BTreeMap::new(),
        }
    }

    /// Label, unit and description used for a status key, by canonical id.
    pub fn describe(mut self, var: Node) -> Self {
        self.known.insert(var.id.clone(), var);
        self
    }

    fn collect(&self) -> Result<BTreeMap<u32, Process>, SourceError> {
        let entries = self.fs.read_dir(&self.proc_path).map_err(|source| SourceError::Io {
            path: self.proc_path.clone(),
            source,
        })?;

        let mut processes = BTreeMap::new();
        for entry in entries {
            if let Some(name) = entry.file_name().and_then(|n| n.to_str())
                && let Ok(pid) = name.parse::<u32>()
            {
                let path = entry.join("status");
                match self.fs.read_to_string(&path) {
                    Ok(content) => {
                        processes.insert(pid, parse_status(pid, &content));
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        debug!(pid, "process gone");
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to read process status"),
                }
            }
        }
        Ok(processes)
    }

    /// The group a process attaches to: its parent's pid if sampled, else the root.
    fn parent_of(&self, process: &Process, processes: &BTreeMap<u32, Process>) -> String {
        if process.ppid != process.pid && processes.contains_key(&process.ppid) {
            process.ppid.to_string()
        } else {
            self.info.id.clone()
        }
    }

    fn schema_from(&self, processes: &BTreeMap<u32, Process>) -> Schema {
        let mut groups = vec![self.info.root_group()];
        let mut vars = Vars::new();

        for process in processes.values() {
            let group_id = process.pid.to_string();
            groups.push(
                Node::group(&group_id)
                    .with_label(format!("{} ({})", process.name, process.pid))
                    .with_parent(self.parent_of(process, processes)),
            );
            for (raw_key, key, _, unit) in &process.fields {
                vars.entry(key.clone())
                    .or_insert_with(|| {
                        self.known.get(key).cloned().unwrap_or_else(|| {
                            Node::variable(key)
                                .with_label(raw_key)
                                .with_unit(unit.clone().unwrap_or_default())
                        })
                    })
                    .add_parent(&group_id);
            }
        }

        Schema::new(groups_from(groups), vars)
    }

    fn tree_from(&self, processes: &BTreeMap<u32, Process>) -> DataTree {
        let mut children: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        for process in processes.values() {
            children
                .entry(self.parent_of(process, processes))
                .or_default()
                .push(process.pid);
        }

        let mut visited = BTreeSet::new();
        let inner = self.subtree(&self.info.id, processes, &children, &mut visited);
        self.info.wrap(inner)
    }

    fn subtree(
        &self,
        group_id: &str,
        processes: &BTreeMap<u32, Process>,
        children: &BTreeMap<String, Vec<u32>>,
        visited: &mut BTreeSet<u32>,
    ) -> Map<String, Value> {
        let mut node = Map::new();
        for pid in children.get(group_id).into_iter().flatten() {
            let Some(process) = processes.get(pid) else {
                continue;
            };
            if !visited.insert(*pid) {
                continue;
            }
            let id = pid.to_string();
            let mut child = self.subtree(&id, processes, children, visited);
            for (_, key, value, _) in &process.fields {
                child.insert(key.clone(), Value::String(value.clone()));
            }
            node.insert(id, Value::Object(child));
        }
        node
    }
}

/// Parses `Key:\tvalue [kB]` lines. The pid comes from the directory name;
/// a missing `PPid` reads as 0.
fn parse_status(pid: u32, content: &str) -> Process {
    let mut process = Process {
        pid,
        ppid: 0,
        name: String::new(),
        fields: Vec::new(),
    };

    for line in content.lines() {
        let Some((raw_key, value)) = line.split_once(':') else {
            continue;
        };
        let raw_key = raw_key.trim();
        let key = canonicalize(raw_key);
        if key.is_empty() {
            continue;
        }

        let mut words: Vec<&str> = value.split_whitespace().collect();
        let unit = match words.last() {
            Some(&"kB") if words.len() > 1 => {
                words.pop();
                Some("kB".to_string())
            }
            _ => None,
        };
        let value = words.join(" ");

        match raw_key {
            "Name" => process.name = value.clone(),
            "PPid" => process.ppid = value.parse().unwrap_or(0),
            _ => {}
        }
        process.fields.push((raw_key.to_string(), key, value, unit));
    }

    process
}

impl<F: FileSystem> Source for ProcessTreeSource<F> {
    fn groups(&self) -> Result<Groups, SourceError> {
        Ok(self.schema()?.groups)
    }

    fn vars(&self) -> Result<Vars, SourceError> {
        Ok(self.schema()?.vars)
    }

    fn data(&self) -> Result<DataTree, SourceError> {
        Ok(self.tree_from(&self.collect()?))
    }

    fn schema(&self) -> Result<Schema, SourceError> {
        Ok(self.schema_from(&self.collect()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;
    use crate::model::ROOT;
    use crate::validate::{validate_data, validate_schema};
    use serde_json::json;

    fn pidstatus(fs: MockFs) -> ProcessTreeSource<MockFs> {
        ProcessTreeSource::new(fs, "/proc", SourceInfo::new("pidstatus"))
    }

    fn status(name: &str, pid: u32, ppid: u32, rss: Option<u64>) -> String {
        let mut s = format!("Name:\t{name}\nState:\tS (sleeping)\nPid:\t{pid}\nPPid:\t{ppid}\n");
        if let Some(rss) = rss {
            s.push_str(&format!("VmRSS:\t    {rss} kB\n"));
        }
        s
    }

    fn small_tree() -> MockFs {
        let mut fs = MockFs::new();
        fs.add_file("/proc/uptime", "1.0 1.0\n");
        fs.add_file("/proc/1/status", status("init", 1, 0, Some(9000)));
        fs.add_file("/proc/2/status", status("kthreadd", 2, 0, None));
        fs.add_file("/proc/40/status", status("sshd", 40, 1, Some(7000)));
        fs.add_file("/proc/41/status", status("bash", 41, 40, Some(5000)));
        fs.add_dir("/proc/self");
        fs
    }

    #[test]
    fn test_children_nest_under_parent() {
        let data = pidstatus(small_tree()).data().unwrap();
        let root = &data["pidstatus"];
        assert_eq!(root.as_object().unwrap().keys().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(root["1"]["40"]["41"]["name"], json!("bash"));
        assert_eq!(root["1"]["vmrss"], json!("9000"));
        assert_eq!(root["1"]["state"], json!("S (sleeping)"));
        assert!(root["2"].get("vmrss").is_none());
    }

    #[test]
    fn test_groups_follow_ppid() {
        let schema = pidstatus(small_tree()).schema().unwrap();
        assert_eq!(schema.groups["pidstatus"].parents, vec![ROOT]);
        assert_eq!(schema.groups["1"].parents, vec!["pidstatus"]);
        assert_eq!(schema.groups["2"].parents, vec!["pidstatus"]);
        assert_eq!(schema.groups["41"].parents, vec!["40"]);
        assert_eq!(schema.groups["40"].label.as_deref(), Some("sshd (40)"));
    }

    #[test]
    fn test_vars_have_every_reporting_process_as_parent() {
        let schema = pidstatus(small_tree()).schema().unwrap();
        let rss = &schema.vars["vmrss"];
        assert_eq!(rss.unit.as_deref(), Some("kB"));
        assert_eq!(rss.label.as_deref(), Some("VmRSS"));
        assert_eq!(rss.parents, vec!["1", "40", "41"]);
        assert_eq!(schema.vars["name"].parents.len(), 4);
    }

    #[test]
    fn test_orphan_attaches_to_root() {
        let mut fs = small_tree();
        fs.add_file("/proc/77/status", status("worker", 77, 999, None));
        let schema = pidstatus(fs).schema().unwrap();
        assert_eq!(schema.groups["77"].parents, vec!["pidstatus"]);
    }

    #[test]
    fn test_known_var_description() {
        let source = pidstatus(small_tree()).describe(
            Node::variable("vmrss")
                .with_label("Virtual Memory Resident Size")
                .with_unit("kB")
                .with_description("Resident set size of the virtual memory"),
        );
        let vars = source.vars().unwrap();
        assert_eq!(vars["vmrss"].label.as_deref(), Some("Virtual Memory Resident Size"));
        assert_eq!(vars["vmrss"].parents, vec!["1", "40", "41"]);
    }

    #[test]
    fn test_tree_validates() {
        let source = pidstatus(MockFs::typical_system());
        let schema = source.schema().unwrap();
        let report = validate_schema("pidstatus", &schema.groups, &schema.vars);
        assert_eq!(report.errors().count(), 0, "{:?}", report.diagnostics);
        let data = source.data().unwrap();
        let report = validate_data("pidstatus", &schema.groups, &schema.vars, &data);
        assert!(report.ok, "{:?}", report.diagnostics);
    }

    #[test]
    fn test_no_processes() {
        let source = pidstatus(MockFs::empty_proc());
        assert_eq!(source.schema().unwrap().groups.len(), 1);
        assert_eq!(Value::Object(source.data().unwrap()), json!({"pidstatus": {}}));
    }

    #[test]
    fn test_missing_proc_is_io_error() {
        let err = pidstatus(MockFs::new()).data().unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn test_parse_status_units_and_whitespace() {
        let p = parse_status(7, "Name:\tcat\nPPid:\t3\nUid:\t1000\t1000\t1000\t1000\nVmPeak:\t  2048 kB\n");
        assert_eq!(p.ppid, 3);
        assert_eq!(p.name, "cat");
        let uid = p.fields.iter().find(|f| f.1 == "uid").unwrap();
        assert_eq!(uid.2, "1000 1000 1000 1000");
        let peak = p.fields.iter().find(|f| f.1 == "vmpeak").unwrap();
        assert_eq!((peak.2.as_str(), peak.3.as_deref()), ("2048", Some("kB")));
    }
}
