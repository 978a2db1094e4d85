//! Single-line argument lists such as `/proc/cmdline`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::canon::canonicalize;
use crate::collector::FileSystem;
use crate::model::{DataTree, Groups, Node, Schema, Vars, groups_from, vars_from};

use super::{Source, SourceError, SourceInfo, read_file};

/// Variable holding the whole line, verbatim.
pub const RAW: &str = "raw";

/// Whitespace-separated `key=value` arguments and bare flags, all under the
/// root group.
///
/// `key=value` publishes `value` under `key`; a bare flag publishes itself.
/// A repeated key keeps its last value, as the kernel does. The full line is
/// always published as [`RAW`].
pub struct ArgsSource<F: FileSystem> {
    fs: F,
    path: PathBuf,
    info: SourceInfo,
    known: BTreeMap<String, Node>,
}

impl<F: FileSystem> ArgsSource<F> {
    pub fn new(fs: F, path: impl Into<PathBuf>, info: SourceInfo) -> Self {
        Self {
            fs,
            path: path.into(),
            info,
            known: BTreeMap::new(),
        }
    }

    /// Label, unit and description used when `var` shows up in the sample.
    pub fn describe(mut self, var: Node) -> Self {
        self.known.insert(var.id.clone(), var);
        self
    }

    fn parse(line: &str) -> Vec<(String, &str, &str)> {
        line.split_whitespace()
            .filter_map(|arg| {
                let (raw_key, value) = match arg.split_once('=') {
                    Some((key, value)) if !key.is_empty() => (key, value),
                    _ => (arg, arg),
                };
                // Dots separate path segments in queries.
                let key = canonicalize(&raw_key.replace('.', "_"));
                (!key.is_empty() && key != RAW).then_some((key, raw_key, value))
            })
            .collect()
    }

    fn first_line(content: &str) -> &str {
        content.lines().next().unwrap_or_default().trim()
    }

    fn declare(&self, key: &str, raw_key: &str) -> Node {
        let node = self
            .known
            .get(key)
            .cloned()
            .unwrap_or_else(|| Node::variable(key).with_label(raw_key).with_unit(""));
        node.with_parent(&self.info.id)
    }

    fn schema_from(&self, content: &str) -> Schema {
        let line = Self::first_line(content);
        let mut vars = vec![self.declare(RAW, "Kernel Command Line")];
        vars.extend(
            Self::parse(line)
                .into_iter()
                .map(|(key, raw_key, _)| self.declare(&key, raw_key)),
        );
        Schema::new(groups_from([self.info.root_group()]), vars_from(vars))
    }
}

impl<F: FileSystem> Source for ArgsSource<F> {
    fn groups(&self) -> Result<Groups, SourceError> {
        Ok(groups_from([self.info.root_group()]))
    }

    fn vars(&self) -> Result<Vars, SourceError> {
        Ok(self.schema()?.vars)
    }

    fn data(&self) -> Result<DataTree, SourceError> {
        let content = read_file(&self.fs, &self.path)?;
        let line = Self::first_line(&content);
        let mut values: Map<String, Value> = Self::parse(line)
            .into_iter()
            .map(|(key, _, value)| (key, Value::String(value.to_string())))
            .collect();
        values.insert(RAW.to_string(), Value::String(line.to_string()));
        Ok(self.info.wrap(values))
    }

    fn schema(&self) -> Result<Schema, SourceError> {
        Ok(self.schema_from(&read_file(&self.fs, &self.path)?))
    }
}
