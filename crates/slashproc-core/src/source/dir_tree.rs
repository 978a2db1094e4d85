//! Directory trees of one-value files, such as `/proc/sys/kernel`.

use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::debug;

use crate::canon::canonicalize;
use crate::collector::FileSystem;
use crate::model::{DataTree, Groups, Node, Schema, Vars, groups_from};

use super::{Source, SourceError, SourceInfo};

/// Deeper directories are ignored.
const MAX_DEPTH: usize = 16;

/// Sub-directories become groups, files become variables.
///
/// The same directory name under several parents (`ipv4/conf`, `ipv6/conf`)
/// is one group with several parents. Files that cannot be read, typically
/// root-only tunables, are still declared but carry no value.
pub struct DirTreeSource<F: FileSystem> {
    fs: F,
    path: PathBuf,
    info: SourceInfo,
}

struct Scan {
    groups: Groups,
    vars: Vars,
}

impl<F: FileSystem> DirTreeSource<F> {
    pub fn new(fs: F, path: impl Into<PathBuf>, info: SourceInfo) -> Self {
        Self {
            fs,
            path: path.into(),
            info,
        }
    }

    fn scan(&self) -> Result<(Schema, DataTree), SourceError> {
        let mut scan = Scan {
            groups: groups_from([self.info.root_group()]),
            vars: Vars::new(),
        };

        let entries = self.fs.read_dir(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let inner = self.walk(entries, &self.info.id, 1, &mut scan);

        Ok((Schema::new(scan.groups, scan.vars), self.info.wrap(inner)))
    }

    fn walk(&self, entries: Vec<PathBuf>, group_id: &str, depth: usize, scan: &mut Scan) -> DataTree {
        let mut node = Map::new();

        for entry in entries {
            let Some(name) = entry.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let key = canonicalize(&name);

            if self.fs.is_dir(&entry) {
                if depth >= MAX_DEPTH {
                    debug!(path = %entry.display(), "directory too deep, skipping");
                    continue;
                }
                let children = match self.fs.read_dir(&entry) {
                    Ok(children) => children,
                    Err(e) => {
                        debug!(path = %entry.display(), error = %e, "cannot list directory");
                        continue;
                    }
                };
                scan.groups
                    .entry(key.clone())
                    .or_insert_with(|| Node::group(&key).with_label(&name))
                    .add_parent(group_id);
                let child = self.walk(children, &key, depth + 1, scan);
                node.insert(key, Value::Object(child));
            } else {
                scan.vars
                    .entry(key.clone())
                    .or_insert_with(|| Node::variable(&key).with_label(&name).with_unit(""))
                    .add_parent(group_id);
                match self.fs.read_to_string(&entry) {
                    Ok(content) => {
                        node.insert(key, Value::String(flatten(&content)));
                    }
                    Err(e) => debug!(path = %entry.display(), error = %e, "cannot read file"),
                }
            }
        }

        node
    }
}

fn flatten(content: &str) -> String {
    content.trim_end().replace('\n', " ")
}

impl<F: FileSystem> Source for DirTreeSource<F> {
    fn groups(&self) -> Result<Groups, SourceError> {
        Ok(self.scan()?.0.groups)
    }

    fn vars(&self) -> Result<Vars, SourceError> {
        Ok(self.scan()?.0.vars)
    }

    fn data(&self) -> Result<DataTree, SourceError> {
        Ok(self.scan()?.1)
    }

    fn schema(&self) -> Result<Schema, SourceError> {
        Ok(self.scan()?.0)
    }
}
