//! The capability every collector exposes, and generic adapters implementing it.
//!
//! A [`Source`] publishes a schema (groups and variables) and a live data
//! tree. The adapters here cover the shapes `/proc` text comes in without
//! knowing anything about a particular file:
//!
//! - [`KeyValueSource`]: one `key: value [unit]` per line
//! - [`ColumnSource`]: whitespace-separated fields on one line
//! - [`BlockSource`]: blank-line separated blocks of `key: value` lines
//! - [`DirTreeSource`]: a directory of one-value files
//! - [`ArgsSource`]: one line of `key=value` arguments and flags
//! - [`ProcessTreeSource`]: `/proc/<pid>/status` nested by parent pid
//! - [`StaticSource`]: fixed schema and data

mod args;
mod blocks;
mod columns;
mod dir_tree;
mod key_value;
mod process_tree;
mod static_source;

pub use args::ArgsSource;
pub use blocks::BlockSource;
pub use columns::ColumnSource;
pub use dir_tree::DirTreeSource;
pub use key_value::{KeyValueSource, Separator};
pub use process_tree::ProcessTreeSource;
pub use static_source::StaticSource;

use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::canon::label_format;
use crate::collector::FileSystem;
use crate::model::{DataTree, Groups, Node, ROOT, Schema, Vars};

/// Error type for source read failures.
#[derive(Debug)]
pub enum SourceError {
    /// The underlying file or directory could not be read.
    Io { path: PathBuf, source: io::Error },
    /// The content did not have the expected shape.
    Parse { path: PathBuf, message: String },
}

impl SourceError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SourceError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io { path, source } => {
                write!(f, "I/O error reading {}: {}", path.display(), source)
            }
            SourceError::Parse { path, message } => {
                write!(f, "parse error in {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io { source, .. } => Some(source),
            SourceError::Parse { .. } => None,
        }
    }
}

/// A registered collector: a schema plus a live data read.
///
/// `data` reads live state and must be safe to call repeatedly and from
/// several threads at once.
pub trait Source: Send + Sync {
    fn groups(&self) -> Result<Groups, SourceError>;

    fn vars(&self) -> Result<Vars, SourceError>;

    fn data(&self) -> Result<DataTree, SourceError>;

    /// Computes groups and vars together. Sample-derived sources override
    /// this to read their sample once.
    fn schema(&self) -> Result<Schema, SourceError> {
        Ok(Schema::new(self.groups()?, self.vars()?))
    }
}

/// Identity of a source's root group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
}

impl SourceInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            description: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The group attaching this source to the forest.
    pub fn root_group(&self) -> Node {
        let mut group = Node::group(&self.id)
            .with_label(self.label.clone().unwrap_or_else(|| label_format(&self.id)))
            .with_parent(ROOT);
        group.description = self.description.clone();
        group
    }

    /// Wraps the source's top-level values under its root key.
    pub fn wrap(&self, inner: DataTree) -> DataTree {
        let mut tree = Map::new();
        tree.insert(self.id.clone(), Value::Object(inner));
        tree
    }
}

pub(crate) fn read_file<F: FileSystem>(fs: &F, path: &Path) -> Result<String, SourceError> {
    fs.read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}
