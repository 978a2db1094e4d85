//! Single-line files of whitespace-separated fields.

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::collector::FileSystem;
use crate::model::{DataTree, Groups, Node, Vars, groups_from, vars_from};

use super::{Source, SourceError, SourceInfo, read_file};

/// Maps the fields of the first non-empty line onto declared variables, in order.
///
/// Extra fields are ignored. With [`with_remainder`](Self::with_remainder)
/// the last variable takes the rest of the line, spaces included.
pub struct ColumnSource<F: FileSystem> {
    fs: F,
    path: PathBuf,
    info: SourceInfo,
    columns: Vec<Node>,
    remainder: bool,
}

impl<F: FileSystem> ColumnSource<F> {
    pub fn new(fs: F, path: impl Into<PathBuf>, info: SourceInfo) -> Self {
        Self {
            fs,
            path: path.into(),
            info,
            columns: Vec::new(),
            remainder: false,
        }
    }

    /// Declares the next column. Its parent is set to the root group.
    pub fn column(mut self, var: Node) -> Self {
        self.columns.push(var.with_parent(&self.info.id));
        self
    }

    pub fn with_remainder(mut self) -> Self {
        self.remainder = true;
        self
    }

    fn split<'a>(&self, content: &'a str) -> Result<Vec<&'a str>, SourceError> {
        let line = content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default();

        let mut fields = Vec::with_capacity(self.columns.len());
        let mut rest = line;
        for i in 0..self.columns.len() {
            let last = i + 1 == self.columns.len();
            let field = if last && self.remainder {
                std::mem::take(&mut rest)
            } else {
                let (field, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                rest = tail.trim_start();
                field
            };
            if field.is_empty() {
                return Err(SourceError::parse(
                    &self.path,
                    format!("expected {} fields, got {}", self.columns.len(), i),
                ));
            }
            fields.push(field);
        }
        Ok(fields)
    }
}

impl<F: FileSystem> Source for ColumnSource<F> {
    fn groups(&self) -> Result<Groups, SourceError> {
        Ok(groups_from([self.info.root_group()]))
    }

    fn vars(&self) -> Result<Vars, SourceError> {
        Ok(vars_from(self.columns.iter().cloned()))
    }

    fn data(&self) -> Result<DataTree, SourceError> {
        let content = read_file(&self.fs, &self.path)?;
        let values: Map<String, Value> = self
            .columns
            .iter()
            .zip(self.split(&content)?)
            .map(|(col, field)| (col.id.clone(), Value::String(field.to_string())))
            .collect();
        Ok(self.info.wrap(values))
    }
}
