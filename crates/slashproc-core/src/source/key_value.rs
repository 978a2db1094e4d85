//! Flat `key: value [unit]` files.

use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::debug;

use crate::canon::canonicalize;
use crate::collector::FileSystem;
use crate::model::{DataTree, Groups, Node, Schema, Vars, groups_from, vars_from};

use super::{Source, SourceError, SourceInfo, read_file};

/// How a line separates its key from its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// `MemTotal:       16384000 kB`
    Colon,
    /// `nr_free_pages 2048000`
    Whitespace,
}

/// One variable per line, all under the root group.
///
/// The variable catalog is derived from the content of the file, so a key
/// that shows up after registration fails conformance instead of being
/// silently published.
pub struct KeyValueSource<F: FileSystem> {
    fs: F,
    path: PathBuf,
    info: SourceInfo,
    separator: Separator,
    split_units: bool,
}

#[derive(Debug, PartialEq)]
struct Entry<'a> {
    raw_key: &'a str,
    key: String,
    value: &'a str,
    unit: Option<&'a str>,
}

impl<F: FileSystem> KeyValueSource<F> {
    pub fn new(fs: F, path: impl Into<PathBuf>, info: SourceInfo, separator: Separator) -> Self {
        Self {
            fs,
            path: path.into(),
            info,
            separator,
            split_units: false,
        }
    }

    /// Splits a trailing alphabetic token (`kB`) off each value and publishes it as the unit.
    pub fn with_units(mut self) -> Self {
        self.split_units = true;
        self
    }

    fn parse<'a>(&self, content: &'a str) -> Vec<Entry<'a>> {
        let mut entries = Vec::new();
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let split = match self.separator {
                Separator::Colon => line.split_once(':'),
                Separator::Whitespace => line.split_once(char::is_whitespace),
            };
            let Some((raw_key, value)) = split else {
                debug!(path = %self.path.display(), line, "skipping line without separator");
                continue;
            };
            let raw_key = raw_key.trim();
            let (value, unit) = self.split_unit(value.trim());
            entries.push(Entry {
                raw_key,
                key: canonicalize(raw_key),
                value,
                unit,
            });
        }
        entries
    }

    fn split_unit<'a>(&self, value: &'a str) -> (&'a str, Option<&'a str>) {
        if !self.split_units {
            return (value, None);
        }
        match value.rsplit_once(char::is_whitespace) {
            Some((number, unit)) if unit.chars().all(char::is_alphabetic) => {
                (number.trim_end(), Some(unit))
            }
            _ => (value, None),
        }
    }

    fn sample(&self) -> Result<String, SourceError> {
        read_file(&self.fs, &self.path)
    }

    fn schema_from(&self, content: &str) -> Schema {
        let groups = groups_from([self.info.root_group()]);
        let vars = vars_from(self.parse(content).into_iter().map(|e| {
            Node::variable(e.key)
                .with_label(e.raw_key)
                .with_unit(e.unit.unwrap_or_default())
                .with_parent(&self.info.id)
        }));
        Schema::new(groups, vars)
    }
}

impl<F: FileSystem> Source for KeyValueSource<F> {
    fn groups(&self) -> Result<Groups, SourceError> {
        Ok(groups_from([self.info.root_group()]))
    }

    fn vars(&self) -> Result<Vars, SourceError> {
        Ok(self.schema_from(&self.sample()?).vars)
    }

    fn data(&self) -> Result<DataTree, SourceError> {
        let content = self.sample()?;
        let values: Map<String, Value> = self
            .parse(&content)
            .into_iter()
            .map(|e| (e.key, Value::String(e.value.to_string())))
            .collect();
        Ok(self.info.wrap(values))
    }

    fn schema(&self) -> Result<Schema, SourceError> {
        Ok(self.schema_from(&self.sample()?))
    }
}
