//! Files made of blank-line separated `key: value` blocks.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::canon::{canonicalize, label_format};
use crate::collector::FileSystem;
use crate::model::{DataTree, Groups, Node, Schema, Vars, groups_from};

use super::{Source, SourceError, SourceInfo, read_file};

/// Each block becomes a group `<prefix><n>` under the root group.
///
/// A key present in several blocks is one variable whose parents are all
/// the block groups carrying it.
pub struct BlockSource<F: FileSystem> {
    fs: F,
    path: PathBuf,
    info: SourceInfo,
    prefix: String,
}

/// `(raw_key, key, value)` triples of one block.
type Block<'a> = Vec<(&'a str, String, &'a str)>;

impl<F: FileSystem> BlockSource<F> {
    pub fn new(fs: F, path: impl Into<PathBuf>, info: SourceInfo, prefix: impl Into<String>) -> Self {
        Self {
            fs,
            path: path.into(),
            info,
            prefix: prefix.into(),
        }
    }

    fn group_id(&self, index: usize) -> String {
        format!("{}{}", self.prefix, index)
    }

    fn parse<'a>(content: &'a str) -> Vec<Block<'a>> {
        let mut blocks = Vec::new();
        let mut current: Block<'a> = Vec::new();

        for line in content.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
                continue;
            }
            if let Some((raw_key, value)) = line.split_once(':') {
                let raw_key = raw_key.trim();
                current.push((raw_key, canonicalize(raw_key), value.trim()));
            }
        }
        if !current.is_empty() {
            blocks.push(current);
        }
        blocks
    }

    fn schema_from(&self, content: &str) -> Schema {
        let mut groups = vec![self.info.root_group()];
        let mut vars: Vars = BTreeMap::new();

        for (index, block) in Self::parse(content).iter().enumerate() {
            let group_id = self.group_id(index);
            groups.push(
                Node::group(&group_id)
                    .with_label(format!("{} {}", label_format(&self.prefix), index))
                    .with_parent(&self.info.id),
            );
            for (raw_key, key, _) in block {
                vars.entry(key.clone())
                    .or_insert_with(|| Node::variable(key).with_label(*raw_key).with_unit(""))
                    .add_parent(&group_id);
            }
        }

        Schema::new(groups_from(groups), vars)
    }
}

impl<F: FileSystem> Source for BlockSource<F> {
    fn groups(&self) -> Result<Groups, SourceError> {
        Ok(self.schema()?.groups)
    }

    fn vars(&self) -> Result<Vars, SourceError> {
        Ok(self.schema()?.vars)
    }

    fn data(&self) -> Result<DataTree, SourceError> {
        let content = read_file(&self.fs, &self.path)?;
        let mut inner = Map::new();
        for (index, block) in Self::parse(&content).into_iter().enumerate() {
            let values: Map<String, Value> = block
                .into_iter()
                .map(|(_, key, value)| (key, Value::String(value.to_string())))
                .collect();
            inner.insert(self.group_id(index), Value::Object(values));
        }
        Ok(self.info.wrap(inner))
    }

    fn schema(&self) -> Result<Schema, SourceError> {
        Ok(self.schema_from(&read_file(&self.fs, &self.path)?))
    }
}
