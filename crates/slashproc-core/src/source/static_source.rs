//! A source with fixed schema and data.

use std::path::PathBuf;

use serde_json::Value;

use crate::model::{DataTree, Groups, NodeKind, Vars, adopt_keys};

use super::{Source, SourceError};

/// Serves the same groups, vars and data on every call.
///
/// Handy for fixtures and for embedding values computed elsewhere.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    groups: Groups,
    vars: Vars,
    data: DataTree,
}

impl StaticSource {
    pub fn new(groups: Groups, vars: Vars, data: DataTree) -> Self {
        Self { groups, vars, data }
    }

    /// Builds a source from the JSON shapes used on the wire.
    ///
    /// ```
    /// use serde_json::json;
    /// use slashproc_core::source::{Source, StaticSource};
    ///
    /// let source = StaticSource::from_json(
    ///     json!({"uptime": {"parents": ["root"]}}),
    ///     json!({"total": {"parents": ["uptime"]}}),
    ///     json!({"uptime": {"total": "12345.6"}}),
    /// )
    /// .unwrap();
    /// assert_eq!(source.vars().unwrap()["total"].id, "total");
    /// ```
    pub fn from_json(groups: Value, vars: Value, data: Value) -> Result<Self, SourceError> {
        let mut groups: Groups = serde_json::from_value(groups).map_err(invalid)?;
        let mut vars: Vars = serde_json::from_value(vars).map_err(invalid)?;
        adopt_keys(&mut groups, NodeKind::Group);
        adopt_keys(&mut vars, NodeKind::Variable);

        let Value::Object(data) = data else {
            return Err(SourceError::parse(
                PathBuf::new(),
                "data must be a JSON object",
            ));
        };
        Ok(Self::new(groups, vars, data))
    }
}

fn invalid(e: serde_json::Error) -> SourceError {
    SourceError::parse(PathBuf::new(), e.to_string())
}

impl Source for StaticSource {
    fn groups(&self) -> Result<Groups, SourceError> {
        Ok(self.groups.clone())
    }

    fn vars(&self) -> Result<Vars, SourceError> {
        Ok(self.vars.clone())
    }

    fn data(&self) -> Result<DataTree, SourceError> {
        Ok(self.data.clone())
    }
}
