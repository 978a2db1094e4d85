//! Request parameters and reply bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::model::Node;
use crate::query::{PathSpec, QueryError, Selection};
use crate::validate::Report;

/// RPC method names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    GetGroups,
    GetVars,
    GetData,
    GetSources,
    Validate,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::GetGroups,
        Method::GetVars,
        Method::GetData,
        Method::GetSources,
        Method::Validate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::GetGroups => "get_groups",
            Method::GetVars => "get_vars",
            Method::GetData => "get_data",
            Method::GetSources => "get_sources",
            Method::Validate => "validate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters shared by every method.
///
/// Either `path` (`"/proc/cpuinfo/model_name"`) or `parser` plus `get`.
/// Each accepts a delimited string or a list of segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Params {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathSpec>,
    /// Source id. `source` is accepted as well.
    #[serde(alias = "source", skip_serializing_if = "Option::is_none")]
    pub parser: Option<PathSpec>,
    /// Selectors. `selectors` is accepted as well.
    #[serde(alias = "selectors", skip_serializing_if = "Option::is_none")]
    pub get: Option<PathSpec>,
}

impl Params {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(PathSpec::Text(path.into())),
            ..Self::default()
        }
    }

    pub fn source(source: impl Into<String>, selectors: Vec<String>) -> Self {
        Self {
            path: None,
            parser: Some(PathSpec::Text(source.into())),
            get: (!selectors.is_empty()).then_some(PathSpec::Segments(selectors)),
        }
    }

    /// True when nothing identifies a source.
    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.parser.is_none() && self.get.is_none()
    }
}

/// `{found, notfound}` answer to a groups, vars or data lookup.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QueryReply {
    /// Matched entries. Absent when a filtered lookup matched nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub found: Option<BTreeMap<String, Value>>,
    /// Selectors that matched nothing.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notfound: Vec<String>,
}

impl From<Selection<Value>> for QueryReply {
    fn from(selection: Selection<Value>) -> Self {
        Self {
            found: selection.found,
            notfound: selection.notfound,
        }
    }
}

impl From<Selection<Node>> for QueryReply {
    fn from(selection: Selection<Node>) -> Self {
        let found = selection.found.map(|nodes| {
            nodes
                .into_iter()
                .map(|(id, node)| (id, serde_json::to_value(node).unwrap_or_default()))
                .collect()
        });
        Self {
            found,
            notfound: selection.notfound,
        }
    }
}

/// `{err, msg}` answer to a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ErrorReply {
    /// 1: source not found, 2: source read failed.
    pub err: u32,
    pub msg: String,
}

impl ErrorReply {
    /// The reply for a request naming no registered source.
    pub fn not_found() -> Self {
        QueryError::SourceNotFound(String::new()).into()
    }
}

impl From<QueryError> for ErrorReply {
    fn from(e: QueryError) -> Self {
        Self {
            err: e.code(),
            msg: e.message(),
        }
    }
}

/// One registered source as listed by `get_sources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SourceSummary {
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    pub groups: usize,
    pub vars: usize,
    /// RFC 3339 registration time.
    pub registered_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SourcesReply {
    pub sources: BTreeMap<String, SourceSummary>,
}

/// Answer to `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ValidationReply {
    /// No error-level diagnostic and no failed read.
    pub ok: bool,
    pub reports: BTreeMap<String, Report>,
    /// Sources whose data could not be read, with the reason.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub unreadable: BTreeMap<String, String>,
}

/// Any reply a method can produce.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Reply {
    Query(QueryReply),
    Sources(SourcesReply),
    Validation(ValidationReply),
    Error(ErrorReply),
}

impl Reply {
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl From<ErrorReply> for Reply {
    fn from(e: ErrorReply) -> Self {
        Reply::Error(e)
    }
}

impl From<QueryError> for Reply {
    fn from(e: QueryError) -> Self {
        Reply::Error(e.into())
    }
}
