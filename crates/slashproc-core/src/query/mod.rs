//! Path resolution and lookups against registered sources.
//!
//! [`Request::normalize`] turns a path or a `(source, selectors)` pair into a
//! request; [`Registry`](crate::registry::Registry) answers it with a
//! [`Selection`] or a [`QueryError`].

mod path;
mod select;

pub use path::{PathSpec, Request, SEPARATORS};
pub use select::{Selection, WILDCARDS, select_data, select_nodes};

use crate::source::SourceError;

/// Why a lookup produced no selection. Unmatched selectors are not errors.
#[derive(Debug)]
pub enum QueryError {
    /// No registered source under this id (or no source named at all).
    SourceNotFound(String),
    /// The source's live read failed.
    Read { source: String, error: SourceError },
}

impl QueryError {
    /// Stable numeric code sent to RPC callers.
    pub fn code(&self) -> u32 {
        match self {
            QueryError::SourceNotFound(_) => 1,
            QueryError::Read { .. } => 2,
        }
    }

    /// Message sent to RPC callers.
    pub fn message(&self) -> String {
        match self {
            QueryError::SourceNotFound(_) => "Parser not Found".to_string(),
            QueryError::Read { error, .. } => format!("Source read failed: {error}"),
        }
    }
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::SourceNotFound(id) => write!(f, "source '{}' not found", id),
            QueryError::Read { source, error } => {
                write!(f, "reading source '{}' failed: {}", source, error)
            }
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::SourceNotFound(_) => None,
            QueryError::Read { error, .. } => Some(error),
        }
    }
}
