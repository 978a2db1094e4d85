//! slashproc-core: registry, validation and lookups for `/proc`-style sources.
//!
//! Provides:
//! - `canon`: key normalization
//! - `model`: groups, variables and data trees
//! - `validate`: schema validation and data conformance checking
//! - `source`: the `Source` capability and generic file adapters
//! - `collector`: filesystem abstraction (real and mock)
//! - `catalog`: built-in sources for a Linux `/proc`
//! - `registry`: registered sources and the lookups against them
//! - `query`: path resolution and selector matching
//!
//! With `api` feature (default):
//! - `api`: RPC request/reply types (utoipa schemas) and dispatch

pub mod canon;
pub mod catalog;
pub mod collector;
pub mod model;
pub mod query;
pub mod registry;
pub mod source;
pub mod validate;

#[cfg(feature = "api")]
pub mod api;

/// Crate version, reported by both binaries.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
