//! Transport-agnostic RPC surface.
//!
//! Both binaries go through [`dispatch`]: the web server after decoding a
//! JSON-RPC envelope or a REST path, the CLI straight from its arguments.
//! Failures are replies (`{err, msg}`), never transport errors.

pub mod dispatch;
pub mod types;

pub use dispatch::{dispatch, route_path};
pub use types::{
    ErrorReply, Method, Params, QueryReply, Reply, SourceSummary, SourcesReply, ValidationReply,
};
