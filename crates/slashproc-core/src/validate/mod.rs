//! Schema validation and data conformance checking.
//!
//! Both passes are pure and never fail. They return a [`Report`] holding
//! every finding so a source author sees all problems in one go.

mod data;
mod diagnostic;
mod schema;

pub use data::validate_data;
pub use diagnostic::{Diagnostic, DiagnosticKind, Report, Severity};
pub use schema::validate_schema;
