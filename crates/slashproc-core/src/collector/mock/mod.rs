//! In-memory filesystem and ready-made `/proc` fixtures.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
