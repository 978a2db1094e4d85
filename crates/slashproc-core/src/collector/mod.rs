//! Filesystem access for file-backed sources.
//!
//! ```text
//!   KeyValueSource  ColumnSource  BlockSource  DirTreeSource
//!          └──────────────┴────────────┴─────────────┘
//!                             │
//!                      ┌──────▼──────┐
//!                      │  FileSystem │ (trait)
//!                      └──────┬──────┘
//!                    ┌────────┴────────┐
//!              ┌─────▼─────┐     ┌─────▼─────┐
//!              │  RealFs   │     │  MockFs   │
//!              │  (Linux)  │     │ (testing) │
//!              └───────────┘     └───────────┘
//! ```
//!
//! # Testing with MockFs
//!
//! ```
//! use std::path::Path;
//! use slashproc_core::collector::{FileSystem, MockFs};
//!
//! let fs = MockFs::typical_system();
//! let uptime = fs.read_to_string(Path::new("/proc/uptime")).unwrap();
//! assert!(uptime.starts_with("12345.67"));
//! ```

pub mod mock;
pub mod traits;

pub use mock::MockFs;
pub use traits::{FileSystem, RealFs};
