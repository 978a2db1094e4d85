//! Shared application state and the global allocator.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::Arc;

use axum::extract::State;

use slashproc_core::registry::Registry;

/// Registered sources. Lookups clone a snapshot out of it and never hold a lock.
pub(crate) type SharedRegistry = Arc<Registry>;

pub(crate) type AppState = State<SharedRegistry>;
