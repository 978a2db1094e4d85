//! The set of registered sources and the lookups served against it.
//!
//! Registration computes and validates a source's schema once; the schema is
//! then immutable. Data is read live on every lookup.
//!
//! The registry is a copy-on-write snapshot behind an `RwLock`. A lookup
//! takes an `Arc` of the current snapshot and works on it without holding
//! the lock, so `register`/`unregister` never change a map under a reader.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::model::{DataTree, Node, NodeKind, Schema, adopt_keys};
use crate::query::{QueryError, Request, Selection, select_data, select_nodes};
use crate::source::{Source, SourceError};
use crate::validate::{Report, validate_data, validate_schema};

/// Error type for registration failures.
#[derive(Debug)]
pub enum RegisterError {
    /// The schema could not be computed.
    Source { id: String, error: SourceError },
    /// The schema has at least one error-level diagnostic.
    InvalidSchema { id: String, report: Report },
}

impl RegisterError {
    /// Id of the rejected source.
    pub fn id(&self) -> &str {
        match self {
            RegisterError::Source { id, .. } | RegisterError::InvalidSchema { id, .. } => id,
        }
    }
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::Source { id, error } => {
                write!(f, "source '{}' schema unavailable: {}", id, error)
            }
            RegisterError::InvalidSchema { id, report } => {
                write!(f, "source '{}' has an invalid schema: {}", id, report)
            }
        }
    }
}

impl std::error::Error for RegisterError {}

/// A certified source: its id, frozen schema and live fetch.
pub struct Registration {
    pub id: String,
    pub schema: Schema,
    /// Schema report from registration time. Holds warnings only.
    pub report: Report,
    pub registered_at: DateTime<Utc>,
    source: Arc<dyn Source>,
}

impl Registration {
    /// Reads the source's live data.
    pub fn fetch(&self) -> Result<DataTree, SourceError> {
        self.source.data()
    }

    /// The group attaching this source to the forest.
    pub fn root(&self) -> Option<&Node> {
        self.schema.groups.get(&self.id)
    }

    /// Re-runs schema validation and checks a fresh data sample.
    pub fn check(&self) -> Result<Report, SourceError> {
        let schema = validate_schema(&self.id, &self.schema.groups, &self.schema.vars);
        let data = self.fetch()?;
        let conformance = validate_data(&self.id, &self.schema.groups, &self.schema.vars, &data);
        Ok(schema.merge(conformance))
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("groups", &self.schema.groups.len())
            .field("vars", &self.schema.vars.len())
            .field("registered_at", &self.registered_at)
            .finish()
    }
}

/// An immutable view of the registry at one point in time.
pub type Snapshot = BTreeMap<String, Arc<Registration>>;

/// Sources by id.
#[derive(Default)]
pub struct Registry {
    current: RwLock<Arc<Snapshot>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers `source` under `id`, replacing any previous one.
    ///
    /// The source's root group must be named `id`. Schema errors reject the
    /// source; warnings and a non-conforming first data sample are logged.
    pub fn register<S: Source + 'static>(
        &self,
        id: impl Into<String>,
        source: S,
    ) -> Result<Arc<Registration>, RegisterError> {
        self.register_arc(id.into(), Arc::new(source))
    }

    pub fn register_arc(
        &self,
        id: String,
        source: Arc<dyn Source>,
    ) -> Result<Arc<Registration>, RegisterError> {
        let mut schema = source.schema().map_err(|error| RegisterError::Source {
            id: id.clone(),
            error,
        })?;
        adopt_keys(&mut schema.groups, NodeKind::Group);
        adopt_keys(&mut schema.vars, NodeKind::Variable);

        let report = validate_schema(&id, &schema.groups, &schema.vars);
        if !report.ok {
            for d in report.errors() {
                warn!(source = %id, "{}", d);
            }
            return Err(RegisterError::InvalidSchema { id, report });
        }
        for d in report.warnings() {
            debug!(source = %id, "{}", d);
        }

        match source.data() {
            Ok(sample) => {
                let conformance = validate_data(&id, &schema.groups, &schema.vars, &sample);
                for d in conformance.errors() {
                    warn!(source = %id, "sample does not conform: {}", d);
                }
            }
            Err(e) => warn!(source = %id, error = %e, "first data sample unavailable"),
        }

        let registration = Arc::new(Registration {
            id: id.clone(),
            schema,
            report,
            registered_at: Utc::now(),
            source,
        });

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Snapshot::clone(&current);
        if next.insert(id.clone(), registration.clone()).is_some() {
            info!(source = %id, "source replaced");
        } else {
            info!(
                source = %id,
                groups = registration.schema.groups.len(),
                vars = registration.schema.vars.len(),
                "source registered"
            );
        }
        *current = Arc::new(next);

        Ok(registration)
    }

    /// Removes a source. Lookups already holding a snapshot still see it.
    pub fn unregister(&self, id: &str) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if !current.contains_key(id) {
            return false;
        }
        let mut next = Snapshot::clone(&current);
        next.remove(id);
        *current = Arc::new(next);
        info!(source = id, "source unregistered");
        true
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Registration>> {
        self.snapshot().get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// The global forest: each source's root group, by source id.
    pub fn forest(&self) -> BTreeMap<String, Node> {
        self.snapshot()
            .values()
            .filter_map(|r| r.root().map(|root| (r.id.clone(), root.clone())))
            .collect()
    }

    /// On-demand validation of a registered source.
    pub fn check(&self, id: &str) -> Result<Report, QueryError> {
        let registration = self.lookup(id)?;
        registration.check().map_err(|error| QueryError::Read {
            source: id.to_string(),
            error,
        })
    }

    pub fn get_groups(&self, request: &Request) -> Result<Selection<Node>, QueryError> {
        let registration = self.lookup(&request.source)?;
        Ok(select_nodes(&registration.schema.groups, &request.selectors))
    }

    pub fn get_vars(&self, request: &Request) -> Result<Selection<Node>, QueryError> {
        let registration = self.lookup(&request.source)?;
        Ok(select_nodes(&registration.schema.vars, &request.selectors))
    }

    pub fn get_data(&self, request: &Request) -> Result<Selection<Value>, QueryError> {
        let registration = self.lookup(&request.source)?;
        let data = registration.fetch().map_err(|error| {
            warn!(source = %request.source, error = %error, "data read failed");
            QueryError::Read {
                source: request.source.clone(),
                error,
            }
        })?;
        debug!(source = %request.source, selectors = ?request.selectors, "resolving data");
        Ok(select_data(data, &registration.id, &request.selectors))
    }

    fn lookup(&self, id: &str) -> Result<Arc<Registration>, QueryError> {
        self.get(id)
            .ok_or_else(|| QueryError::SourceNotFound(id.to_string()))
    }
}
