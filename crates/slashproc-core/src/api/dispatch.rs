//! Method dispatch against a [`Registry`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::query::{PathSpec, QueryError, Request};
use crate::registry::Registry;

use super::types::{
    ErrorReply, Method, Params, QueryReply, Reply, SourceSummary, SourcesReply, ValidationReply,
};

/// Runs one method. Every outcome, including failures, is a [`Reply`].
///
/// Reads source data, so async callers should run it on a blocking thread.
pub fn dispatch(registry: &Registry, method: Method, params: &Params) -> Reply {
    debug!(%method, ?params, "dispatch");
    match method {
        Method::GetGroups => query(params, |req| registry.get_groups(req).map(QueryReply::from)),
        Method::GetVars => query(params, |req| registry.get_vars(req).map(QueryReply::from)),
        Method::GetData => query(params, |req| registry.get_data(req).map(QueryReply::from)),
        Method::GetSources => Reply::Sources(sources(registry)),
        Method::Validate => validate(registry, params),
    }
}

fn request(params: &Params) -> Option<Request> {
    Request::normalize(params.path.as_ref(), params.parser.as_ref(), params.get.as_ref())
}

fn query(params: &Params, lookup: impl FnOnce(&Request) -> Result<QueryReply, QueryError>) -> Reply {
    match request(params) {
        Some(req) => lookup(&req).map_or_else(Reply::from, Reply::Query),
        None => ErrorReply::not_found().into(),
    }
}

fn sources(registry: &Registry) -> SourcesReply {
    let sources = registry
        .snapshot()
        .values()
        .map(|reg| {
            let root = reg.root();
            let summary = SourceSummary {
                label: root.and_then(|g| g.label.clone()),
                desc: root.and_then(|g| g.description.clone()),
                groups: reg.schema.groups.len(),
                vars: reg.schema.vars.len(),
                registered_at: reg.registered_at.to_rfc3339(),
            };
            (reg.id.clone(), summary)
        })
        .collect();
    SourcesReply { sources }
}

/// Checks the named source, or every registered one when none is named.
fn validate(registry: &Registry, params: &Params) -> Reply {
    let ids = if params.is_empty() {
        registry.ids()
    } else {
        match request(params) {
            Some(req) if registry.get(&req.source).is_some() => vec![req.source],
            _ => return ErrorReply::not_found().into(),
        }
    };

    let mut reports = BTreeMap::new();
    let mut unreadable = BTreeMap::new();
    for id in ids {
        match registry.check(&id) {
            Ok(report) => {
                reports.insert(id, report);
            }
            Err(e @ QueryError::Read { .. }) => {
                unreadable.insert(id, e.message());
            }
            // Unregistered between listing and checking.
            Err(QueryError::SourceNotFound(_)) => {}
        }
    }

    Reply::Validation(ValidationReply {
        ok: unreadable.is_empty() && reports.values().all(|r| r.ok),
        reports,
        unreadable,
    })
}

/// Maps a REST path (`uptime/vars/total`) onto a method and its params.
///
/// A `groups` or `vars` segment right after the source selects that listing;
/// anything else is a data lookup.
pub fn route_path(path: &str) -> (Method, Params) {
    let mut segments = PathSpec::from(path).segments();
    if segments.first().is_some_and(|s| s == "proc") {
        segments.remove(0);
    }

    let method = match segments.get(1).map(String::as_str) {
        Some("groups") => Method::GetGroups,
        Some("vars") => Method::GetVars,
        _ => Method::GetData,
    };
    if method != Method::GetData {
        segments.remove(1);
    }

    let params = Params {
        path: Some(PathSpec::Segments(segments)),
        ..Params::default()
    };
    (method, params)
}
