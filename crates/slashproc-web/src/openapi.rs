//! OpenAPI documentation definition.

use slashproc_core::api::{
    ErrorReply, Method, Params, QueryReply, Reply, SourceSummary, SourcesReply, ValidationReply,
};
use slashproc_core::model::Node;
use slashproc_core::query::PathSpec;
use slashproc_core::validate::{Diagnostic, DiagnosticKind, Report, Severity};
use utoipa::OpenApi;

use crate::rpc::{RpcCall, RpcError, RpcResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::handle_health,
        crate::handlers::handle_rpc,
        crate::handlers::handle_sources,
        crate::handlers::handle_path,
    ),
    components(schemas(
        Reply,
        QueryReply,
        ErrorReply,
        SourcesReply,
        SourceSummary,
        ValidationReply,
        Params,
        Method,
        PathSpec,
        Node,
        Report,
        Diagnostic,
        DiagnosticKind,
        Severity,
        RpcCall,
        RpcResponse,
        RpcError,
    )),
    info(
        title = "slashproc API",
        version = "1.0",
        description = "Self-describing access to /proc: source schemas, validation and live values"
    )
)]
pub(crate) struct ApiDoc;
