mod access_log;
mod handlers;
mod openapi;
mod rpc;
mod state;

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use clap::Parser;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use slashproc_core::catalog;
#[cfg(target_os = "linux")]
use slashproc_core::collector::RealFs;
#[cfg(not(target_os = "linux"))]
use slashproc_core::collector::mock::MockFs;
use slashproc_core::registry::{RegisterError, Registry};

use access_log::AccessLogLayer;
use state::SharedRegistry;

// ============================================================
// CLI
// ============================================================

#[derive(Parser)]
#[command(name = "slashproc-web", about = "slashproc JSON-RPC and HTTP server", version = slashproc_core::VERSION)]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:8848", env = "SLASHPROC_LISTEN")]
    listen: String,

    /// Path to /proc filesystem.
    #[arg(long, default_value = "/proc", env = "SLASHPROC_PROC_PATH")]
    proc_path: String,

    /// Comma-separated list of built-in sources to register (default: all).
    #[arg(long, env = "SLASHPROC_SOURCES", value_delimiter = ',')]
    sources: Vec<String>,

    /// Refuse to start if any source fails registration.
    #[arg(long, env = "SLASHPROC_STRICT")]
    strict: bool,
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("slashproc_web=info,slashproc_core=info")),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };
    runtime.block_on(async_main(args));
}

async fn async_main(args: Args) {
    info!(version = slashproc_core::VERSION, proc_path = %args.proc_path, "starting");

    let registry = match build_registry(&args) {
        Ok(registry) => registry,
        Err(e) => {
            error!(error = %e, "source registration failed (--strict)");
            process::exit(1);
        }
    };
    if registry.is_empty() {
        error!("no source could be registered");
        process::exit(1);
    }

    let app = router(registry)
        .layer(AccessLogLayer)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .into_make_service_with_connect_info::<SocketAddr>();

    let addr: SocketAddr = match args.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(listen = %args.listen, error = %e, "invalid listen address");
            process::exit(1);
        }
    };
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    info!(%addr, "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        process::exit(1);
    }
    info!("stopped");
}

fn build_registry(args: &Args) -> Result<SharedRegistry, RegisterError> {
    #[cfg(target_os = "linux")]
    let fs = RealFs::new();
    #[cfg(not(target_os = "linux"))]
    let fs = MockFs::typical_system();

    let entries = catalog::filter(catalog::builtin(fs, &args.proc_path), &args.sources);
    let registry = Registry::new();
    catalog::register_all(&registry, entries, args.strict)?;
    Ok(Arc::new(registry))
}

fn router(registry: SharedRegistry) -> Router {
    Router::new()
        .route("/", post(handlers::handle_rpc))
        .route("/slashproc", get(handlers::handle_sources))
        .route("/slashproc/{*path}", get(handlers::handle_path))
        .route("/api/v1/health", get(handlers::handle_health))
        .route("/api-docs/openapi.json", get(handlers::handle_openapi))
        .with_state(registry)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
