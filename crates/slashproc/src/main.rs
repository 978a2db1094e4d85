//! slashproc: inspect, validate and query `/proc` sources from the command line.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{Map, json};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use slashproc_core::api::{Method, Params, dispatch};
use slashproc_core::catalog::{self, Entry};
use slashproc_core::collector::FileSystem;
#[cfg(target_os = "linux")]
use slashproc_core::collector::RealFs;
#[cfg(not(target_os = "linux"))]
use slashproc_core::collector::mock::MockFs;
use slashproc_core::registry::{RegisterError, Registry};
use slashproc_core::validate::Report;

#[derive(Parser, Debug)]
#[command(name = "slashproc", about = "Self-describing /proc explorer", version = slashproc_core::VERSION)]
struct Cli {
    /// Path to /proc filesystem.
    #[arg(long, default_value = "/proc", global = true)]
    proc_path: String,

    /// Verbose output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered sources.
    List,
    /// Validate sources: schema plus a fresh data sample.
    Check {
        /// Source ids (default: every built-in source).
        ids: Vec<String>,
        /// Print reports as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Group declarations, e.g. `slashproc groups cpuinfo/core0`.
    Groups { path: Vec<String> },
    /// Variable declarations, e.g. `slashproc vars meminfo memfree`.
    Vars { path: Vec<String> },
    /// Live values, e.g. `slashproc data /proc/uptime/total`.
    Data { path: Vec<String> },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    #[cfg(target_os = "linux")]
    let fs = RealFs::new();
    #[cfg(not(target_os = "linux"))]
    let fs = MockFs::typical_system();

    let mut stdout = io::stdout().lock();
    match run(&cli, fs, &mut stdout) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "failed to write output");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["slashproc", "slashproc_core"] {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Runs one command. `Ok(false)` means the command itself reported failure.
fn run<F: FileSystem + Clone + 'static>(cli: &Cli, fs: F, out: &mut impl Write) -> io::Result<bool> {
    let entries = catalog::builtin(fs, &cli.proc_path);
    let method = match &cli.command {
        Command::Check { ids, json } => return check(catalog::filter(entries, ids), *json, out),
        Command::List => Method::GetSources,
        Command::Groups { .. } => Method::GetGroups,
        Command::Vars { .. } => Method::GetVars,
        Command::Data { .. } => Method::GetData,
    };

    let params = match &cli.command {
        Command::Groups { path } | Command::Vars { path } | Command::Data { path } => {
            Params {
                path: Some(path.clone().into()),
                ..Params::default()
            }
        }
        _ => Params::default(),
    };

    let registry = Registry::new();
    // Rejections are already logged; lookups against them answer "Parser not Found".
    let _ = catalog::register_all(&registry, entries, false);

    let reply = dispatch(&registry, method, &params);
    print_json(out, &reply)?;
    Ok(!reply.is_error())
}

enum Outcome {
    Checked(Report),
    Rejected(RegisterError),
    Unreadable(String),
}

fn check(entries: Vec<Entry>, as_json: bool, out: &mut impl Write) -> io::Result<bool> {
    let registry = Registry::new();
    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = entry.id.clone();
        let outcome = match registry.register_arc(entry.id, entry.source) {
            Err(e) => Outcome::Rejected(e),
            Ok(_) => match registry.check(&id) {
                Ok(report) => Outcome::Checked(report),
                Err(e) => Outcome::Unreadable(e.message()),
            },
        };
        outcomes.push((id, outcome));
    }

    let ok = outcomes
        .iter()
        .all(|(_, o)| matches!(o, Outcome::Checked(report) if report.ok));

    if as_json {
        let mut reports = Map::new();
        for (id, outcome) in &outcomes {
            let value = match outcome {
                Outcome::Checked(report) => serde_json::to_value(report).unwrap_or_default(),
                Outcome::Rejected(RegisterError::InvalidSchema { report, .. }) => {
                    serde_json::to_value(report).unwrap_or_default()
                }
                Outcome::Rejected(e) => json!({"ok": false, "error": e.to_string()}),
                Outcome::Unreadable(msg) => json!({"ok": false, "error": msg}),
            };
            reports.insert(id.clone(), value);
        }
        print_json(out, &json!({"ok": ok, "reports": reports}))?;
        return Ok(ok);
    }

    for (id, outcome) in &outcomes {
        match outcome {
            Outcome::Checked(report) | Outcome::Rejected(RegisterError::InvalidSchema { report, .. }) => {
                let status = if report.ok { "ok" } else { "FAILED" };
                writeln!(out, "{id}: {status} ({report})")?;
                for d in &report.diagnostics {
                    writeln!(out, "  {d}")?;
                }
            }
            Outcome::Rejected(e) => writeln!(out, "{id}: FAILED ({e})")?,
            Outcome::Unreadable(msg) => writeln!(out, "{id}: FAILED ({msg})")?,
        }
    }
    Ok(ok)
}

fn print_json<T: serde::Serialize>(out: &mut impl Write, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}
