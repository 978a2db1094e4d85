//! Built-in sources for a Linux `/proc` tree.
//!
//! Each entry is a generic adapter pointed at one file or directory. Which
//! entries get registered is up to the caller (`--sources` in the binaries).

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::collector::FileSystem;
use crate::model::Node;
use crate::registry::{RegisterError, Registry};
use crate::source::{
    ArgsSource, BlockSource, ColumnSource, DirTreeSource, KeyValueSource, ProcessTreeSource,
    Separator, Source, SourceInfo,
};

/// A source ready to be registered under `id`.
pub struct Entry {
    pub id: String,
    pub source: Arc<dyn Source>,
}

impl Entry {
    fn new(id: &str, source: impl Source + 'static) -> Self {
        Self {
            id: id.to_string(),
            source: Arc::new(source),
        }
    }
}

/// Ids of every built-in source, in registration order.
pub const BUILTIN_IDS: [&str; 12] = [
    "uptime",
    "loadavg",
    "version",
    "cmdline",
    "meminfo",
    "vmstat",
    "cpuinfo",
    "pidstatus",
    "sys_kernel",
    "sys_vm",
    "sys_net",
    "sys_dev",
];

/// Kernel arguments with a fixed meaning.
const CMDLINE_VARS: [(&str, &str, &str); 6] = [
    ("raw", "Kernel Command Line", "The full kernel boot command"),
    ("boot_image", "Boot Image", "Kernel image the boot loader started"),
    ("root", "Root Filesystem", "Device mounted as the root filesystem"),
    ("ro", "Read Only Root", "Mount the root filesystem read-only at boot"),
    ("quiet", "Quiet Boot", "Suppress most kernel log messages during boot"),
    ("console", "Console", "Console device and options"),
];

/// `/proc/<pid>/status` keys, with their unit.
const STATUS_VARS: [(&str, &str, &str, &str); 11] = [
    ("name", "Name of the Process", "", "Command run by this process"),
    ("state", "State of the Process", "", "Current scheduling state, such as R (running) or S (sleeping)"),
    ("tgid", "Thread Group ID", "", "Thread group id, the process id"),
    ("pid", "Process ID", "", "Thread id"),
    ("ppid", "Parent Process ID", "", "Pid of the parent process"),
    ("uid", "UID", "", "Real, effective, saved set and filesystem uids"),
    ("gid", "GID", "", "Real, effective, saved set and filesystem gids"),
    ("vmpeak", "Virtual Memory Peak", "kB", "Peak virtual memory size"),
    ("vmsize", "Virtual Memory Size", "kB", "Virtual memory size"),
    ("vmrss", "Virtual Memory Resident Size", "kB", "Resident set size"),
    ("threads", "Number of Threads", "", "Threads in the process"),
];

/// All built-in sources reading below `proc_path`.
pub fn builtin<F: FileSystem + Clone + 'static>(fs: F, proc_path: impl AsRef<Path>) -> Vec<Entry> {
    let proc = proc_path.as_ref();
    let seconds = |id: &str, label: &str, desc: &str| {
        Node::variable(id)
            .with_label(label)
            .with_unit("Seconds")
            .with_description(desc)
    };
    let unitless = |id: &str, label: &str, desc: &str| {
        Node::variable(id)
            .with_label(label)
            .with_unit("")
            .with_description(desc)
    };

    let cmdline = CMDLINE_VARS.iter().fold(
        ArgsSource::new(
            fs.clone(),
            proc.join("cmdline"),
            SourceInfo::new("cmdline")
                .with_label("Kernel Command Line")
                .with_description("Arguments passed to the kernel at boot"),
        ),
        |source, (id, label, desc)| source.describe(unitless(id, label, desc)),
    );
    let pidstatus = STATUS_VARS.iter().fold(
        ProcessTreeSource::new(
            fs.clone(),
            proc,
            SourceInfo::new("pidstatus")
                .with_label("Process Status")
                .with_description("Per-process status, nested by parent process"),
        ),
        |source, (id, label, unit, desc)| {
            source.describe(
                Node::variable(*id)
                    .with_label(*label)
                    .with_unit(*unit)
                    .with_description(*desc),
            )
        },
    );

    vec![
        Entry::new(
            "uptime",
            ColumnSource::new(
                fs.clone(),
                proc.join("uptime"),
                SourceInfo::new("uptime")
                    .with_label("Uptime")
                    .with_description("Time since boot"),
            )
            .column(seconds(
                "total",
                "Total Uptime",
                "The total number of seconds the system has been up",
            ))
            .column(seconds(
                "idle",
                "Idle Uptime",
                "The total number of seconds the system has been up and idle",
            )),
        ),
        Entry::new(
            "loadavg",
            ColumnSource::new(
                fs.clone(),
                proc.join("loadavg"),
                SourceInfo::new("loadavg")
                    .with_label("Load Average")
                    .with_description("Run queue length averaged over time"),
            )
            .column(unitless("load1", "1 Minute Load", "Load average over the last minute"))
            .column(unitless("load5", "5 Minute Load", "Load average over the last 5 minutes"))
            .column(unitless("load15", "15 Minute Load", "Load average over the last 15 minutes"))
            .column(unitless(
                "entities",
                "Scheduling Entities",
                "Runnable entities over total entities",
            ))
            .column(unitless("last_pid", "Last PID", "Most recently assigned process id")),
        ),
        Entry::new(
            "version",
            ColumnSource::new(
                fs.clone(),
                proc.join("version"),
                SourceInfo::new("version")
                    .with_label("Kernel Version")
                    .with_description("Running kernel identification"),
            )
            .column(unitless("ostype", "OS Type", "Operating system name"))
            .column(unitless("banner", "Version Banner", "Kernel version, builder and build flags"))
            .with_remainder(),
        ),
        Entry::new("cmdline", cmdline),
        Entry::new(
            "meminfo",
            KeyValueSource::new(
                fs.clone(),
                proc.join("meminfo"),
                SourceInfo::new("meminfo")
                    .with_label("Memory Info")
                    .with_description("Memory usage statistics"),
                Separator::Colon,
            )
            .with_units(),
        ),
        Entry::new(
            "vmstat",
            KeyValueSource::new(
                fs.clone(),
                proc.join("vmstat"),
                SourceInfo::new("vmstat")
                    .with_label("Virtual Memory Statistics")
                    .with_description("Virtual memory counters"),
                Separator::Whitespace,
            ),
        ),
        Entry::new(
            "cpuinfo",
            BlockSource::new(
                fs.clone(),
                proc.join("cpuinfo"),
                SourceInfo::new("cpuinfo")
                    .with_label("CPU Info")
                    .with_description("Per-processor details"),
                "core",
            ),
        ),
        Entry::new("pidstatus", pidstatus),
        Entry::new(
            "sys_kernel",
            DirTreeSource::new(
                fs.clone(),
                proc.join("sys/kernel"),
                SourceInfo::new("sys_kernel")
                    .with_label("Kernel Parameters")
                    .with_description("Tunables under /proc/sys/kernel"),
            ),
        ),
        Entry::new(
            "sys_vm",
            DirTreeSource::new(
                fs.clone(),
                proc.join("sys/vm"),
                SourceInfo::new("sys_vm")
                    .with_label("VM Parameters")
                    .with_description("Tunables under /proc/sys/vm"),
            ),
        ),
        Entry::new(
            "sys_net",
            DirTreeSource::new(
                fs.clone(),
                proc.join("sys/net"),
                SourceInfo::new("sys_net")
                    .with_label("Network Parameters")
                    .with_description("Tunables under /proc/sys/net"),
            ),
        ),
        Entry::new(
            "sys_dev",
            DirTreeSource::new(
                fs,
                proc.join("sys/dev"),
                SourceInfo::new("sys_dev")
                    .with_label("Device Parameters")
                    .with_description("Tunables under /proc/sys/dev"),
            ),
        ),
    ]
}

/// Keeps the entries whose id is in `only`. An empty filter keeps everything.
pub fn filter(entries: Vec<Entry>, only: &[String]) -> Vec<Entry> {
    if only.is_empty() {
        return entries;
    }
    for id in only {
        if !entries.iter().any(|e| &e.id == id) {
            warn!(source = %id, "unknown source requested");
        }
    }
    entries.into_iter().filter(|e| only.contains(&e.id)).collect()
}

/// Outcome of [`register_all`].
#[derive(Debug, Default)]
pub struct Summary {
    pub registered: Vec<String>,
    pub rejected: Vec<RegisterError>,
}

/// Registers every entry. Rejected sources are logged and skipped, unless
/// `strict` is set, in which case the first rejection is returned.
pub fn register_all(
    registry: &Registry,
    entries: Vec<Entry>,
    strict: bool,
) -> Result<Summary, RegisterError> {
    let mut summary = Summary::default();
    for entry in entries {
        match registry.register_arc(entry.id.clone(), entry.source) {
            Ok(_) => summary.registered.push(entry.id),
            Err(e) if strict => return Err(e),
            Err(e) => {
                warn!(source = %e.id(), error = %e, "source skipped");
                summary.rejected.push(e);
            }
        }
    }
    info!(
        registered = summary.registered.len(),
        rejected = summary.rejected.len(),
        "catalog loaded"
    );
    Ok(summary)
}
