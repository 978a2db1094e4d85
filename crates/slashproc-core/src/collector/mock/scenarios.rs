//! Pre-built mock filesystem scenarios for testing.
//!
//! The files mirror what a small two-core Linux machine exposes under `/proc`.

use super::filesystem::MockFs;

impl MockFs {
    /// Creates a typical two-core system with the files the built-in catalog reads.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.add_file("/proc/uptime", "12345.67 98765.43\n");
        fs.add_file("/proc/loadavg", "0.15 0.10 0.05 1/150 1234\n");
        fs.add_file(
            "/proc/version",
            "Linux version 6.1.0-18-amd64 (debian-kernel@lists.debian.org) (gcc-12 (Debian 12.2.0-14) 12.2.0) #1 SMP PREEMPT_DYNAMIC Debian 6.1.76-1 (2024-02-01)\n",
        );
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
Active:          4096000 kB
Inactive:        2048000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
Dirty:              1024 kB
HugePages_Total:       0
HugePages_Free:        0
Hugepagesize:       2048 kB
",
        );
        fs.add_file(
            "/proc/vmstat",
            "\
nr_free_pages 2048000
nr_inactive_anon 12000
nr_active_anon 250000
nr_dirty 256
pgpgin 1048576
pgpgout 2097152
pswpin 0
pswpout 0
pgfault 987654321
pgmajfault 4321
",
        );
        fs.add_file(
            "/proc/cpuinfo",
            "\
processor\t: 0
vendor_id\t: GenuineIntel
model name\t: Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz
cpu MHz\t\t: 2400.000
cache size\t: 35840 KB
core id\t\t: 0
bogomips\t: 4800.00

processor\t: 1
vendor_id\t: GenuineIntel
model name\t: Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz
cpu MHz\t\t: 2399.872
cache size\t: 35840 KB
core id\t\t: 1
bogomips\t: 4800.00

",
        );

        fs.add_file(
            "/proc/cmdline",
            "BOOT_IMAGE=/boot/vmlinuz-6.1.0-18-amd64 root=UUID=3f1c9a2e-77b0-4c1e-9d5a-0c8e2b7f4a61 ro quiet console=ttyS0,115200\n",
        );

        fs.add_file(
            "/proc/1/status",
            process_status("systemd", 1, 0, "0\t0\t0\t0", &[("VmPeak", 167_744), ("VmRSS", 12_480)]),
        );
        fs.add_file("/proc/2/status", process_status("kthreadd", 2, 0, "0\t0\t0\t0", &[]));
        fs.add_file(
            "/proc/812/status",
            process_status("sshd", 812, 1, "0\t0\t0\t0", &[("VmPeak", 15_420), ("VmRSS", 9_216)]),
        );
        fs.add_file(
            "/proc/1290/status",
            process_status("bash", 1290, 812, "1000\t1000\t1000\t1000", &[("VmPeak", 10_100), ("VmRSS", 5_312)]),
        );
        fs.add_dir("/proc/self");

        fs.add_file("/proc/sys/kernel/ostype", "Linux\n");
        fs.add_file("/proc/sys/kernel/osrelease", "6.1.0-18-amd64\n");
        fs.add_file("/proc/sys/kernel/pid_max", "4194304\n");
        fs.add_file("/proc/sys/kernel/core_pattern", "core\n");
        fs.add_file(
            "/proc/sys/kernel/random/boot_id",
            "0b7e3c4e-5a43-4f5e-9d1c-2f1f7f0d8c11\n",
        );
        fs.add_file("/proc/sys/kernel/random/entropy_avail", "256\n");
        fs.add_unreadable("/proc/sys/kernel/cad_pid");

        fs.add_file("/proc/sys/vm/swappiness", "60\n");
        fs.add_file("/proc/sys/vm/overcommit_memory", "0\n");
        fs.add_file("/proc/sys/vm/dirty_ratio", "20\n");

        fs.add_file("/proc/sys/net/core/somaxconn", "4096\n");
        fs.add_file("/proc/sys/net/ipv4/ip_forward", "0\n");
        fs.add_file("/proc/sys/net/ipv4/conf/all/forwarding", "0\n");
        fs.add_file("/proc/sys/net/ipv6/conf/all/forwarding", "1\n");

        fs.add_file("/proc/sys/dev/cdrom/autoclose", "1\n");
        fs.add_file("/proc/sys/dev/cdrom/info", "CD-ROM information, Id: cdrom.c 3.20 2003/12/17\n\ndrive name:\n");
        fs.add_file("/proc/sys/dev/hpet/max-user-freq", "64\n");
        fs.add_file("/proc/sys/dev/raid/speed_limit_max", "200000\n");
        fs.add_file("/proc/sys/dev/raid/speed_limit_min", "1000\n");

        fs
    }

    /// A system where every catalog file is missing.
    ///
    /// The `/proc` directory itself exists, so process scans find nothing.
    pub fn empty_proc() -> Self {
        let mut fs = Self::new();
        fs.add_dir("/proc");
        fs
    }
}

/// A `/proc/<pid>/status` body with `kB` memory lines.
fn process_status(name: &str, pid: u32, ppid: u32, uid: &str, memory: &[(&str, u64)]) -> String {
    let mut status = format!(
        "Name:\t{name}\nState:\tS (sleeping)\nTgid:\t{pid}\nPid:\t{pid}\nPPid:\t{ppid}\nUid:\t{uid}\n"
    );
    for (key, kb) in memory {
        status.push_str(&format!("{key}:\t{kb:>8} kB\n"));
    }
    status.push_str("Threads:\t1\n");
    status
}
