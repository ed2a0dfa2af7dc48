use glob::glob;
use log::{debug, trace};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use sysconf::raw::{sysconf, SysconfVariable};

// One sub-directory per logical cpu. Logical cpus sharing a
// (package, core) pair are hyper-threads of the same physical core.
const CPU_TOPOLOGY_GLOB: &str = "/sys/devices/system/cpu/cpu[0-9]*/topology";
const CPUINFO: &str = "/proc/cpuinfo";
const MEMINFO: &str = "/proc/meminfo";
const KERNEL_DIR: &str = "/proc/sys/kernel";

/// Core counts of the machine under test.
pub trait CoreCount {
    fn logical(&self) -> usize;
    fn physical(&self) -> usize;
}

/// Core counts from the operating system.
#[derive(Debug, Default)]
pub struct SystemCores;

impl SystemCores {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CoreCount for SystemCores {
    /// Online processors; at least 1.
    fn logical(&self) -> usize {
        match sysconf(SysconfVariable::ScNprocessorsOnln) {
            Ok(n) if n > 0 => n as usize,
            _ => {
                debug!("sysconf(_SC_NPROCESSORS_ONLN) unusable, asking std");
                std::thread::available_parallelism().map_or(1, |n| n.get())
            }
        }
    }

    /// Distinct (package, core) pairs in sysfs, or the logical count when
    /// the topology is not exposed.
    fn physical(&self) -> usize {
        let mut cores = HashSet::new();
        if let Ok(paths) = glob(CPU_TOPOLOGY_GLOB) {
            for path in paths.flatten() {
                if let Some(core) = topology_pair(&path) {
                    cores.insert(core);
                }
            }
        }
        trace!("physical cores from sysfs: {}", cores.len());
        if cores.is_empty() {
            self.logical()
        } else {
            cores.len()
        }
    }
}

fn topology_pair(dir: &Path) -> Option<(u64, u64)> {
    let read = |name: &str| -> Option<u64> {
        fs::read_to_string(dir.join(name)).ok()?.trim().parse().ok()
    };
    Some((read("physical_package_id")?, read("core_id")?))
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuInfo {
    pub name: Option<String>,
    /// MHz of the first cpu listed
    pub frequency: Option<f64>,
    pub physical: usize,
    pub logical: usize,
    pub architecture: &'static str,
}

/// Bytes
#[derive(Debug, Clone, Serialize)]
pub struct MemoryInfo {
    pub total: Option<u64>,
    pub avail: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub platform: &'static str,
    pub machine: &'static str,
    pub node: Option<String>,
    pub release: Option<String>,
    pub version: Option<String>,
}

/// Static description of the host, reported next to the results.
/// Anything that can't be read is left out rather than failing the run.
#[derive(Debug, Clone, Serialize)]
pub struct MachineInfo {
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub system: SystemInfo,
}

impl MachineInfo {
    #[must_use]
    pub fn collect(cores: &dyn CoreCount) -> Self {
        let cpuinfo = fs::read_to_string(CPUINFO).unwrap_or_default();
        let meminfo = fs::read_to_string(MEMINFO).unwrap_or_default();
        let kernel = |name: &str| {
            fs::read_to_string(Path::new(KERNEL_DIR).join(name))
                .ok()
                .map(|s| s.trim().to_string())
        };

        Self {
            cpu: CpuInfo {
                name: cpuinfo_field(&cpuinfo, "model name").map(str::to_string),
                frequency: cpuinfo_field(&cpuinfo, "cpu MHz").and_then(|mhz| mhz.parse().ok()),
                physical: cores.physical(),
                logical: cores.logical(),
                architecture: std::env::consts::ARCH,
            },
            memory: MemoryInfo {
                total: meminfo_bytes(&meminfo, "MemTotal"),
                avail: meminfo_bytes(&meminfo, "MemAvailable"),
            },
            system: SystemInfo {
                platform: std::env::consts::OS,
                machine: std::env::consts::ARCH,
                node: kernel("hostname"),
                release: kernel("osrelease"),
                version: kernel("version"),
            },
        }
    }
}

/// Value of the first `key : value` line in /proc/cpuinfo text.
#[must_use]
pub fn cpuinfo_field<'a>(cpuinfo: &'a str, key: &str) -> Option<&'a str> {
    cpuinfo.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim() == key).then(|| v.trim())
    })
}

/// A /proc/meminfo entry converted from kB to bytes.
#[must_use]
pub fn meminfo_bytes(meminfo: &str, key: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        if k.trim() != key {
            return None;
        }
        let kb: u64 = v.split_whitespace().next()?.parse().ok()?;
        Some(kb * 1024)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPUINFO_SAMPLE: &str = "\
processor\t: 0
vendor_id\t: GenuineIntel
model name\t: Intel(R) Xeon(R) Gold 6130 CPU @ 2.10GHz
cpu MHz\t\t: 2100.000
flags\t\t: fpu vme de pse

processor\t: 1
model name\t: Intel(R) Xeon(R) Gold 6130 CPU @ 2.10GHz
cpu MHz\t\t: 1999.871
";

    const MEMINFO_SAMPLE: &str = "\
MemTotal:       16318480 kB
MemFree:          612356 kB
MemAvailable:    9876543 kB
";

    #[test]
    fn test_cpuinfo_first_match() {
        assert_eq!(
            cpuinfo_field(CPUINFO_SAMPLE, "model name"),
            Some("Intel(R) Xeon(R) Gold 6130 CPU @ 2.10GHz")
        );
        assert_eq!(cpuinfo_field(CPUINFO_SAMPLE, "cpu MHz"), Some("2100.000"));
        assert_eq!(cpuinfo_field(CPUINFO_SAMPLE, "bogomips"), None);
    }

    #[test]
    fn test_meminfo_bytes() {
        assert_eq!(meminfo_bytes(MEMINFO_SAMPLE, "MemTotal"), Some(16_318_480 * 1024));
        assert_eq!(meminfo_bytes(MEMINFO_SAMPLE, "MemAvailable"), Some(9_876_543 * 1024));
        // prefix of another key must not match
        assert_eq!(meminfo_bytes(MEMINFO_SAMPLE, "Mem"), None);
    }

    #[test]
    fn test_system_core_counts() {
        let cores = SystemCores::new();
        assert!(cores.logical() >= 1);
        assert!(cores.physical() >= 1);
    }

    #[test]
    fn test_collect_uses_core_count() {
        let info = MachineInfo::collect(&SystemCores::new());
        assert!(info.cpu.logical >= 1);
        assert_eq!(info.system.platform, std::env::consts::OS);
    }
}
