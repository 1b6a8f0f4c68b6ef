/*!
 * System diagnostics snapshot, written alongside a collection's target
 * directory when `collect_system_info` is set.
 *
 * Mirrors the source collector's `PCInfoCollector`/`PCInfoCollectorConfig`
 * split: a profile of which sections to gather, with network info,
 * environment variables, and process listings off by default because they
 * can carry sensitive data. Re-expressed through `sysinfo`, which the
 * teacher already depends on for disk-space probing.
 */

use std::path::Path;

use serde::Serialize;
use serde_json::{json, Value};
use sysinfo::{Disks, Networks, System};

use crate::error::Result;

/// Output format for a saved snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcInfoFormat {
    Json,
    Text,
}

/// Controls which sections [`SystemInfoCollector`] gathers. Sensitive
/// sections (network, environment variables, process list) default to off,
/// matching `PCInfoCollectorConfig.get_safe_default()` in the source.
#[derive(Debug, Clone, Copy)]
pub struct PcInfoProfile {
    pub os: bool,
    pub cpu: bool,
    pub ram: bool,
    pub disk: bool,
    pub network: bool,
    pub env_vars: bool,
    pub process: bool,
}

impl Default for PcInfoProfile {
    fn default() -> Self {
        Self::safe_default()
    }
}

impl PcInfoProfile {
    pub fn safe_default() -> Self {
        Self {
            os: true,
            cpu: true,
            ram: true,
            disk: true,
            network: false,
            env_vars: false,
            process: false,
        }
    }

    pub fn full() -> Self {
        Self {
            os: true,
            cpu: true,
            ram: true,
            disk: true,
            network: true,
            env_vars: true,
            process: true,
        }
    }

    /// Human-readable warnings for each sensitive section this profile
    /// turns on, surfaced by the CLI before a run collects them.
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.network {
            warnings.push("network information may reveal host topology (IP addresses, interfaces)");
        }
        if self.env_vars {
            warnings.push("environment variables may contain secrets (tokens, passwords)");
        }
        if self.process {
            warnings.push("process listing may expose command-line arguments containing secrets");
        }
        warnings
    }
}

/// Narrow interface a caller can implement to plug in a different system
/// profiler (e.g. one backed by a remote agent rather than local `sysinfo`).
pub trait PcInfoReporter: Send + Sync {
    fn collect_all(&self) -> Value;
    fn save(&self, path: &Path, format: PcInfoFormat) -> std::io::Result<()>;
}

#[derive(Serialize)]
struct DiskInfo {
    mount_point: String,
    total_bytes: u64,
    available_bytes: u64,
    file_system: String,
}

#[derive(Serialize)]
struct NetworkInterfaceInfo {
    name: String,
    received_bytes: u64,
    transmitted_bytes: u64,
}

/// Default reporter backed by `sysinfo`.
pub struct SystemInfoCollector {
    profile: PcInfoProfile,
}

impl SystemInfoCollector {
    pub fn new(profile: PcInfoProfile) -> Self {
        Self { profile }
    }
}

impl Default for SystemInfoCollector {
    fn default() -> Self {
        Self::new(PcInfoProfile::default())
    }
}

impl PcInfoReporter for SystemInfoCollector {
    fn collect_all(&self) -> Value {
        let mut info = json!({});

        if self.profile.os || self.profile.cpu || self.profile.ram {
            let sys = System::new_all();
            if self.profile.os {
                info["os"] = json!({
                    "name": System::name(),
                    "kernel_version": System::kernel_version(),
                    "os_version": System::os_version(),
                    "host_name": System::host_name(),
                    "architecture": std::env::consts::ARCH,
                });
            }
            if self.profile.cpu {
                info["cpu"] = json!({
                    "count": sys.cpus().len(),
                    "brand": sys.cpus().first().map(|c| c.brand().to_string()),
                });
            }
            if self.profile.ram {
                info["ram"] = json!({
                    "total_bytes": sys.total_memory(),
                    "available_bytes": sys.available_memory(),
                    "used_bytes": sys.used_memory(),
                });
            }
        }

        if self.profile.disk {
            let disks = Disks::new_with_refreshed_list();
            let disk_list: Vec<DiskInfo> = disks
                .iter()
                .map(|d| DiskInfo {
                    mount_point: d.mount_point().display().to_string(),
                    total_bytes: d.total_space(),
                    available_bytes: d.available_space(),
                    file_system: d.file_system().to_string_lossy().into_owned(),
                })
                .collect();
            info["disks"] = json!(disk_list);
        }

        if self.profile.network {
            let networks = Networks::new_with_refreshed_list();
            let interfaces: Vec<NetworkInterfaceInfo> = networks
                .iter()
                .map(|(name, data)| NetworkInterfaceInfo {
                    name: name.clone(),
                    received_bytes: data.total_received(),
                    transmitted_bytes: data.total_transmitted(),
                })
                .collect();
            info["network"] = json!(interfaces);
        }

        if self.profile.env_vars {
            let vars: Value = std::env::vars().collect::<std::collections::BTreeMap<_, _>>().into();
            info["env_vars"] = vars;
        }

        if self.profile.process {
            let sys = System::new_all();
            let processes: Vec<Value> = sys
                .processes()
                .values()
                .map(|p| {
                    json!({
                        "pid": p.pid().as_u32(),
                        "name": p.name().to_string_lossy(),
                    })
                })
                .collect();
            info["processes"] = json!(processes);
        }

        info["collected_at"] = json!(chrono::Utc::now().to_rfc3339());
        info
    }

    fn save(&self, path: &Path, format: PcInfoFormat) -> std::io::Result<()> {
        let info = self.collect_all();
        let rendered = match format {
            PcInfoFormat::Json => serde_json::to_string_pretty(&info)?,
            PcInfoFormat::Text => render_text(&info),
        };
        std::fs::write(path, rendered)
    }
}

fn render_text(info: &Value) -> String {
    fn write_section(out: &mut String, key: &str, value: &Value) {
        out.push_str(&format!("[{}]\n", key));
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    out.push_str(&format!("  {} = {}\n", k, v));
                }
            }
            other => out.push_str(&format!("  {}\n", other)),
        }
        out.push('\n');
    }

    let mut out = String::new();
    if let Value::Object(map) = info {
        for (key, value) in map {
            write_section(&mut out, key, value);
        }
    }
    out
}

/// Save `info` to `path`, used by the collection service after calling
/// [`PcInfoReporter::collect_all`] separately (matching the source's
/// two-step `collect_all()` then `save_to_file()`).
pub fn save_snapshot(reporter: &dyn PcInfoReporter, path: &Path, format: PcInfoFormat) -> Result<()> {
    reporter.save(path, format)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_default_excludes_sensitive_sections() {
        let profile = PcInfoProfile::default();
        assert!(!profile.network);
        assert!(!profile.env_vars);
        assert!(!profile.process);
        assert!(profile.os);
        assert!(profile.cpu);
    }

    #[test]
    fn test_full_profile_enables_everything() {
        let profile = PcInfoProfile::full();
        assert!(profile.network && profile.env_vars && profile.process);
    }

    #[test]
    fn test_collect_all_produces_object() {
        let collector = SystemInfoCollector::default();
        let info = collector.collect_all();
        assert!(info.is_object());
        assert!(info.get("os").is_some());
        assert!(info.get("network").is_none());
    }

    #[test]
    fn test_save_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pc_info.json");
        let collector = SystemInfoCollector::default();
        collector.save(&path, PcInfoFormat::Json).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"os\""));
    }

    #[test]
    fn test_warnings_only_for_enabled_sensitive_sections() {
        let profile = PcInfoProfile::full();
        assert_eq!(profile.warnings().len(), 3);
        assert!(PcInfoProfile::safe_default().warnings().is_empty());
    }
}
