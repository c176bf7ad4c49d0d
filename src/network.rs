//! Network readiness detection.
//!
//! Scheduling is gated on the host having a usable network link. On Linux this
//! is read from the interface states exported under `/sys/class/net`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Sysfs directory listing network interfaces.
const SYS_CLASS_NET: &str = "/sys/class/net";

/// Source of the network readiness signal.
pub trait NetworkReadiness {
    fn is_network_ready(&self) -> bool;
}

/// Cached readiness, refreshed by a poller and read by the scheduler.
impl NetworkReadiness for AtomicBool {
    fn is_network_ready(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

/// Probes interface link state from sysfs.
pub struct SysfsNetworkProbe {
    root: PathBuf,
    last_ready: AtomicBool,
}

impl SysfsNetworkProbe {
    pub fn new() -> Self {
        Self::with_root(SYS_CLASS_NET)
    }

    /// Probe a custom sysfs-style directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if !root.exists() {
            warn!("Network sysfs path {:?} does not exist", root);
        }
        Self {
            root,
            last_ready: AtomicBool::new(false),
        }
    }

    /// Whether a single interface directory describes a live link.
    fn interface_is_up(dir: &Path) -> bool {
        let operstate = match std::fs::read_to_string(dir.join("operstate")) {
            Ok(s) => s,
            Err(_) => return false,
        };

        match operstate.trim() {
            "up" => true,
            // Some drivers (tun, wireguard) never report "up"
            "unknown" => std::fs::read_to_string(dir.join("carrier"))
                .map(|c| c.trim() == "1")
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Scan all non-loopback interfaces.
    pub fn probe(&self) -> bool {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Failed to read {:?}: {}", self.root, e);
                return false;
            }
        };

        let ready = entries.flatten().any(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            name != "lo" && Self::interface_is_up(&entry.path())
        });

        let previous = self.last_ready.swap(ready, Ordering::SeqCst);
        if previous != ready {
            debug!("Network readiness changed: {}", ready);
        }
        ready
    }
}

impl Default for SysfsNetworkProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkReadiness for SysfsNetworkProbe {
    fn is_network_ready(&self) -> bool {
        self.probe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn add_iface(root: &Path, name: &str, operstate: &str, carrier: Option<&str>) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("operstate"), format!("{}\n", operstate)).unwrap();
        if let Some(carrier) = carrier {
            fs::write(dir.join("carrier"), format!("{}\n", carrier)).unwrap();
        }
    }

    #[test]
    fn test_loopback_only_is_not_ready() {
        let dir = tempdir().unwrap();
        add_iface(dir.path(), "lo", "unknown", Some("1"));
        let probe = SysfsNetworkProbe::with_root(dir.path());
        assert!(!probe.is_network_ready());
    }

    #[test]
    fn test_interface_up_is_ready() {
        let dir = tempdir().unwrap();
        add_iface(dir.path(), "lo", "unknown", Some("1"));
        add_iface(dir.path(), "eth0", "down", Some("0"));
        let probe = SysfsNetworkProbe::with_root(dir.path());
        assert!(!probe.probe());

        add_iface(dir.path(), "wlan0", "up", None);
        assert!(probe.probe());
    }

    #[test]
    fn test_unknown_state_uses_carrier() {
        let dir = tempdir().unwrap();
        add_iface(dir.path(), "wg0", "unknown", Some("0"));
        let probe = SysfsNetworkProbe::with_root(dir.path());
        assert!(!probe.probe());

        add_iface(dir.path(), "tun0", "unknown", Some("1"));
        assert!(probe.probe());
    }

    #[test]
    fn test_missing_root_is_not_ready() {
        let dir = tempdir().unwrap();
        let probe = SysfsNetworkProbe::with_root(dir.path().join("missing"));
        assert!(!probe.probe());
    }

    #[test]
    fn test_cached_flag_readiness() {
        let flag = AtomicBool::new(false);
        assert!(!flag.is_network_ready());
        flag.store(true, Ordering::SeqCst);
        assert!(flag.is_network_ready());
    }
}
