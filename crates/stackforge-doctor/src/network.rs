//! Offline detection.
//!
//! Offline mode is forced by configuration or `STACKFORGE_OFFLINE=1`; when
//! `detect_offline` is set a bounded TCP connect to a package registry
//! decides instead.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Environment variable that forces offline mode
pub const OFFLINE_ENV: &str = "STACKFORGE_OFFLINE";

/// Host probed for reachability
pub const DEFAULT_REGISTRY_ADDR: &str = "registry.npmjs.org:443";

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Why the run is (or is not) offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineStatus {
    /// `offline = true` in config or on the command line
    Configured,
    /// `STACKFORGE_OFFLINE=1`
    Environment,
    /// Registry probe failed
    Detected,
    /// Registry probe succeeded
    Online,
    /// Not forced and detection disabled
    NotChecked,
}

impl OfflineStatus {
    #[must_use]
    pub const fn is_offline(&self) -> bool {
        matches!(self, Self::Configured | Self::Environment | Self::Detected)
    }

    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Configured => "offline mode enabled by configuration",
            Self::Environment => "offline mode forced by STACKFORGE_OFFLINE",
            Self::Detected => "package registry unreachable; treating run as offline",
            Self::Online => "package registry reachable",
            Self::NotChecked => "offline detection disabled",
        }
    }
}

/// Decides [`OfflineStatus`] from flags, environment and a reachability probe.
#[derive(Debug, Clone)]
pub struct OfflineDetector {
    addr: String,
    timeout: Duration,
}

impl Default for OfflineDetector {
    fn default() -> Self {
        Self {
            addr: DEFAULT_REGISTRY_ADDR.to_string(),
            timeout: CONNECT_TIMEOUT,
        }
    }
}

impl OfflineDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe `addr` (`host:port`) instead of the default registry.
    #[must_use]
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn status(&self, configured_offline: bool, detect: bool) -> OfflineStatus {
        if configured_offline {
            OfflineStatus::Configured
        } else if env_forces_offline() {
            OfflineStatus::Environment
        } else if !detect {
            OfflineStatus::NotChecked
        } else if self.reachable() {
            OfflineStatus::Online
        } else {
            OfflineStatus::Detected
        }
    }

    /// Whether a TCP connection to the probe address succeeds in time.
    #[must_use]
    pub fn reachable(&self) -> bool {
        let addrs = match self.addr.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::debug!(addr = %self.addr, error = %e, "Registry address did not resolve");
                return false;
            }
        };
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(_) => return true,
                Err(e) => tracing::debug!(addr = %addr, error = %e, "Registry connect failed"),
            }
        }
        false
    }
}

fn env_forces_offline() -> bool {
    std::env::var(OFFLINE_ENV).is_ok_and(|v| matches!(v.trim(), "1" | "true" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_configured_wins_without_probing() {
        let detector = OfflineDetector::new().with_addr("invalid host name:0");
        assert_eq!(detector.status(true, true), OfflineStatus::Configured);
        assert!(OfflineStatus::Configured.is_offline());
    }

    #[test]
    fn test_local_listener_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let detector = OfflineDetector::new().with_addr(addr.to_string());
        assert!(detector.reachable());
    }

    #[test]
    fn test_closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let detector = OfflineDetector::new()
            .with_addr(addr.to_string())
            .with_timeout(Duration::from_millis(200));
        assert!(!detector.reachable());
    }

    #[test]
    fn test_unresolvable_address_is_unreachable() {
        let detector = OfflineDetector::new().with_addr("not an address");
        assert!(!detector.reachable());
    }

    #[test]
    fn test_status_descriptions() {
        assert!(!OfflineStatus::Online.is_offline());
        assert!(!OfflineStatus::NotChecked.is_offline());
        assert!(OfflineStatus::Detected.describe().contains("unreachable"));
    }
}
