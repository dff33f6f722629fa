pub mod config;
pub mod drivers;
pub mod liveness;
pub mod ssh;
pub mod textfsm;

use async_trait::async_trait;
use fleetscan_model::DeviceType;
use std::sync::Arc;
use std::time::Duration;
use textfsm::TextFsmTemplate;
use tracing::{instrument, warn};

/// Drivers are tried in this order for `discovery_mode = napalm`; this is a
/// fixed operator-safety bound, not a registry lookup.
pub const NAPALM_DRIVER_ORDER: [&str; 3] = ["ios", "nxos_ssh", "iosxr"];

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("timed out")]
    Timeout,
}

#[derive(Debug, Clone)]
pub struct DriverTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct DeviceFacts {
    pub hostname: String,
}

/// The capability set a classification driver must expose: connect, read
/// facts, close. Deliberately narrower than a full configuration-management
/// driver — this crate only ever needs to learn what a device *is*, never
/// to change it.
#[async_trait]
pub trait ClassifierDriver: Send + Sync {
    fn driver_name(&self) -> &'static str;
    async fn connect(&self, target: &DriverTarget) -> Result<Box<dyn ClassifierSession>, DriverError>;
}

#[async_trait]
pub trait ClassifierSession: Send {
    async fn facts(&mut self) -> Result<DeviceFacts, DriverError>;
    async fn close(&mut self) -> Result<(), DriverError>;
}

pub type DynClassifierDriver = Arc<dyn ClassifierDriver>;

/// Lookup table from driver name to implementation. Order of insertion does
/// not matter; `NAPALM_DRIVER_ORDER` governs trial order independently.
pub struct DriverRegistry {
    drivers: Vec<DynClassifierDriver>,
}

impl DriverRegistry {
    pub fn new(drivers: Vec<DynClassifierDriver>) -> Self {
        Self { drivers }
    }

    pub fn find(&self, name: &str) -> Option<DynClassifierDriver> {
        self.drivers.iter().find(|d| d.driver_name() == name).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NapalmOutcome {
    Cisco { hostname: String, platform: String },
    Linux { hostname: String },
    Failed,
}

/// Try each napalm-equivalent driver in `NAPALM_DRIVER_ORDER`, then fall
/// back to a bare Linux SSH probe if every Cisco driver fails.
#[instrument(skip(registry, target), fields(host = %target.host))]
pub async fn classify_napalm(registry: &DriverRegistry, target: &DriverTarget) -> NapalmOutcome {
    for name in NAPALM_DRIVER_ORDER {
        let Some(driver) = registry.find(name) else {
            continue;
        };
        match tokio::time::timeout(config::driver_timeout(), driver.connect(target)).await {
            Ok(Ok(mut session)) => match session.facts().await {
                Ok(facts) => {
                    let _ = session.close().await;
                    return NapalmOutcome::Cisco {
                        hostname: facts.hostname,
                        platform: name.to_string(),
                    };
                }
                Err(err) => {
                    warn!(driver = name, %err, "facts retrieval failed");
                    let _ = session.close().await;
                }
            },
            Ok(Err(err)) => warn!(driver = name, %err, "driver connect failed"),
            Err(_) => warn!(driver = name, "driver connect timed out"),
        }
    }

    match ssh::SshProbe::connect(
        &target.host,
        target.port,
        &target.username,
        &target.password,
        config::driver_timeout(),
    )
    .await
    {
        Ok(probe) => {
            let uname_s = probe.exec("uname -s", config::driver_timeout()).await;
            let uname_n = probe.exec("uname -n", config::driver_timeout()).await;
            let _ = probe.close().await;
            match (uname_s, uname_n) {
                (Ok(s), Ok(n))
                    if s.exit_status == 0 && s.stdout.trim().eq_ignore_ascii_case("linux") =>
                {
                    NapalmOutcome::Linux {
                        hostname: n.stdout.trim().to_string(),
                    }
                }
                _ => NapalmOutcome::Failed,
            }
        }
        Err(_) => NapalmOutcome::Failed,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshLoginOutcome {
    Cisco {
        hostname: Option<String>,
        platform: Option<String>,
    },
    Linux {
        hostname: String,
        platform: String,
    },
    Unknown,
    ConnectFailed,
}

const MIN_SHOW_VERSION_LEN: usize = 20;

/// `ssh-login` discovery mode: one plain SSH session, no napalm-style
/// driver, classification by command heuristics.
#[instrument(skip(target, templates), fields(host = %target.host))]
pub async fn classify_ssh_login(
    target: &DriverTarget,
    templates: &[TextFsmTemplate],
) -> SshLoginOutcome {
    let probe = match ssh::SshProbe::connect(
        &target.host,
        target.port,
        &target.username,
        &target.password,
        config::ssh_login_timeout(),
    )
    .await
    {
        Ok(probe) => probe,
        Err(_) => return SshLoginOutcome::ConnectFailed,
    };

    let show_version = probe
        .exec("show version", config::ssh_login_timeout())
        .await;

    if let Ok(output) = &show_version {
        if output.stderr.trim().is_empty() && output.stdout.trim().len() >= MIN_SHOW_VERSION_LEN {
            let hostname = templates
                .iter()
                .find_map(|t| t.extract_hostname(&output.stdout));
            let platform = hostname.as_ref().map(|_| "ssh-login".to_string());
            let _ = probe.close().await;
            return SshLoginOutcome::Cisco { hostname, platform };
        }
    }

    let hostname_out = probe.exec("hostname", config::ssh_login_timeout()).await;
    let uname_out = probe.exec("uname -a", config::ssh_login_timeout()).await;
    let _ = probe.close().await;

    if let Ok(h) = hostname_out {
        if h.exit_status == 0 && !h.stdout.trim().is_empty() {
            let platform = uname_out
                .ok()
                .map(|u| u.stdout.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "linux-unknown".to_string());
            return SshLoginOutcome::Linux {
                hostname: h.stdout.trim().to_string(),
                platform,
            };
        }
    }

    SshLoginOutcome::Unknown
}

/// Normalize an operator-supplied "auto-detect" platform sentinel the way
/// the onboarding submission path expects.
pub fn normalize_auto_platform(platform: &str) -> String {
    match platform.to_ascii_lowercase().as_str() {
        "detect" | "auto" | "auto-detect" => "linux".to_string(),
        other => other.to_string(),
    }
}

pub fn device_type_label(device_type: DeviceType) -> &'static str {
    match device_type {
        DeviceType::Cisco => "cisco",
        DeviceType::Linux => "linux",
        DeviceType::Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivers::mock::{MockClassifierDriver, MockResponse};

    fn target(host: &str) -> DriverTarget {
        DriverTarget {
            host: host.to_string(),
            port: 22,
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn classify_napalm_succeeds_on_first_matching_driver() {
        let ios = MockClassifierDriver::new("ios").with_response(
            "10.0.0.2",
            MockResponse::Facts(DeviceFacts {
                hostname: "edge-1".into(),
            }),
        );
        let nxos = MockClassifierDriver::new("nxos_ssh");
        let iosxr = MockClassifierDriver::new("iosxr");
        let registry = DriverRegistry::new(vec![Arc::new(ios), Arc::new(nxos), Arc::new(iosxr)]);

        let outcome = classify_napalm(&registry, &target("10.0.0.2")).await;
        assert_eq!(
            outcome,
            NapalmOutcome::Cisco {
                hostname: "edge-1".into(),
                platform: "ios".into(),
            }
        );
    }

    #[tokio::test]
    async fn classify_napalm_falls_through_to_second_driver() {
        let ios = MockClassifierDriver::new("ios");
        let nxos = MockClassifierDriver::new("nxos_ssh").with_response(
            "10.0.0.5",
            MockResponse::Facts(DeviceFacts {
                hostname: "dist-1".into(),
            }),
        );
        let iosxr = MockClassifierDriver::new("iosxr");
        let registry = DriverRegistry::new(vec![Arc::new(ios), Arc::new(nxos), Arc::new(iosxr)]);

        let outcome = classify_napalm(&registry, &target("10.0.0.5")).await;
        assert_eq!(
            outcome,
            NapalmOutcome::Cisco {
                hostname: "dist-1".into(),
                platform: "nxos_ssh".into(),
            }
        );
    }

    #[test]
    fn normalizes_auto_detect_sentinels() {
        assert_eq!(normalize_auto_platform("detect"), "linux");
        assert_eq!(normalize_auto_platform("AUTO"), "linux");
        assert_eq!(normalize_auto_platform("auto-detect"), "linux");
        assert_eq!(normalize_auto_platform("ios"), "ios");
    }
}
