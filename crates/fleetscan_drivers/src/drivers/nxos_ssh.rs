use crate::{ssh::SshProbe, ClassifierDriver, ClassifierSession, DeviceFacts, DriverError, DriverTarget};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

static HOSTNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*Device name:\s*(?P<hostname>\S+)").unwrap());

/// Cisco NX-OS over SSH. `show version`'s `Device name:` line carries the
/// hostname; IOS's "uptime is" heuristic doesn't apply here.
#[derive(Default)]
pub struct NxosSshDriver;

#[async_trait]
impl ClassifierDriver for NxosSshDriver {
    fn driver_name(&self) -> &'static str {
        "nxos_ssh"
    }

    async fn connect(&self, target: &DriverTarget) -> Result<Box<dyn ClassifierSession>, DriverError> {
        let probe = SshProbe::connect(
            &target.host,
            target.port,
            &target.username,
            &target.password,
            Duration::from_secs(5),
        )
        .await?;
        Ok(Box::new(NxosSession { probe: Some(probe) }))
    }
}

struct NxosSession {
    probe: Option<SshProbe>,
}

#[async_trait]
impl ClassifierSession for NxosSession {
    async fn facts(&mut self) -> Result<DeviceFacts, DriverError> {
        let probe = self
            .probe
            .as_ref()
            .ok_or_else(|| DriverError::CommandFailed("session already closed".into()))?;
        let output = probe.exec("show version", Duration::from_secs(5)).await?;
        HOSTNAME_PATTERN
            .captures(&output.stdout)
            .and_then(|caps| caps.name("hostname"))
            .map(|m| DeviceFacts {
                hostname: m.as_str().to_string(),
            })
            .ok_or_else(|| DriverError::CommandFailed("could not parse hostname from show version".into()))
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if let Some(probe) = self.probe.take() {
            probe.close().await?;
        }
        Ok(())
    }
}
