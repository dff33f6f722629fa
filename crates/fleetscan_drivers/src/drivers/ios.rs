use crate::{ssh::SshProbe, ClassifierDriver, ClassifierSession, DeviceFacts, DriverError, DriverTarget};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

static HOSTNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?P<hostname>\S+)\s+uptime is").unwrap());

/// Classic Cisco IOS CLI over SSH. `show version`'s first line reads
/// `<hostname> uptime is ...`.
#[derive(Default)]
pub struct IosDriver;

#[async_trait]
impl ClassifierDriver for IosDriver {
    fn driver_name(&self) -> &'static str {
        "ios"
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
        Ok(Box::new(IosSession { probe: Some(probe) }))
    }
}

struct IosSession {
    probe: Option<SshProbe>,
}

#[async_trait]
impl ClassifierSession for IosSession {
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
