//! Per-host classification: liveness, then ordered credential trials,
//! stopping at the first authenticated success.

use fleetscan_drivers::{
    classify_napalm, classify_ssh_login, config, device_type_label, liveness, textfsm::TextFsmTemplate,
    DriverRegistry, DriverTarget, NapalmOutcome, SshLoginOutcome,
};
use fleetscan_model::{CredentialId, DeviceType, DiscoveryMode, ScanResult};
use fleetscan_security::CredentialVault;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub enum HostOutcome {
    Unreachable,
    Authenticated(ScanResult),
    AuthFailed,
}

#[instrument(skip(vault, registry, templates), fields(host = %host))]
pub async fn run_host(
    host: String,
    credential_ids: &[CredentialId],
    discovery_mode: DiscoveryMode,
    vault: &CredentialVault,
    registry: &DriverRegistry,
    templates: &[TextFsmTemplate],
) -> HostOutcome {
    let attempts = config::ping_attempts();
    let per_attempt = config::ping_timeout();
    if !liveness::is_alive(&host, attempts, per_attempt).await {
        return HostOutcome::Unreachable;
    }

    for &credential_id in credential_ids {
        let username = match vault.get(credential_id).await {
            Ok(metadata) => metadata.username,
            Err(err) => {
                warn!(credential_id, %err, "credential lookup failed, trying next");
                continue;
            }
        };
        let password = match vault.decrypt(credential_id).await {
            Ok(password) => password,
            Err(err) => {
                warn!(credential_id, %err, "credential decrypt failed, trying next");
                continue;
            }
        };

        let target = DriverTarget {
            host: host.clone(),
            port: 22,
            username,
            password,
        };

        let scan_result = match discovery_mode {
            DiscoveryMode::Napalm => match classify_napalm(registry, &target).await {
                NapalmOutcome::Cisco { hostname, platform } => Some(ScanResult {
                    ip: host.clone(),
                    credential_id,
                    device_type: DeviceType::Cisco,
                    hostname: Some(hostname),
                    platform: Some(platform),
                }),
                NapalmOutcome::Linux { hostname } => Some(ScanResult {
                    ip: host.clone(),
                    credential_id,
                    device_type: DeviceType::Linux,
                    hostname: Some(hostname),
                    platform: Some("linux".to_string()),
                }),
                NapalmOutcome::Failed => None,
            },
            DiscoveryMode::SshLogin => match classify_ssh_login(&target, templates).await {
                SshLoginOutcome::Cisco { hostname, platform } => Some(ScanResult {
                    ip: host.clone(),
                    credential_id,
                    device_type: DeviceType::Cisco,
                    hostname,
                    platform,
                }),
                SshLoginOutcome::Linux { hostname, platform } => Some(ScanResult {
                    ip: host.clone(),
                    credential_id,
                    device_type: DeviceType::Linux,
                    hostname: Some(hostname),
                    platform: Some(platform),
                }),
                SshLoginOutcome::Unknown => Some(ScanResult {
                    ip: host.clone(),
                    credential_id,
                    device_type: DeviceType::Unknown,
                    hostname: None,
                    platform: Some("ssh-accessible".to_string()),
                }),
                SshLoginOutcome::ConnectFailed => None,
            },
        };

        if let Some(result) = scan_result {
            info!(
                credential_id,
                device_type = device_type_label(result.device_type),
                "host classified"
            );
            return HostOutcome::Authenticated(result);
        }
    }

    HostOutcome::AuthFailed
}

pub type SharedVault = Arc<CredentialVault>;
