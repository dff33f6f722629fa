//! Post-scan onboarding: validate the operator's device selection against
//! a finished job's results, then route each device to the SMS (Cisco) or
//! the Inventory Generator (Linux).

use fleetscan_drivers::normalize_auto_platform;
use fleetscan_git::GitOrchestrator;
use fleetscan_model::{DeviceType, GitRepository, ScanJob};
use fleetscan_query::{render_and_write, GitActionRequest, OnboardingFields, SmsClient};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct OnboardRequest {
    pub device_ips: Vec<String>,
    pub sms_fields: OnboardingFields,
    pub filename: Option<String>,
    pub auto_commit: bool,
    pub auto_push: bool,
    pub commit_message: Option<String>,
}

#[derive(Debug, Default)]
pub struct OnboardOutcome {
    pub accepted: usize,
    pub cisco_queued: usize,
    pub linux_added: usize,
    pub inventory_path: Option<String>,
    pub job_ids: Vec<String>,
    pub skipped_unknown_ips: Vec<String>,
}

pub struct GitTarget<'a> {
    pub orchestrator: &'a GitOrchestrator,
    pub repository: &'a GitRepository,
    pub destination_root: &'a Path,
}

/// `template_source` is the already-resolved template body for the
/// operator's chosen inventory template (template storage lives above this
/// crate, in the HTTP surface).
pub async fn process_onboarding(
    job: &ScanJob,
    request: &OnboardRequest,
    sms: &SmsClient,
    template_source: &str,
    git_target: Option<GitTarget<'_>>,
) -> OnboardOutcome {
    let mut outcome = OnboardOutcome::default();
    let mut linux_devices = Vec::new();

    for ip in &request.device_ips {
        let Some(result) = job.results.iter().find(|r| &r.ip == ip) else {
            outcome.skipped_unknown_ips.push(ip.clone());
            continue;
        };
        outcome.accepted += 1;

        match result.device_type {
            DeviceType::Cisco => {
                let mut fields = request.sms_fields.clone();
                fields.ip = result.ip.clone();
                match sms.submit_onboarding_job(&fields).await {
                    Ok(job_id) => {
                        outcome.cisco_queued += 1;
                        outcome.job_ids.push(job_id);
                    }
                    Err(err) => {
                        tracing::warn!(ip = %result.ip, %err, "onboarding submission failed, continuing with siblings");
                    }
                }
            }
            DeviceType::Linux => {
                linux_devices.push(device_info_for(result));
            }
            DeviceType::Unknown => {
                tracing::warn!(ip = %result.ip, "skipping onboarding for unclassified device");
            }
        }
    }

    if !linux_devices.is_empty() {
        outcome.linux_added = linux_devices.len();
        if let Some(target) = git_target {
            let filename = request
                .filename
                .clone()
                .unwrap_or_else(|| "linux_inventory.yaml".to_string());

            let git_request = GitActionRequest {
                repo: target.repository,
                auto_commit: request.auto_commit,
                auto_push: request.auto_push,
                commit_message: request.commit_message.as_deref(),
            };
            match render_and_write(
                template_source,
                &linux_devices,
                target.destination_root,
                &filename,
                Some((target.orchestrator, git_request)),
            )
            .await
            {
                Ok(result) => outcome.inventory_path = Some(result.path.display().to_string()),
                Err(err) => tracing::warn!(%err, "inventory write failed for linux onboarding batch"),
            }
        }
    }

    outcome
}

fn device_info_for(result: &fleetscan_model::ScanResult) -> fleetscan_model::DeviceInfo {
    fleetscan_model::DeviceInfo {
        id: result.ip.clone(),
        name: result.hostname.clone().unwrap_or_else(|| result.ip.clone()),
        primary_ip4: Some(result.ip.clone()),
        status: None,
        device_type: Some("linux".to_string()),
        role: None,
        location: None,
        platform: result.platform.clone().map(|p| normalize_auto_platform(&p)),
        manufacturer: None,
        tags: vec![],
    }
}
