//! In-memory scan job registry: one background supervisor per job, bounded
//! to 10 concurrent host workers, purged after a 24h TTL.

use crate::targets::{expand_targets, TargetError};
use crate::worker::{run_host, HostOutcome};
use fleetscan_drivers::{drivers, textfsm::TextFsmTemplate, DriverRegistry};
use fleetscan_model::{CredentialId, DiscoveryMode, ScanJob, ScanState, TemplateId};
use fleetscan_security::CredentialVault;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A job older than this is purged on the next registry access.
pub const JOB_TTL: Duration = Duration::from_secs(86_400);

/// Exactly 10 concurrent host workers per job, regardless of target count.
const WORKERS_PER_JOB: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ScanStartError {
    #[error("{0}")]
    Targets(#[from] TargetError),
    #[error("at least one credential must be supplied")]
    NoCredentials,
}

struct JobEntry {
    job: Arc<Mutex<ScanJob>>,
    deleted: Arc<AtomicBool>,
}

pub struct ScanRegistry {
    jobs: Mutex<HashMap<String, JobEntry>>,
    vault: Arc<CredentialVault>,
    drivers: Arc<DriverRegistry>,
}

impl ScanRegistry {
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        let classification_drivers: DriverRegistry = DriverRegistry::new(vec![
            Arc::new(drivers::IosDriver::default()),
            Arc::new(drivers::NxosSshDriver::default()),
            Arc::new(drivers::IosxrDriver::default()),
        ]);
        Self {
            jobs: Mutex::new(HashMap::new()),
            vault,
            drivers: Arc::new(classification_drivers),
        }
    }

    /// Drop any job whose `created` timestamp is older than `JOB_TTL`.
    fn purge_expired(&self) {
        let cutoff = chrono::Utc::now() - chrono::Duration::from_std(JOB_TTL).unwrap();
        let mut jobs = self.jobs.lock();
        jobs.retain(|_, entry| entry.job.lock().created > cutoff);
    }

    #[instrument(skip(self, templates))]
    pub fn start(
        &self,
        cidrs: Vec<String>,
        credential_ids: Vec<CredentialId>,
        discovery_mode: DiscoveryMode,
        parser_template_ids: Vec<TemplateId>,
        templates: Vec<TextFsmTemplate>,
    ) -> Result<Arc<Mutex<ScanJob>>, ScanStartError> {
        self.purge_expired();

        if credential_ids.is_empty() {
            return Err(ScanStartError::NoCredentials);
        }
        let hosts = expand_targets(&cidrs)?;

        let job_id = format!("scan_{}", Uuid::new_v4());
        let job = Arc::new(Mutex::new(ScanJob {
            job_id: job_id.clone(),
            created: chrono::Utc::now(),
            cidrs,
            credential_ids: credential_ids.clone(),
            discovery_mode,
            parser_template_ids,
            total_targets: hosts.len(),
            counters: Default::default(),
            state: ScanState::Running,
            results: vec![],
            errors: vec![],
        }));
        let deleted = Arc::new(AtomicBool::new(false));

        self.jobs.lock().insert(
            job_id.clone(),
            JobEntry {
                job: job.clone(),
                deleted: deleted.clone(),
            },
        );

        let vault = self.vault.clone();
        let drivers = self.drivers.clone();
        let supervisor_job = job.clone();
        tokio::spawn(async move {
            supervise(supervisor_job, deleted, hosts, credential_ids, discovery_mode, vault, drivers, templates).await;
        });

        Ok(job)
    }

    pub fn get(&self, job_id: &str) -> Option<Arc<Mutex<ScanJob>>> {
        self.purge_expired();
        self.jobs.lock().get(job_id).map(|entry| entry.job.clone())
    }

    pub fn list(&self) -> Vec<Arc<Mutex<ScanJob>>> {
        self.purge_expired();
        self.jobs.lock().values().map(|entry| entry.job.clone()).collect()
    }

    /// Drop the in-memory record. In-flight workers detect this at their
    /// next boundary and stop appending results.
    pub fn delete(&self, job_id: &str) -> bool {
        let mut jobs = self.jobs.lock();
        if let Some(entry) = jobs.remove(job_id) {
            entry.deleted.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }
}

#[instrument(skip_all, fields(job_id = %job.lock().job_id))]
async fn supervise(
    job: Arc<Mutex<ScanJob>>,
    deleted: Arc<AtomicBool>,
    hosts: Vec<std::net::Ipv4Addr>,
    credential_ids: Vec<CredentialId>,
    discovery_mode: DiscoveryMode,
    vault: Arc<CredentialVault>,
    drivers: Arc<DriverRegistry>,
    templates: Vec<TextFsmTemplate>,
) {
    let semaphore = Arc::new(Semaphore::new(WORKERS_PER_JOB));
    let mut tasks = FuturesUnordered::new();

    for host in hosts {
        let sem = semaphore.clone();
        let vault = vault.clone();
        let drivers = drivers.clone();
        let credential_ids = credential_ids.clone();
        let templates = templates.clone();
        let job = job.clone();
        let deleted = deleted.clone();

        tasks.push(tokio::spawn(async move {
            let permit = sem.acquire_owned().await.expect("semaphore never closed");
            let outcome = run_host(host.to_string(), &credential_ids, discovery_mode, &vault, &drivers, &templates).await;
            drop(permit);

            if deleted.load(Ordering::SeqCst) {
                return;
            }

            let mut job = job.lock();
            job.counters.scanned += 1;
            match outcome {
                HostOutcome::Unreachable => job.counters.unreachable += 1,
                HostOutcome::AuthFailed => {
                    job.counters.alive += 1;
                    job.counters.auth_failed += 1;
                }
                HostOutcome::Authenticated(result) => {
                    job.counters.alive += 1;
                    job.counters.authenticated += 1;
                    job.results.push(result);
                }
            }
        }));
    }

    while tasks.next().await.is_some() {}

    if !deleted.load(Ordering::SeqCst) {
        job.lock().state = ScanState::Finished;
        info!("scan job finished");
    }
}
