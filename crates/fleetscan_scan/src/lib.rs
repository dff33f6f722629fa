pub mod onboarding;
pub mod registry;
pub mod targets;
pub mod worker;

pub use onboarding::{process_onboarding, GitTarget, OnboardOutcome, OnboardRequest};
pub use registry::{ScanRegistry, ScanStartError, JOB_TTL};
pub use targets::{expand_targets, TargetError, MIN_PREFIX_LEN};

#[cfg(test)]
mod tests {
    use super::*;
    use fleetscan_model::DiscoveryMode;
    use fleetscan_security::CredentialVault;
    use std::sync::Arc;

    async fn test_vault() -> Arc<CredentialVault> {
        let vault = CredentialVault::open(":memory:", b"test-secret-32-bytes-long-enough").unwrap();
        Arc::new(vault)
    }

    #[tokio::test]
    async fn start_rejects_empty_credential_list() {
        let vault = test_vault().await;
        let registry = ScanRegistry::new(vault);
        let result = registry.start(
            vec!["192.0.2.0/30".to_string()],
            vec![],
            DiscoveryMode::Napalm,
            vec![],
            vec![],
        );
        assert!(matches!(result, Err(ScanStartError::NoCredentials)));
    }

    #[tokio::test]
    async fn start_rejects_oversized_cidr() {
        let vault = test_vault().await;
        let registry = ScanRegistry::new(vault);
        let result = registry.start(
            vec!["10.0.0.0/21".to_string()],
            vec![1],
            DiscoveryMode::Napalm,
            vec![],
            vec![],
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn job_appears_in_list_after_start() {
        let vault = test_vault().await;
        let registry = ScanRegistry::new(vault);
        let job = registry
            .start(
                vec!["192.0.2.0/30".to_string()],
                vec![1],
                DiscoveryMode::Napalm,
                vec![],
                vec![],
            )
            .expect("job starts");
        let job_id = job.lock().job_id.clone();
        assert!(registry.get(&job_id).is_some());
        assert_eq!(registry.list().len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_job_from_registry() {
        let vault = test_vault().await;
        let registry = ScanRegistry::new(vault);
        let job = registry
            .start(
                vec!["192.0.2.0/30".to_string()],
                vec![1],
                DiscoveryMode::Napalm,
                vec![],
                vec![],
            )
            .expect("job starts");
        let job_id = job.lock().job_id.clone();
        assert!(registry.delete(&job_id));
        assert!(registry.get(&job_id).is_none());
    }
}
