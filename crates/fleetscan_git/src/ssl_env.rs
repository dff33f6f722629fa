use std::path::PathBuf;

/// Per-repository SSL policy for Git child processes, translated into
/// `GIT_SSL_*` environment overrides handed directly to each spawned `git`
/// process. These never mutate this process's own environment: two git
/// invocations for two repositories with different `verify_ssl` settings
/// can run concurrently without one clobbering the other's policy, which a
/// global `std::env::set_var`-then-restore guard could not guarantee.
#[derive(Debug, Clone, Default)]
pub struct GitSslConfig {
    pub ca_info: Option<PathBuf>,
    pub cert: Option<PathBuf>,
}

impl GitSslConfig {
    pub fn from_env() -> Self {
        Self {
            ca_info: std::env::var("FLEETSCAN_GIT_SSL_CAINFO").ok().map(PathBuf::from),
            cert: std::env::var("FLEETSCAN_GIT_SSL_CERT").ok().map(PathBuf::from),
        }
    }

    pub fn env_overrides(&self, verify_ssl: bool) -> Vec<(String, String)> {
        let mut overrides = Vec::new();
        if !verify_ssl {
            overrides.push(("GIT_SSL_NO_VERIFY".to_string(), "1".to_string()));
        }
        if let Some(ca) = self.ca_info.as_ref().filter(|p| p.exists()) {
            overrides.push(("GIT_SSL_CAINFO".to_string(), ca.display().to_string()));
        }
        if let Some(cert) = self.cert.as_ref().filter(|p| p.exists()) {
            overrides.push(("GIT_SSL_CERT".to_string(), cert.display().to_string()));
        }
        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_ssl_true_adds_no_override() {
        let config = GitSslConfig::default();
        assert!(config.env_overrides(true).is_empty());
    }

    #[test]
    fn verify_ssl_false_sets_no_verify() {
        let config = GitSslConfig::default();
        let overrides = config.env_overrides(false);
        assert_eq!(overrides, vec![("GIT_SSL_NO_VERIFY".to_string(), "1".to_string())]);
    }
}
