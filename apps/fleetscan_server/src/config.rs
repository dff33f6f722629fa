use std::path::PathBuf;
use std::time::Duration;

/// Immutable process configuration, built once at startup from the
/// environment. Everything downstream (state, routes) reads from this
/// rather than re-consulting `std::env` piecemeal.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_token: String,
    pub data_root: PathBuf,
    pub sms_base_url: String,
    pub sms_timeout: Duration,
    pub cache_default_ttl: Duration,
    pub cache_prefetch_on_startup: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = std::env::var("FLEETSCAN_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let api_token = std::env::var("FLEETSCAN_API_TOKEN")
            .map_err(|_| anyhow::anyhow!("FLEETSCAN_API_TOKEN must be set"))?;
        let data_root = std::env::var("FLEETSCAN_DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        let sms_base_url = std::env::var("FLEETSCAN_SMS_BASE_URL")
            .map_err(|_| anyhow::anyhow!("FLEETSCAN_SMS_BASE_URL must be set"))?;
        let sms_timeout = Duration::from_secs(env_u64("FLEETSCAN_SMS_TIMEOUT_SECS", 30));
        let cache_default_ttl = Duration::from_secs(env_u64("FLEETSCAN_CACHE_TTL_SECS", 600));
        let cache_prefetch_on_startup = std::env::var("FLEETSCAN_CACHE_PREFETCH")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            bind_addr,
            api_token,
            data_root,
            sms_base_url,
            sms_timeout,
            cache_default_ttl,
            cache_prefetch_on_startup,
        })
    }

    pub fn git_root(&self) -> PathBuf {
        self.data_root.join("git")
    }

    pub fn credentials_db_path(&self) -> PathBuf {
        self.data_root.join("settings").join("credentials.db")
    }

    pub fn inventory_fallback_root(&self) -> PathBuf {
        self.data_root.join("inventory")
    }
}

fn env_u64(var: &str, default: u64) -> u64 {
    std::env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
