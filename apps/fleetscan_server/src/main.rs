mod auth;
mod config;
mod error;
mod routes;
mod state;

use anyhow::{Context, Result};
use config::AppConfig;
use fleetscan_cache::Cache;
use fleetscan_git::{GitOrchestrator, GitSslConfig};
use fleetscan_query::SmsClient;
use fleetscan_scan::ScanRegistry;
use fleetscan_security::{secret_from_env, CredentialVault};
use state::{AppState, RepositoryStore, TemplateStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Arc::new(AppConfig::from_env().context("loading configuration")?);
    std::fs::create_dir_all(config.git_root()).context("creating git working-tree root")?;
    if let Some(parent) = config.credentials_db_path().parent() {
        std::fs::create_dir_all(parent).context("creating credentials db directory")?;
    }

    let secret = secret_from_env().map_err(|err| anyhow::anyhow!("{err}"))?;
    let vault = Arc::new(
        CredentialVault::open(config.credentials_db_path(), &secret).context("opening credential vault")?,
    );

    let git = Arc::new(GitOrchestrator::new(
        config.git_root(),
        vault.clone(),
        GitSslConfig::from_env(),
    ));
    let scans = Arc::new(ScanRegistry::new(vault.clone()));
    let cache = Arc::new(Cache::new(config.cache_default_ttl));
    let sms = Arc::new(SmsClient::new(config.sms_base_url.clone(), Some(config.sms_timeout)));
    let repositories = Arc::new(RepositoryStore::default());
    let templates = Arc::new(TemplateStore::default());

    let state = AppState {
        config: config.clone(),
        vault,
        git: git.clone(),
        scans,
        cache: cache.clone(),
        sms,
        repositories: repositories.clone(),
        templates,
    };

    if config.cache_prefetch_on_startup {
        spawn_cache_prefetch(git, repositories, cache);
    }

    let app = routes::build(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding to {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "fleetscan server listening");
    axum::serve(listener, app).await.context("serving HTTP")?;

    Ok(())
}

/// Fire-and-forget: warms the commit-history cache entry for the selected
/// repository's branch. Never blocks startup and never retried on failure.
fn spawn_cache_prefetch(
    git: Arc<GitOrchestrator>,
    repositories: Arc<RepositoryStore>,
    cache: Arc<Cache>,
) {
    tokio::spawn(async move {
        let Some(repo) = repositories.selected() else {
            tracing::debug!("no selected repository configured, skipping cache prefetch");
            return;
        };
        match git.status(&repo).await {
            Ok(status) => {
                if let Ok(value) = serde_json::to_value(&status) {
                    cache.set(&format!("repo:{}", repo.id), "status", value);
                    tracing::info!(repository = %repo.name, "prefetched git status into cache");
                }
            }
            Err(err) => {
                tracing::warn!(repository = %repo.name, %err, "cache prefetch failed");
            }
        }
    });
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();
}
