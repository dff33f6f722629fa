use crate::config::AppConfig;
use fleetscan_cache::Cache;
use fleetscan_git::GitOrchestrator;
use fleetscan_model::{GitRepository, RepositoryId, Template, TemplateId};
use fleetscan_query::SmsClient;
use fleetscan_scan::ScanRegistry;
use fleetscan_security::CredentialVault;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Git repositories and templates have no prescribed on-disk format in the
/// source spec (only the credential store does); they live in an
/// in-process map guarded by a lock, the same shared-state shape the cache
/// and scan registry already use.
#[derive(Default)]
pub struct RepositoryStore {
    repos: RwLock<HashMap<RepositoryId, GitRepository>>,
    next_id: AtomicI64,
    selected: RwLock<Option<RepositoryId>>,
}

impl RepositoryStore {
    pub fn list(&self) -> Vec<GitRepository> {
        self.repos.read().values().cloned().collect()
    }

    pub fn get(&self, id: RepositoryId) -> Option<GitRepository> {
        self.repos.read().get(&id).cloned()
    }

    pub fn insert(&self, mut repo: GitRepository) -> GitRepository {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        repo.id = id;
        self.repos.write().insert(id, repo.clone());
        repo
    }

    pub fn update(&self, id: RepositoryId, repo: GitRepository) -> Option<GitRepository> {
        let mut repos = self.repos.write();
        if repos.contains_key(&id) {
            repos.insert(id, repo.clone());
            Some(repo)
        } else {
            None
        }
    }

    pub fn delete(&self, id: RepositoryId) -> bool {
        self.repos.write().remove(&id).is_some()
    }

    pub fn selected(&self) -> Option<GitRepository> {
        let id = (*self.selected.read())?;
        self.get(id)
    }

    pub fn select(&self, id: RepositoryId) -> Option<GitRepository> {
        let repo = self.get(id)?;
        *self.selected.write() = Some(id);
        Some(repo)
    }
}

#[derive(Default)]
pub struct TemplateStore {
    templates: RwLock<HashMap<TemplateId, Template>>,
    next_id: AtomicI64,
}

impl TemplateStore {
    pub fn get(&self, id: TemplateId) -> Option<Template> {
        self.templates.read().get(&id).cloned()
    }

    pub fn get_by_name_category(&self, name: &str, category: &str) -> Option<Template> {
        self.templates
            .read()
            .values()
            .find(|t| t.name == name && t.category == category)
            .cloned()
    }

    pub fn insert(&self, mut template: Template) -> Template {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        template.id = id;
        self.templates.write().insert(id, template.clone());
        template
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub vault: Arc<CredentialVault>,
    pub git: Arc<GitOrchestrator>,
    pub scans: Arc<ScanRegistry>,
    pub cache: Arc<Cache>,
    pub sms: Arc<SmsClient>,
    pub repositories: Arc<RepositoryStore>,
    pub templates: Arc<TemplateStore>,
}
