//! Renders a device list against an operator template and writes the
//! result into a Git working tree (or a fallback directory), optionally
//! committing and pushing.

use fleetscan_git::{sanitize_relative_path, GitError, GitOrchestrator};
use fleetscan_model::{DeviceInfo, GitRepository};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("io error writing inventory file: {0}")]
    Io(#[from] std::io::Error),
    #[error("git action failed: {0}")]
    Git(#[from] GitError),
}

#[derive(Debug, Serialize)]
struct RenderContext<'a> {
    all_devices: &'a [DeviceInfo],
    devices: &'a [DeviceInfo],
    total_devices: usize,
}

pub struct RenderOutcome {
    pub path: PathBuf,
    pub rendered_with_fallback: bool,
    pub committed: bool,
    pub pushed: bool,
}

pub struct GitActionRequest<'a> {
    pub repo: &'a GitRepository,
    pub auto_commit: bool,
    pub auto_push: bool,
    pub commit_message: Option<&'a str>,
}

/// Render `template_source` against `devices`, write it under
/// `destination_root/filename` (path-traversal cleansed), and apply the
/// requested Git actions. Template failures never abort the write — they
/// fall back to a JSON dump of the same data, logged as a warning.
pub async fn render_and_write(
    template_source: &str,
    devices: &[DeviceInfo],
    destination_root: &Path,
    filename: &str,
    git: Option<(&GitOrchestrator, GitActionRequest<'_>)>,
) -> Result<RenderOutcome, InventoryError> {
    let safe_relpath = sanitize_relative_path(filename);
    let destination = destination_root.join(&safe_relpath);

    let (rendered, rendered_with_fallback) = render(template_source, devices);

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&destination, rendered.as_bytes()).await?;

    let mut committed = false;
    let mut pushed = false;

    if let Some((orchestrator, request)) = git {
        if request.auto_commit {
            match orchestrator
                .commit_and_push(request.repo, &safe_relpath, request.commit_message, request.auto_push)
                .await
            {
                Ok(()) => {
                    committed = true;
                    pushed = request.auto_push;
                }
                Err(err) => {
                    warn!(repo = %request.repo.name, %err, "inventory commit/push failed; file left on disk");
                }
            }
        }
    }

    Ok(RenderOutcome {
        path: destination,
        rendered_with_fallback,
        committed,
        pushed,
    })
}

fn render(template_source: &str, devices: &[DeviceInfo]) -> (String, bool) {
    let context_data = RenderContext {
        all_devices: devices,
        devices,
        total_devices: devices.len(),
    };

    let tera_context = match Context::from_serialize(&context_data) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%err, "failed to build template context, falling back to JSON");
            return (json_fallback(&context_data), true);
        }
    };

    match Tera::one_off(template_source, &tera_context, false) {
        Ok(rendered) => (rendered, false),
        Err(err) => {
            warn!(%err, "template rendering failed, falling back to JSON");
            (json_fallback(&context_data), true)
        }
    }
}

fn json_fallback(context_data: &RenderContext<'_>) -> String {
    serde_json::to_string_pretty(context_data).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_device(name: &str) -> DeviceInfo {
        DeviceInfo {
            id: name.to_string(),
            name: name.to_string(),
            primary_ip4: Some("10.0.0.1".to_string()),
            status: None,
            device_type: None,
            role: None,
            location: None,
            platform: None,
            manufacturer: None,
            tags: vec![],
        }
    }

    #[test]
    fn renders_valid_template_against_device_list() {
        let devices = vec![sample_device("core-r1")];
        let (rendered, fell_back) = render("{% for d in devices %}{{ d.name }}\n{% endfor %}total={{ total_devices }}", &devices);
        assert!(!fell_back);
        assert_eq!(rendered, "core-r1\ntotal=1");
    }

    #[test]
    fn falls_back_to_json_on_template_error() {
        let devices = vec![sample_device("core-r1")];
        let (rendered, fell_back) = render("{% for missing %}", &devices);
        assert!(fell_back);
        assert!(rendered.contains("core-r1"));
    }
}
