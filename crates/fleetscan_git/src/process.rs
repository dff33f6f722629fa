use crate::GitError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub struct GitCommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl GitCommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Run `git <args>` with an explicit environment overlay and a hard
/// timeout. Env overrides are passed directly to the child process — they
/// never touch this process's own environment, so concurrent git
/// invocations for different repositories with different SSL policies
/// can't stomp on one another.
pub async fn run_git(
    args: &[&str],
    cwd: Option<&Path>,
    env_overrides: &[(String, String)],
    timeout: Duration,
) -> Result<GitCommandOutput, GitError> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    cmd.envs(env_overrides.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null());

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| GitError::Timeout(git_command_label(args)))?
        .map_err(|e| GitError::Io(e.to_string()))?;

    Ok(GitCommandOutput {
        status: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn git_command_label(args: &[&str]) -> &'static str {
    match args.first() {
        Some(&"clone") => "clone",
        Some(&"pull") => "pull",
        Some(&"fetch") => "fetch",
        Some(&"push") => "push",
        _ => "git",
    }
}
