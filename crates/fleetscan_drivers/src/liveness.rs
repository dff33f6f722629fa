use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Liveness probe via the system `ping` binary — one ICMP echo per attempt,
/// up to `attempts` times. Shells out rather than opening a raw socket,
/// which would need elevated privileges the service shouldn't require.
pub async fn is_alive(host: &str, attempts: u32, per_attempt_timeout: Duration) -> bool {
    for attempt in 1..=attempts.max(1) {
        if ping_once(host, per_attempt_timeout).await {
            return true;
        }
        debug!(host, attempt, "ping attempt failed");
    }
    false
}

async fn ping_once(host: &str, timeout: Duration) -> bool {
    let timeout_secs = timeout.as_secs().max(1).to_string();

    let mut cmd = Command::new("ping");
    #[cfg(target_os = "linux")]
    cmd.args(["-c", "1", "-W", &timeout_secs, host]);
    #[cfg(not(target_os = "linux"))]
    cmd.args(["-c", "1", "-t", &timeout_secs, host]);
    cmd.stdout(Stdio::null()).stderr(Stdio::null());

    match tokio::time::timeout(timeout + Duration::from_millis(500), cmd.status()).await {
        Ok(Ok(status)) => status.success(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unroutable_address_is_reported_unreachable() {
        let alive = is_alive("192.0.2.254", 1, Duration::from_millis(200)).await;
        assert!(!alive);
    }
}
