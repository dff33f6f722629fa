use once_cell::sync::Lazy;
use std::time::Duration;

const DEFAULT_DRIVER_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SSH_LOGIN_TIMEOUT_SECS: u64 = 5;
const DEFAULT_PING_TIMEOUT_MILLIS: u64 = 1500;
const DEFAULT_PING_ATTEMPTS: u32 = 3;

static DRIVER_TIMEOUT: Lazy<Duration> = Lazy::new(|| {
    env_duration(
        "FLEETSCAN_DRIVER_TIMEOUT_SECS",
        Duration::from_secs(DEFAULT_DRIVER_TIMEOUT_SECS),
    )
});

static SSH_LOGIN_TIMEOUT: Lazy<Duration> = Lazy::new(|| {
    env_duration(
        "FLEETSCAN_SSH_LOGIN_TIMEOUT_SECS",
        Duration::from_secs(DEFAULT_SSH_LOGIN_TIMEOUT_SECS),
    )
});

static PING_TIMEOUT: Lazy<Duration> = Lazy::new(|| {
    std::env::var("FLEETSCAN_PING_TIMEOUT_MILLIS")
        .ok()
        .and_then(|value| value.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(DEFAULT_PING_TIMEOUT_MILLIS))
});

static PING_ATTEMPTS: Lazy<u32> = Lazy::new(|| {
    std::env::var("FLEETSCAN_PING_ATTEMPTS")
        .ok()
        .and_then(|value| value.parse().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PING_ATTEMPTS)
});

/// Connect/auth timeout for a single classifier driver attempt (napalm mode).
pub fn driver_timeout() -> Duration {
    *DRIVER_TIMEOUT
}

/// Timeout for an `ssh-login` mode probe session.
pub fn ssh_login_timeout() -> Duration {
    *SSH_LOGIN_TIMEOUT
}

pub fn ping_timeout() -> Duration {
    *PING_TIMEOUT
}

pub fn ping_attempts() -> u32 {
    *PING_ATTEMPTS
}

fn env_duration(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|value| value.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
