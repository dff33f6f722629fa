//! Shared domain types for the fleetscan dashboard backend.
//!
//! This crate is intentionally free of I/O: encryption, storage, SSH, and
//! HTTP all live in their own crates and depend on these types, not the
//! other way around.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type CredentialId = i64;
pub type RepositoryId = i64;
pub type TemplateId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    Ssh,
    Tacacs,
    Generic,
    Token,
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CredentialType::Ssh => "ssh",
            CredentialType::Tacacs => "tacacs",
            CredentialType::Generic => "generic",
            CredentialType::Token => "token",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for CredentialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ssh" => Ok(CredentialType::Ssh),
            "tacacs" => Ok(CredentialType::Tacacs),
            "generic" => Ok(CredentialType::Generic),
            "token" => Ok(CredentialType::Token),
            other => Err(format!("unknown credential type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Active,
    Expiring,
    Expired,
}

/// A credential's metadata, as returned to callers. The password never
/// appears here; only `fleetscan_security::CredentialVault::decrypt` can
/// recover it, and only the scan/git subsystems call that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialMetadata {
    pub id: CredentialId,
    pub name: String,
    pub username: String,
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    pub valid_until: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: CredentialStatus,
}

impl CredentialMetadata {
    /// Expiry status derived from `valid_until` and today's date, per the
    /// `expired` / `expiring` (<= 7 days) / `active` rule.
    pub fn derive_status(valid_until: Option<NaiveDate>, today: NaiveDate) -> CredentialStatus {
        match valid_until {
            None => CredentialStatus::Active,
            Some(expiry) if expiry < today => CredentialStatus::Expired,
            Some(expiry) if (expiry - today).num_days() <= 7 => CredentialStatus::Expiring,
            Some(_) => CredentialStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryCategory {
    Configs,
    Templates,
    Onboarding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitRepository {
    pub id: RepositoryId,
    pub name: String,
    pub category: RepositoryCategory,
    pub url: String,
    pub branch: String,
    /// Legacy inline auth. `credential_name`, if set, wins over these.
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub credential_name: Option<String>,
    pub path: Option<String>,
    pub verify_ssl: bool,
    pub is_active: bool,
    pub sync_status: Option<String>,
    pub last_sync: Option<DateTime<Utc>>,
}

impl GitRepository {
    /// Resolve the on-disk directory name for this repository, relative to
    /// `<data_root>/git/`.
    pub fn dir_name(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryMode {
    Napalm,
    SshLogin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Cisco,
    Linux,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Running,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub ip: String,
    pub credential_id: CredentialId,
    pub device_type: DeviceType,
    pub hostname: Option<String>,
    pub platform: Option<String>,
}

/// Monotonically non-decreasing progress counters for a `ScanJob`.
///
/// Invariant: `authenticated + unreachable + auth_failed + driver_not_supported <= scanned <= total_targets`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScanCounters {
    pub scanned: usize,
    pub alive: usize,
    pub authenticated: usize,
    pub unreachable: usize,
    pub auth_failed: usize,
    pub driver_not_supported: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJob {
    pub job_id: String,
    pub created: DateTime<Utc>,
    pub cidrs: Vec<String>,
    pub credential_ids: Vec<CredentialId>,
    pub discovery_mode: DiscoveryMode,
    pub parser_template_ids: Vec<TemplateId>,
    pub total_targets: usize,
    pub counters: ScanCounters,
    pub state: ScanState,
    pub results: Vec<ScanResult>,
    pub errors: Vec<String>,
}

impl ScanJob {
    pub fn is_counter_consistent(&self) -> bool {
        let c = self.counters;
        let sum = c.authenticated + c.unreachable + c.auth_failed + c.driver_not_supported;
        c.scanned <= self.total_targets && sum <= c.scanned
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryOperator {
    Equals,
    Contains,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryField {
    Name,
    Location,
    Role,
    Tag,
    DeviceType,
    Manufacturer,
    Platform,
    #[serde(rename = "custom_fields")]
    CustomField(String),
}

impl QueryField {
    /// Only `name` and `location` support regex-style `contains`; every
    /// other field degrades `contains` to `equals`.
    pub fn supports_contains(&self) -> bool {
        matches!(self, QueryField::Name | QueryField::Location)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: QueryField,
    pub operator: QueryOperator,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalOperation {
    pub operation_type: LogicalOp,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub nested_operations: Vec<LogicalOperation>,
}

/// A device as returned from the SMS GraphQL surface, already destructured
/// out of the nested optional GraphQL shapes (`primary_ip4.address`,
/// `status.name`, ...) into flat `Option<String>` fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub primary_ip4: Option<String>,
    pub status: Option<String>,
    pub device_type: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
    pub platform: Option<String>,
    pub manufacturer: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSource {
    Git,
    File,
    WebEditor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Jinja2,
    Text,
    Yaml,
    Json,
    Textfsm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateVersion {
    pub version: u32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub source: TemplateSource,
    #[serde(rename = "type")]
    pub template_type: TemplateType,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub versions: Vec<TemplateVersion>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_active_with_no_expiry() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(
            CredentialMetadata::derive_status(None, today),
            CredentialStatus::Active
        );
    }

    #[test]
    fn status_expired_in_the_past() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let expiry = today - Duration::days(1);
        assert_eq!(
            CredentialMetadata::derive_status(Some(expiry), today),
            CredentialStatus::Expired
        );
    }

    #[test]
    fn status_expiring_within_seven_days() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let expiry = today + Duration::days(7);
        assert_eq!(
            CredentialMetadata::derive_status(Some(expiry), today),
            CredentialStatus::Expiring
        );
    }

    #[test]
    fn status_active_past_the_expiring_window() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let expiry = today + Duration::days(8);
        assert_eq!(
            CredentialMetadata::derive_status(Some(expiry), today),
            CredentialStatus::Active
        );
    }

    #[test]
    fn scan_job_counter_consistency() {
        let mut job = ScanJob {
            job_id: "scan_1".into(),
            created: Utc::now(),
            cidrs: vec!["10.0.0.0/29".into()],
            credential_ids: vec![1],
            discovery_mode: DiscoveryMode::Napalm,
            parser_template_ids: vec![],
            total_targets: 6,
            counters: ScanCounters {
                scanned: 6,
                alive: 1,
                authenticated: 1,
                unreachable: 5,
                auth_failed: 0,
                driver_not_supported: 0,
            },
            state: ScanState::Finished,
            results: vec![],
            errors: vec![],
        };
        assert!(job.is_counter_consistent());
        job.counters.scanned = 3;
        assert!(!job.is_counter_consistent());
    }

    #[test]
    fn query_field_contains_support() {
        assert!(QueryField::Name.supports_contains());
        assert!(QueryField::Location.supports_contains());
        assert!(!QueryField::Role.supports_contains());
        assert!(!QueryField::CustomField("site".into()).supports_contains());
    }

    #[test]
    fn logical_operation_round_trips_through_json() {
        let op = LogicalOperation {
            operation_type: LogicalOp::And,
            conditions: vec![Condition {
                field: QueryField::Role,
                operator: QueryOperator::Equals,
                value: "edge".into(),
            }],
            nested_operations: vec![],
        };
        let json = serde_json::to_string(&op).unwrap();
        let back: LogicalOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.conditions.len(), 1);
    }
}
