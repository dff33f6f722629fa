//! GraphQL client for the Structured Management System (SMS). Field
//! resolvers mirror the one-query-per-field style of the dashboard this
//! crate replaces: each leaf `Condition` becomes exactly one GraphQL
//! request, and `contains` degrades to an exact match on fields whose
//! resolver has no `*__ire` regex argument.

use fleetscan_model::{Condition, DeviceInfo, QueryField, QueryOperator};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{instrument, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("request to SMS failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("SMS returned malformed GraphQL payload: {0}")]
    MalformedResponse(String),
    #[error("onboarding submission rejected: {0}")]
    OnboardingRejected(String),
}

#[derive(Clone)]
pub struct SmsClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<Value>,
}

impl SmsClient {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
            .build()
            .expect("reqwest client builds with a fixed timeout");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    #[instrument(skip(self, variables))]
    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, SmsError> {
        let body = json!({ "query": query, "variables": variables });
        let response = self
            .http
            .post(format!("{}/api/graphql/", self.base_url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let envelope: GraphQlEnvelope = response.json().await?;
        if !envelope.errors.is_empty() {
            warn!(errors = ?envelope.errors, "SMS returned GraphQL errors");
        }
        envelope
            .data
            .ok_or_else(|| SmsError::MalformedResponse("missing data field".into()))
    }

    /// Resolve one leaf `Condition` into the device set it matches.
    pub async fn resolve_condition(&self, condition: &Condition) -> Result<Vec<DeviceInfo>, SmsError> {
        let use_contains = condition.operator == QueryOperator::Contains && condition.field.supports_contains();
        match &condition.field {
            QueryField::Name => self.devices_by_filter("name", &condition.value, use_contains).await,
            QueryField::Location => self.devices_by_location(&condition.value, use_contains).await,
            QueryField::Role => self.devices_by_filter("role", &condition.value, false).await,
            QueryField::Tag => self.devices_by_filter("tags", &condition.value, false).await,
            QueryField::DeviceType => self.devices_by_filter("device_type", &condition.value, false).await,
            QueryField::Manufacturer => self.devices_by_filter("manufacturer", &condition.value, false).await,
            QueryField::Platform => self.devices_by_filter("platform", &condition.value, false).await,
            QueryField::CustomField(name) => self.devices_by_custom_field(name, &condition.value).await,
        }
    }

    async fn devices_by_filter(
        &self,
        filter_arg: &str,
        value: &str,
        use_contains: bool,
    ) -> Result<Vec<DeviceInfo>, SmsError> {
        let arg = if use_contains {
            format!("{filter_arg}__ire")
        } else {
            filter_arg.to_string()
        };
        let query = format!(
            "query devicesByFilter($filter: [String]) {{ devices({arg}: $filter) {{ {DEVICE_FIELDS} }} }}"
        );
        let data = self
            .graphql(&query, json!({ "filter": [value] }))
            .await?;
        let devices = data
            .get("devices")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(devices.into_iter().filter_map(parse_device).collect())
    }

    async fn devices_by_location(&self, value: &str, use_contains: bool) -> Result<Vec<DeviceInfo>, SmsError> {
        let arg = if use_contains { "name__ire" } else { "name" };
        let query = format!(
            "query devicesByLocation($filter: [String]) {{ locations({arg}: $filter) {{ devices {{ {DEVICE_FIELDS} }} }} }}"
        );
        let data = self
            .graphql(&query, json!({ "filter": [value] }))
            .await?;
        let locations = data
            .get("locations")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let devices = locations
            .into_iter()
            .filter_map(|loc| loc.get("devices").and_then(Value::as_array).cloned())
            .flatten()
            .filter_map(parse_device)
            .collect();
        Ok(devices)
    }

    async fn devices_by_custom_field(&self, name: &str, value: &str) -> Result<Vec<DeviceInfo>, SmsError> {
        let cf_arg = format!("cf_{name}");
        let query = format!(
            "query devicesByCustomField($filter: String) {{ devices({cf_arg}: $filter) {{ {DEVICE_FIELDS} }} }}"
        );
        let data = self.graphql(&query, json!({ "filter": value })).await?;
        let devices = data
            .get("devices")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(devices.into_iter().filter_map(parse_device).collect())
    }

    /// Submit one onboarding job for a Cisco device. Returns the SMS job
    /// identifier. This is a REST call rather than a GraphQL mutation — the
    /// onboarding plugin this talks to exposes a job-queue endpoint, not a
    /// mutation in the read schema above.
    #[instrument(skip(self, fields))]
    pub async fn submit_onboarding_job(&self, fields: &OnboardingFields) -> Result<String, SmsError> {
        let payload = json!({
            "ip_addresses": [fields.ip],
            "location": fields.location,
            "namespace": fields.namespace,
            "role": fields.role,
            "status": fields.status,
            "interface_status": fields.interface_status,
            "ip_status": fields.ip_status,
            "platform": if fields.platform.eq_ignore_ascii_case("detect") { None } else { Some(fields.platform.as_str()) },
            "port": fields.port,
            "timeout": fields.timeout,
        });
        let response = self
            .http
            .post(format!(
                "{}/api/extras/jobs/sync-devices-from-network/run/",
                self.base_url.trim_end_matches('/')
            ))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SmsError::OnboardingRejected(format!("{status}: {body}")));
        }

        let body: Value = response.json().await?;
        body.get("job_id")
            .or_else(|| body.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SmsError::MalformedResponse("missing job_id in onboarding response".into()))
    }
}

#[derive(Debug, Clone)]
pub struct OnboardingFields {
    pub ip: String,
    pub location: String,
    pub namespace: String,
    pub role: String,
    pub status: String,
    pub interface_status: String,
    pub ip_status: String,
    pub platform: String,
    pub port: u16,
    pub timeout: u32,
}

const DEVICE_FIELDS: &str = "id name primary_ip4 { address } status { name } device_type { model } \
    role { name } location { name } tags { name } platform { name }";

fn parse_device(raw: Value) -> Option<DeviceInfo> {
    let id = raw.get("id")?.as_str()?.to_string();
    let name = raw.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
    let primary_ip4 = nested_string(&raw, "primary_ip4", "address");
    let status = nested_string(&raw, "status", "name");
    let device_type = nested_string(&raw, "device_type", "model");
    let role = nested_string(&raw, "role", "name");
    let location = nested_string(&raw, "location", "name");
    let platform = nested_string(&raw, "platform", "name");
    let tags = raw
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(DeviceInfo {
        id,
        name,
        primary_ip4,
        status,
        device_type,
        role,
        location,
        platform,
        manufacturer: None,
        tags,
    })
}

fn nested_string(raw: &Value, key: &str, field: &str) -> Option<String> {
    raw.get(key)?.get(field)?.as_str().map(str::to_string)
}

/// Recursive boolean evaluation, keyed on device id for set semantics.
pub async fn evaluate_condition_set(
    client: &SmsClient,
    condition: &Condition,
    operations_executed: &mut usize,
) -> Result<HashMap<String, DeviceInfo>, SmsError> {
    let devices = client.resolve_condition(condition).await?;
    *operations_executed += 1;
    Ok(devices.into_iter().map(|d| (d.id.clone(), d)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_device_handles_missing_nested_fields() {
        let raw = json!({
            "id": "dev-1",
            "name": "core-r1",
            "tags": [{"name": "site:dc1"}],
        });
        let device = parse_device(raw).unwrap();
        assert_eq!(device.id, "dev-1");
        assert_eq!(device.primary_ip4, None);
        assert_eq!(device.tags, vec!["site:dc1".to_string()]);
    }
}
