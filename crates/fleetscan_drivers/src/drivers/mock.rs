use crate::{ClassifierDriver, ClassifierSession, DeviceFacts, DriverError, DriverTarget};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Clone)]
pub enum MockResponse {
    Facts(DeviceFacts),
    Fail,
}

/// A classifier driver whose behavior per host is fixed ahead of time by
/// the test. Stands in for `fleetscan_drivers::drivers::{ios, nxos_ssh,
/// iosxr}` so the scan subsystem's per-host algorithm can be exercised
/// without real SSH connectivity.
pub struct MockClassifierDriver {
    name: &'static str,
    responses: Mutex<HashMap<String, MockResponse>>,
}

impl MockClassifierDriver {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            responses: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_response(self, host: impl Into<String>, response: MockResponse) -> Self {
        self.responses.lock().unwrap().insert(host.into(), response);
        self
    }
}

#[async_trait]
impl ClassifierDriver for MockClassifierDriver {
    fn driver_name(&self) -> &'static str {
        self.name
    }

    async fn connect(&self, target: &DriverTarget) -> Result<Box<dyn ClassifierSession>, DriverError> {
        match self.responses.lock().unwrap().get(&target.host) {
            Some(MockResponse::Facts(facts)) => Ok(Box::new(MockSession {
                facts: facts.clone(),
            })),
            Some(MockResponse::Fail) | None => Err(DriverError::AuthFailed(format!(
                "mock driver '{}' has no match for {}",
                self.name, target.host
            ))),
        }
    }
}

struct MockSession {
    facts: DeviceFacts,
}

#[async_trait]
impl ClassifierSession for MockSession {
    async fn facts(&mut self) -> Result<DeviceFacts, DriverError> {
        Ok(DeviceFacts {
            hostname: self.facts.hostname.clone(),
        })
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}
