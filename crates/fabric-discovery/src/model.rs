//! Discovery data models

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Metadata key under which a server announces its worker-pool width
pub const THREADS_METADATA_KEY: &str = "threads";

/// A live network endpoint of a logical service.
///
/// Endpoints are immutable; a change of address or metadata is a new
/// registration.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoint {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ServiceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_payload(host: impl Into<String>, port: u16, payload: ServicePayload) -> Self {
        Self {
            host: host.into(),
            port,
            metadata: payload.into_inner(),
        }
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for HTTP calls against this endpoint
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Metadata a server attaches to its registration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePayload(BTreeMap<String, String>);

impl ServicePayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

/// What a server publishes about itself when it comes up
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub metadata: BTreeMap<String, String>,
}

impl Announcement {
    pub fn new(service_name: &str, host: &str, port: u16, payload: ServicePayload) -> Self {
        Self {
            service_name: service_name.to_string(),
            host: host.to_string(),
            port,
            metadata: payload.into_inner(),
        }
    }

    pub fn endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint {
            host: self.host.clone(),
            port: self.port,
            metadata: self.metadata.clone(),
        }
    }
}
