//! Wire types for the AppRun application API.
//!
//! Optional fields are skipped when absent; request bodies never carry
//! explicit `null`s. On PATCH a missing field leaves the server value as is.

use serde::{Deserialize, Serialize};

/// Body of `POST applications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateApplicationRequest {
    pub name: String,
    pub timeout_seconds: i64,
    pub port: i64,
    pub min_scale: i64,
    pub max_scale: i64,
    pub components: Vec<ComponentSpec>,
}

/// Body of `PATCH applications/{id}`.
///
/// `id` addresses the application in the URL path and is never part of the
/// serialized payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchApplicationRequest {
    #[serde(skip_serializing)]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_scale: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scale: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentSpec>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    /// vCPU limit as the API spells it (`"0.1"` .. `"1"`).
    pub max_cpu: String,
    /// Memory limit (`"256Mi"`, `"512Mi"`, `"1Gi"`, `"2Gi"`).
    pub max_memory: String,
    pub deploy_source: DeploySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvVar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<Probe>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploySource {
    pub container_registry: ContainerRegistry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRegistry {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_get: Option<HttpGetProbe>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpGetProbe {
    pub path: String,
    pub port: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<ProbeHeader>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeHeader {
    pub name: String,
    pub value: String,
}

impl ProbeHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An application as returned by create, patch and get-by-id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub timeout_seconds: i64,
    #[serde(default)]
    pub port: i64,
    #[serde(default)]
    pub min_scale: i64,
    #[serde(default)]
    pub max_scale: i64,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub public_url: String,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, alias = "update_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Response of `GET applications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationList {
    #[serde(default)]
    pub data: Vec<ApplicationSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub public_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Packet filter of an application; used both as the PATCH body and as its
/// response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketFilter {
    pub is_enabled: bool,
    #[serde(default)]
    pub settings: Vec<PacketFilterSetting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketFilterSetting {
    pub from_ip: String,
    pub from_ip_prefix_length: u8,
}

/// Error envelope the API returns with 4xx/5xx responses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    #[serde(default, rename = "_log_url")]
    pub log_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorItem {
    pub domain: String,
    pub reason: String,
    pub message: String,
    pub location_type: String,
    pub location: String,
}
