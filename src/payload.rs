//! Wire payloads shared by the poller and the endpoint cache
//!
//! Payloads that are "one of several shapes" are modelled as closed enums with
//! an explicit fallback variant, so an unrecognised tag from a newer API
//! version never fails deserialization outright.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Error detail reported by the management API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Extract the detail from a response body, either `{"error": {..}}` or a bare detail
    pub fn from_body(body: &[u8]) -> Option<Self> {
        if body.is_empty() {
            return None;
        }
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
            return Some(envelope.error);
        }
        serde_json::from_slice::<ErrorDetail>(body)
            .ok()
            .filter(|d| !d.code.is_empty() || !d.message.is_empty())
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code.is_empty(), self.message.is_empty()) {
            (true, true) => f.write_str("no error detail was returned"),
            (false, true) => f.write_str(&self.code),
            (true, false) => f.write_str(&self.message),
            (false, false) => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Provisioning or operation status as reported by the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningState {
    Succeeded,
    Failed,
    Canceled,
    Accepted,
    Creating,
    Updating,
    Deleting,
    InProgress,
    /// A state this crate doesn't know; treated as still in progress
    Other(String),
}

impl ProvisioningState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

impl From<&str> for ProvisioningState {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            "accepted" => Self::Accepted,
            "creating" => Self::Creating,
            "updating" => Self::Updating,
            "deleting" => Self::Deleting,
            "inprogress" | "running" => Self::InProgress,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for ProvisioningState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// Body of an `Azure-AsyncOperation` status document
#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatus {
    pub status: ProvisioningState,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
    #[serde(default, rename = "percentComplete")]
    pub percent_complete: Option<f64>,
}

/// Envelope fields common to tracked resources
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tracked<P> {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    pub properties: P,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultProperties {
    #[serde(default)]
    pub vault_uri: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub provisioning_state: Option<ProvisioningState>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StorageEndpoints {
    #[serde(default)]
    pub blob: Option<String>,
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountProperties {
    #[serde(default)]
    pub primary_endpoints: Option<StorageEndpoints>,
    #[serde(default)]
    pub provisioning_state: Option<ProvisioningState>,
}

/// A resource body, discriminated by its `type` field
#[derive(Debug, Clone, PartialEq)]
pub enum ResourcePayload {
    KeyVault(Tracked<VaultProperties>),
    StorageAccount(Tracked<StorageAccountProperties>),
    Unknown { resource_type: String, raw: Value },
}

impl ResourcePayload {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let resource_type = value
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        if resource_type.eq_ignore_ascii_case("Microsoft.KeyVault/vaults") {
            return Ok(Self::KeyVault(serde_json::from_value(value)?));
        }
        if resource_type.eq_ignore_ascii_case("Microsoft.Storage/storageAccounts") {
            return Ok(Self::StorageAccount(serde_json::from_value(value)?));
        }

        Ok(Self::Unknown {
            resource_type,
            raw: value,
        })
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::KeyVault(v) => Some(&v.id),
            Self::StorageAccount(s) => Some(&s.id),
            Self::Unknown { raw, .. } => raw.get("id").and_then(|v| v.as_str()),
        }
    }

    /// The data-plane endpoint for known shapes
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::KeyVault(v) => v.properties.vault_uri.as_deref(),
            Self::StorageAccount(s) => s
                .properties
                .primary_endpoints
                .as_ref()
                .and_then(|e| e.blob.as_deref()),
            Self::Unknown { .. } => None,
        }
    }

    /// Endpoint lookup that falls back to a JSON pointer for shapes this crate doesn't model
    pub fn endpoint_or(&self, pointer: Option<&str>) -> Option<String> {
        if let Some(endpoint) = self.endpoint() {
            return Some(endpoint.to_string());
        }
        match (self, pointer) {
            (Self::Unknown { raw, .. }, Some(pointer)) => raw
                .pointer(pointer)
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        }
    }

    pub fn provisioning_state(&self) -> Option<ProvisioningState> {
        match self {
            Self::KeyVault(v) => v.properties.provisioning_state.clone(),
            Self::StorageAccount(s) => s.properties.provisioning_state.clone(),
            Self::Unknown { raw, .. } => provisioning_state_of(raw),
        }
    }
}

impl<'de> Deserialize<'de> for ResourcePayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Read `properties.provisioningState` from an arbitrary resource body
pub fn provisioning_state_of(body: &Value) -> Option<ProvisioningState> {
    body.pointer("/properties/provisioningState")
        .and_then(|v| v.as_str())
        .map(ProvisioningState::from)
}
