use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::token::TokenStatus;

/// Kubernetes-style list returned by the upstream listing endpoints.
///
/// Items are kept as raw JSON; only the fields used for filtering are read.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<Value>,
    #[serde(default)]
    pub metadata: ListMetadata,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl ResourceList {
    /// Same list envelope, different items.
    pub fn with_items(&self, items: Vec<Value>) -> Self {
        Self {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            items,
            metadata: self.metadata.clone(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `metadata.name` of a project or application.
pub fn resource_name(item: &Value) -> Option<&str> {
    item.pointer("/metadata/name").and_then(Value::as_str)
}

/// `spec.project` of an application.
pub fn application_project(item: &Value) -> Option<&str> {
    item.pointer("/spec/project").and_then(Value::as_str)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthState,
    pub timestamp: Timestamp,
    pub token_status: TokenStatus,
    #[serde(rename = "upstreamApiStatus")]
    pub upstream: String,
}
