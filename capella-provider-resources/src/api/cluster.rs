use serde::{Deserialize, Serialize};

use crate::api::audit::CouchbaseAuditData;

/// Cluster states after which Capella stops transitioning on its own.
pub static FINAL_STATES: [&str; 8] = [
    "healthy",
    "degraded",
    "deploymentFailed",
    "destroyFailed",
    "peeringFailed",
    "rebalanceFailed",
    "scaleFailed",
    "upgradeFailed",
];

pub static HEALTHY: &str = "healthy";

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct CloudProvider {
    #[serde(rename = "type")]
    pub provider_type: String,
    pub region: String,
    #[serde(default)]
    pub cidr: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct CouchbaseServer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Compute {
    pub cpu: i64,
    pub ram: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    #[serde(rename = "type")]
    pub disk_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoexpansion: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Node {
    pub compute: Compute,
    pub disk: Disk,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceGroup {
    pub node: Node,
    pub num_of_nodes: i64,
    #[serde(default)]
    pub services: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Availability {
    #[serde(rename = "type")]
    pub availability_type: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Support {
    pub plan: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timezone: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cloud_provider: CloudProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub couchbase_server: Option<CouchbaseServer>,
    pub service_groups: Vec<ServiceGroup>,
    pub availability: Availability,
    pub support: Support,
    pub configuration_type: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterRequest {
    pub name: String,
    pub description: String,
    pub support: Support,
    pub service_groups: Vec<ServiceGroup>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CreateClusterResponse {
    pub id: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetClusterResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub app_service_id: Option<String>,
    pub cloud_provider: CloudProvider,
    #[serde(default)]
    pub couchbase_server: CouchbaseServer,
    #[serde(default)]
    pub service_groups: Vec<ServiceGroup>,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub support: Support,
    #[serde(default)]
    pub configuration_type: String,
    pub current_state: String,
    #[serde(default)]
    pub audit: CouchbaseAuditData,
    #[serde(skip)]
    pub etag: Option<String>,
}
