use serde::{Deserialize, Serialize};

use crate::api::audit::CouchbaseAuditData;

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ApiKeyResource {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub organization_roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "allowedCIDRs", skip_serializing_if = "Option::is_none")]
    pub allowed_cidrs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<ApiKeyResource>>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CreateApiKeyResponse {
    pub id: String,
    pub token: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetApiKeyResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "allowedCIDRs", default)]
    pub allowed_cidrs: Vec<String>,
    #[serde(default)]
    pub organization_roles: Vec<String>,
    #[serde(default)]
    pub resources: Vec<ApiKeyResource>,
    #[serde(default)]
    pub expiry: f64,
    #[serde(default)]
    pub audit: CouchbaseAuditData,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct RotateApiKeyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RotateApiKeyResponse {
    pub secret_key: String,
}
