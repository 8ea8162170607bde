use serde::{Deserialize, Serialize};

use crate::api::audit::CouchbaseAuditData;

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateAllowListRequest {
    pub cidr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CreateAllowListResponse {
    pub id: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetAllowListResponse {
    pub id: String,
    pub cidr: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub audit: CouchbaseAuditData,
}
