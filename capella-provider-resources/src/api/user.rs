use serde::{Deserialize, Serialize};

use crate::api::audit::CouchbaseAuditData;
use crate::reconcile::patch::ResourceGrant;

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
    pub organization_roles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceGrant>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CreateUserResponse {
    pub id: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct UserResource {
    pub id: String,
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetUserResponse {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub organization_roles: Vec<String>,
    #[serde(default)]
    pub last_login: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub time_zone: String,
    #[serde(default)]
    pub enable_notifications: bool,
    #[serde(default)]
    pub expires_at: String,
    #[serde(default)]
    pub resources: Vec<UserResource>,
    #[serde(default)]
    pub audit: CouchbaseAuditData,
}
