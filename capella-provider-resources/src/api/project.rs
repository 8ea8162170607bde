use serde::{Deserialize, Serialize};

use crate::api::audit::CouchbaseAuditData;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

pub type UpdateProjectRequest = CreateProjectRequest;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CreateProjectResponse {
    pub id: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct GetProjectResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub audit: CouchbaseAuditData,
    /// Read from the `ETag` response header, never from the body.
    #[serde(skip)]
    pub etag: Option<String>,
}
