use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    pub name: String,
    #[serde(rename = "maxTTL", skip_serializing_if = "Option::is_none")]
    pub max_ttl: Option<i64>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct UpdateCollectionRequest {
    #[serde(rename = "maxTTL")]
    pub max_ttl: i64,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct GetCollectionResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "maxTTL", default)]
    pub max_ttl: Option<i64>,
}
