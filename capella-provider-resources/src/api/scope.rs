use serde::{Deserialize, Serialize};

use crate::api::collection::GetCollectionResponse;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CreateScopeRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct GetScopeResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub collections: Option<Vec<GetCollectionResponse>>,
}
