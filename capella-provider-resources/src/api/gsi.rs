use serde::{Deserialize, Serialize};

pub static READY: &str = "Ready";

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IndexDdlRequest {
    pub definition: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct QueryError {
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct IndexDdlResponse {
    #[serde(default)]
    pub errors: Option<Vec<QueryError>>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinitionResponse {
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub index_name: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub sec_exprs: Vec<String>,
    #[serde(default)]
    pub partition_by: Option<String>,
    #[serde(rename = "where", default)]
    pub where_clause: Option<String>,
    #[serde(default)]
    pub num_replica: i64,
    #[serde(default)]
    pub num_partition: i64,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct IndexBuildStatusResponse {
    pub status: String,
}
