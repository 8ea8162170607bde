use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit block attached to most Capella entities.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouchbaseAuditData {
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_by: String,
    #[serde(default)]
    pub version: i64,
}
