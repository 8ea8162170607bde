use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::audit::CouchbaseAuditData;

/// Read-only audit attributes of an entity.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct Audit {
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: String,
    pub version: i64,
}

impl From<CouchbaseAuditData> for Audit {
    fn from(audit: CouchbaseAuditData) -> Self {
        Audit {
            created_at: audit.created_at,
            created_by: audit.created_by,
            modified_at: audit.modified_at,
            modified_by: audit.modified_by,
            version: audit.version,
        }
    }
}
