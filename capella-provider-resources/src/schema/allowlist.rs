use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::allowlist::GetAllowListResponse;
use crate::error::Result;
use crate::reconcile::ids::{resolve, ResourceIds, CLUSTER_ID, ID, ORGANIZATION_ID, PROJECT_ID};
use crate::schema::audit::Audit;

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct AllowList {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub cluster_id: Option<String>,
    pub cidr: String,
    pub comment: Option<String>,
    pub expires_at: Option<String>,
    pub audit: Option<Audit>,
}

impl AllowList {
    pub fn ids(&self) -> Result<ResourceIds> {
        resolve(
            &[
                (ID, self.id.as_deref()),
                (ORGANIZATION_ID, self.organization_id.as_deref()),
                (PROJECT_ID, self.project_id.as_deref()),
                (CLUSTER_ID, self.cluster_id.as_deref()),
            ],
            ID,
        )
    }

    pub fn from_response(allowlist: GetAllowListResponse, ids: &ResourceIds) -> Result<Self> {
        Ok(AllowList {
            id: Some(allowlist.id),
            organization_id: Some(ids.value(ORGANIZATION_ID)?.to_string()),
            project_id: Some(ids.value(PROJECT_ID)?.to_string()),
            cluster_id: Some(ids.value(CLUSTER_ID)?.to_string()),
            cidr: allowlist.cidr,
            comment: allowlist.comment,
            expires_at: allowlist.expires_at,
            audit: Some(allowlist.audit.into()),
        })
    }
}
