use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::scope::GetScopeResponse;
use crate::error::Result;
use crate::reconcile::ids::{resolve, ResourceIds, CLUSTER_ID, ORGANIZATION_ID, PROJECT_ID};

pub static SCOPE_NAME: &str = "scope_name";
pub static BUCKET_ID: &str = "bucket_id";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Scope {
    pub scope_name: Option<String>,
    pub bucket_id: Option<String>,
    pub cluster_id: Option<String>,
    pub project_id: Option<String>,
    pub organization_id: Option<String>,
    /// Collections of the scope, sorted by name.
    pub collections: Option<Vec<ScopeCollection>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
pub struct ScopeCollection {
    pub name: String,
    pub max_ttl: Option<i64>,
}

impl Scope {
    pub fn ids(&self) -> Result<ResourceIds> {
        resolve(
            &[
                (SCOPE_NAME, self.scope_name.as_deref()),
                (BUCKET_ID, self.bucket_id.as_deref()),
                (CLUSTER_ID, self.cluster_id.as_deref()),
                (PROJECT_ID, self.project_id.as_deref()),
                (ORGANIZATION_ID, self.organization_id.as_deref()),
            ],
            SCOPE_NAME,
        )
    }

    pub fn from_response(scope: GetScopeResponse, ids: &ResourceIds) -> Result<Self> {
        let mut collections: Vec<ScopeCollection> = scope
            .collections
            .unwrap_or_default()
            .into_iter()
            .map(|c| ScopeCollection { name: c.name.unwrap_or_default(), max_ttl: c.max_ttl })
            .collect();
        collections.sort();

        Ok(Scope {
            scope_name: Some(match scope.name {
                Some(name) => name,
                None => ids.value(SCOPE_NAME)?.to_string(),
            }),
            bucket_id: Some(ids.value(BUCKET_ID)?.to_string()),
            cluster_id: Some(ids.value(CLUSTER_ID)?.to_string()),
            project_id: Some(ids.value(PROJECT_ID)?.to_string()),
            organization_id: Some(ids.value(ORGANIZATION_ID)?.to_string()),
            collections: Some(collections),
        })
    }
}
