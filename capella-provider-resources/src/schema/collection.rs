use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::collection::GetCollectionResponse;
use crate::error::Result;
use crate::reconcile::ids::{resolve, ResourceIds, CLUSTER_ID, ORGANIZATION_ID, PROJECT_ID};
use crate::schema::scope::{BUCKET_ID, SCOPE_NAME};

pub static COLLECTION_NAME: &str = "collection_name";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Collection {
    pub collection_name: Option<String>,
    /// Seconds a document lives, 0 for the bucket default.
    pub max_ttl: Option<i64>,
    pub scope_name: Option<String>,
    pub bucket_id: Option<String>,
    pub cluster_id: Option<String>,
    pub project_id: Option<String>,
    pub organization_id: Option<String>,
}

impl Collection {
    pub fn ids(&self) -> Result<ResourceIds> {
        resolve(
            &[
                (COLLECTION_NAME, self.collection_name.as_deref()),
                (SCOPE_NAME, self.scope_name.as_deref()),
                (BUCKET_ID, self.bucket_id.as_deref()),
                (CLUSTER_ID, self.cluster_id.as_deref()),
                (PROJECT_ID, self.project_id.as_deref()),
                (ORGANIZATION_ID, self.organization_id.as_deref()),
            ],
            COLLECTION_NAME,
        )
    }

    pub fn from_response(collection: GetCollectionResponse, ids: &ResourceIds) -> Result<Self> {
        Ok(Collection {
            collection_name: Some(match collection.name {
                Some(name) => name,
                None => ids.value(COLLECTION_NAME)?.to_string(),
            }),
            max_ttl: collection.max_ttl,
            scope_name: Some(ids.value(SCOPE_NAME)?.to_string()),
            bucket_id: Some(ids.value(BUCKET_ID)?.to_string()),
            cluster_id: Some(ids.value(CLUSTER_ID)?.to_string()),
            project_id: Some(ids.value(PROJECT_ID)?.to_string()),
            organization_id: Some(ids.value(ORGANIZATION_ID)?.to_string()),
        })
    }
}
