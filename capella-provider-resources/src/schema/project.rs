use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::project::GetProjectResponse;
use crate::error::Result;
use crate::reconcile::ids::{resolve, ResourceIds, ID, ORGANIZATION_ID};
use crate::schema::audit::Audit;

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Project {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Version the update must apply to, sent as `If-Match`.
    pub if_match: Option<String>,
    pub etag: Option<String>,
    pub audit: Option<Audit>,
}

impl Project {
    pub fn ids(&self) -> Result<ResourceIds> {
        resolve(
            &[(ID, self.id.as_deref()), (ORGANIZATION_ID, self.organization_id.as_deref())],
            ID,
        )
    }

    pub fn from_response(project: GetProjectResponse, organization_id: &str) -> Self {
        Project {
            id: Some(project.id),
            organization_id: Some(organization_id.to_string()),
            name: project.name,
            description: Some(project.description),
            if_match: None,
            etag: project.etag,
            audit: Some(project.audit.into()),
        }
    }
}
