use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::project::GetProjectResponse;
use crate::schema::audit::Audit;

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Projects {
    pub organization_id: String,
    pub data: Vec<ProjectData>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ProjectData {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub description: String,
    pub audit: Audit,
}

impl ProjectData {
    pub fn from_response(project: GetProjectResponse, organization_id: &str) -> Self {
        ProjectData {
            id: project.id,
            organization_id: organization_id.to_string(),
            name: project.name,
            description: project.description,
            audit: project.audit.into(),
        }
    }
}
