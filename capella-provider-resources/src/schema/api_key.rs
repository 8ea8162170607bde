use base64::{engine::general_purpose::STANDARD, Engine as _};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::api_key::{ApiKeyResource as ApiResource, GetApiKeyResponse};
use crate::error::Result;
use crate::reconcile::ids::{resolve, ResourceIds, ID, ORGANIZATION_ID};
use crate::reconcile::patch::reconcile_order;
use crate::schema::audit::Audit;

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ApiKey {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Hours until the key expires.
    pub expiry: Option<f64>,
    pub allowed_cidrs: Option<Vec<String>>,
    pub organization_roles: Vec<String>,
    pub resources: Option<Vec<ApiKeyResource>>,
    /// Bumping this number rotates the secret.
    pub rotate: Option<i64>,
    pub secret: Option<String>,
    pub token: Option<String>,
    pub audit: Option<Audit>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ApiKeyResource {
    pub id: String,
    pub roles: Vec<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
}

impl From<&ApiKeyResource> for ApiResource {
    fn from(resource: &ApiKeyResource) -> Self {
        ApiResource {
            id: resource.id.clone(),
            resource_type: resource.resource_type.clone(),
            roles: resource.roles.clone(),
        }
    }
}

impl From<ApiResource> for ApiKeyResource {
    fn from(resource: ApiResource) -> Self {
        ApiKeyResource { id: resource.id, roles: resource.roles, resource_type: resource.resource_type }
    }
}

/// The bearer token of an API key, `base64(id:secret)`.
pub fn encode_token(id: &str, secret: &str) -> String {
    STANDARD.encode(format!("{id}:{secret}"))
}

impl ApiKey {
    pub fn ids(&self) -> Result<ResourceIds> {
        resolve(
            &[(ID, self.id.as_deref()), (ORGANIZATION_ID, self.organization_id.as_deref())],
            ID,
        )
    }

    pub fn from_response(key: GetApiKeyResponse, organization_id: &str) -> Self {
        ApiKey {
            id: Some(key.id),
            organization_id: Some(organization_id.to_string()),
            name: key.name,
            description: Some(key.description),
            expiry: Some(key.expiry),
            allowed_cidrs: Some(key.allowed_cidrs),
            organization_roles: key.organization_roles,
            resources: Some(key.resources.into_iter().map(Into::into).collect()),
            rotate: None,
            secret: None,
            token: None,
            audit: Some(key.audit.into()),
        }
    }

    /// Carry over what the API never returns and undo reordering of role
    /// lists, so a refresh after create or rotate does not show drift.
    pub fn merge_prior(&mut self, prior: &ApiKey) {
        self.rotate = prior.rotate;
        self.secret = prior.secret.clone();
        self.token = prior.token.clone();
        self.organization_roles = reconcile_order(&prior.organization_roles, &self.organization_roles);

        let (Some(remote), Some(planned)) = (self.resources.as_mut(), prior.resources.as_ref()) else {
            return;
        };
        let planned_ids: Vec<String> = planned.iter().map(|r| r.id.clone()).collect();
        let remote_ids: Vec<String> = remote.iter().map(|r| r.id.clone()).collect();
        if reconcile_order(&planned_ids, &remote_ids) != planned_ids {
            return;
        }

        remote.sort_by_key(|r| planned_ids.iter().position(|id| *id == r.id));
        for (resource, previous) in remote.iter_mut().zip(planned) {
            resource.roles = reconcile_order(&previous.roles, &resource.roles);
            if resource.resource_type.is_none() {
                resource.resource_type = previous.resource_type.clone();
            }
        }
    }
}
