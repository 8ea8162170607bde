use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::user::{CreateUserRequest, GetUserResponse};
use crate::error::Result;
use crate::reconcile::ids::{resolve, ResourceIds, ID, ORGANIZATION_ID};
use crate::reconcile::patch::{reconcile_order, ResourceGrant, SubResource, UserRoles};
use crate::schema::audit::Audit;

pub static ORGANIZATION_OWNER: &str = "organizationOwner";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct User {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub name: Option<String>,
    pub email: String,
    pub status: Option<String>,
    pub inactive: Option<bool>,
    pub organization_roles: Vec<String>,
    pub last_login: Option<String>,
    pub region: Option<String>,
    pub time_zone: Option<String>,
    pub enable_notifications: Option<bool>,
    pub expires_at: Option<String>,
    pub resources: Option<Vec<UserResource>>,
    pub audit: Option<Audit>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct UserResource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub roles: Vec<String>,
}

impl User {
    pub fn ids(&self) -> Result<ResourceIds> {
        resolve(
            &[(ID, self.id.as_deref()), (ORGANIZATION_ID, self.organization_id.as_deref())],
            ID,
        )
    }

    pub fn is_organization_owner(&self) -> bool {
        self.organization_roles.iter().any(|role| role == ORGANIZATION_OWNER)
    }

    /// The role assignments the patch builder diffs.
    pub fn roles(&self) -> UserRoles {
        UserRoles {
            organization_roles: self.organization_roles.clone(),
            resources: self
                .resources
                .iter()
                .flatten()
                .map(|r| SubResource {
                    id: r.id.clone(),
                    resource_type: r.resource_type.clone(),
                    roles: r.roles.clone(),
                })
                .collect(),
        }
    }

    pub fn to_create_request(&self) -> CreateUserRequest {
        CreateUserRequest {
            name: self.name.clone(),
            email: self.email.clone(),
            organization_roles: self.organization_roles.clone(),
            resources: self.roles().resources.iter().map(ResourceGrant::from).collect(),
        }
    }

    pub fn from_response(user: GetUserResponse) -> Self {
        let resources: Vec<UserResource> = user
            .resources
            .into_iter()
            .map(|r| UserResource { id: r.id, resource_type: r.resource_type, roles: r.roles })
            .collect();

        User {
            id: Some(user.id),
            organization_id: Some(user.organization_id),
            name: user.name,
            email: user.email,
            status: Some(user.status),
            inactive: Some(user.inactive),
            organization_roles: user.organization_roles,
            last_login: Some(user.last_login),
            region: Some(user.region),
            time_zone: Some(user.time_zone),
            enable_notifications: Some(user.enable_notifications),
            expires_at: Some(user.expires_at),
            resources: Some(resources).filter(|r| !r.is_empty()),
            audit: Some(user.audit.into()),
        }
    }

    /// Undo API reordering against a prior snapshot. Organization owners
    /// hold every resource implicitly, so their planned list is kept as is.
    pub fn merge_prior(&mut self, prior: &User) {
        self.organization_roles = reconcile_order(&prior.organization_roles, &self.organization_roles);

        if self.is_organization_owner() && prior.resources.is_some() {
            self.resources = prior.resources.clone();
            return;
        }

        let (Some(remote), Some(planned)) = (self.resources.as_mut(), prior.resources.as_ref()) else {
            return;
        };
        remote.sort_by_key(|r| planned.iter().position(|p| p.id == r.id).unwrap_or(usize::MAX));
        for resource in remote.iter_mut() {
            if let Some(previous) = planned.iter().find(|p| p.id == resource.id) {
                resource.roles = reconcile_order(&previous.roles, &resource.roles);
                if resource.resource_type.is_none() {
                    resource.resource_type = previous.resource_type.clone();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_keeps_planned_resources() {
        let prior = User {
            organization_roles: vec![ORGANIZATION_OWNER.into()],
            resources: Some(vec![UserResource { id: "p1".into(), resource_type: None, roles: vec!["projectViewer".into()] }]),
            ..Default::default()
        };
        let mut refreshed = User {
            organization_roles: vec![ORGANIZATION_OWNER.into()],
            resources: None,
            ..Default::default()
        };

        refreshed.merge_prior(&prior);

        assert_eq!(refreshed.resources, prior.resources);
    }

    #[test]
    fn create_request_defaults_resource_type() {
        let user = User {
            email: "a@b.c".into(),
            organization_roles: vec!["organizationMember".into()],
            resources: Some(vec![UserResource { id: "p1".into(), resource_type: None, roles: vec!["projectViewer".into()] }]),
            ..Default::default()
        };

        let request = user.to_create_request();

        assert_eq!(request.resources[0].resource_type, "project");
    }
}
