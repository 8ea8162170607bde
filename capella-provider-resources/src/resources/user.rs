use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use schemars::{schema_for, Schema};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use capella_provider_common::telemetry::{debug, warn};

use crate::api::user::{CreateUserResponse, GetUserResponse};
use crate::api::Payload;
use crate::error::{ProviderError, Result};
use crate::provider::context::Context;
use crate::provider::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest, ImportStateResponse,
    ReadRequest, ReadResponse, State, UpdateRequest, UpdateResponse,
};
use crate::provider::traits::{import_state_passthrough_id, Resource, ResourceWithImportState};
use crate::reconcile::ids::{ResourceIds, ID, ORGANIZATION_ID};
use crate::reconcile::patch::build_patch;
use crate::resources::utils::{configured, delete, get, remove_if_not_found, required, send};
use crate::schema::user::User;

#[derive(Default)]
pub struct UserResource {
    ctx: Option<Arc<Context>>,
}

fn users_path(organization_id: &str) -> String {
    format!("/v4/organizations/{organization_id}/users")
}

fn user_path(ids: &ResourceIds) -> Result<String> {
    Ok(format!("{}/{}", users_path(ids.value(ORGANIZATION_ID)?), ids.value(ID)?))
}

async fn refresh(ctx: &Context, cancel: &CancellationToken, ids: &ResourceIds) -> Result<User> {
    let user: GetUserResponse = get(ctx, cancel, &user_path(ids)?).await?.json()?;
    Ok(User::from_response(user))
}

fn validate_create(plan: &User) -> Result<()> {
    if plan.email.is_empty() {
        return Err(ProviderError::validation("email must be set to create a user"));
    }
    if plan.organization_roles.is_empty() {
        return Err(ProviderError::validation("organization_roles must hold at least one role"));
    }
    Ok(())
}

#[async_trait]
impl Resource for UserResource {
    fn type_suffix(&self) -> &'static str {
        "user"
    }

    fn schema(&self) -> Schema {
        schema_for!(User)
    }

    fn configure(&mut self, ctx: Arc<Context>) {
        self.ctx = Some(ctx);
    }

    async fn create(&self, req: &CreateRequest, resp: &mut CreateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: User = req.plan.get()?;
        let organization_id = required(&plan.organization_id, ORGANIZATION_ID)?;
        validate_create(&plan)?;

        let created: CreateUserResponse = send(
            ctx,
            &req.cancel,
            Method::POST,
            &users_path(organization_id),
            StatusCode::CREATED,
            Payload::json(&plan.to_create_request())?,
            &[],
        )
        .await?
        .json()?;

        let ids = ResourceIds::new().with(ID, created.id).with(ORGANIZATION_ID, organization_id);
        let mut user = refresh(ctx, &req.cancel, &ids).await?;
        user.merge_prior(&plan);
        resp.state.set(&user)
    }

    async fn read(&self, req: &ReadRequest, resp: &mut ReadResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: User = req.state.get()?;
        let ids = state.ids()?;

        let Some(mut user) = remove_if_not_found(refresh(ctx, &req.cancel, &ids).await, resp)? else {
            return Ok(());
        };
        user.merge_prior(&state);
        resp.state.set(&user)
    }

    async fn update(&self, req: &UpdateRequest, resp: &mut UpdateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: User = req.plan.get()?;
        let state: User = req.state.get()?;
        let ids = state.ids()?;

        let patch = build_patch(&state.roles(), &plan.roles());
        debug!(event = "UserPatch", user = ids.value(ID)?, entries = patch.len());

        if !patch.is_empty() {
            let patched = send(
                ctx,
                &req.cancel,
                Method::PATCH,
                &user_path(&ids)?,
                StatusCode::OK,
                Payload::json(&patch)?,
                &[],
            )
            .await;

            if let Err(e) = patched {
                if e.is_not_found() {
                    warn!(event = "RemovedFromState", user = ids.value(ID)?, reason = "user no longer exists");
                    resp.state.remove();
                }
                return Err(e);
            }
        }

        let mut user = refresh(ctx, &req.cancel, &ids).await?;
        user.merge_prior(&plan);
        resp.state.set(&user)
    }

    async fn delete(&self, req: &DeleteRequest, _resp: &mut DeleteResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: User = req.state.get()?;
        let ids = state.ids()?;

        delete(ctx, &req.cancel, &user_path(&ids)?, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for UserResource {
    async fn import_state(&self, req: &ImportStateRequest, resp: &mut ImportStateResponse) -> Result<()> {
        import_state_passthrough_id(ID, req, resp)
    }

    fn identifiers(&self, state: &State) -> Result<ResourceIds> {
        state.get::<User>()?.ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_email_and_roles() {
        let mut user = User { organization_roles: vec!["organizationMember".into()], ..Default::default() };
        assert!(validate_create(&user).is_err());

        user.email = "a@b.c".into();
        assert!(validate_create(&user).is_ok());

        user.organization_roles.clear();
        assert!(validate_create(&user).is_err());
    }
}
