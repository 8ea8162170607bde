use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use schemars::{schema_for, Schema};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::api::api_key::{
    CreateApiKeyRequest, CreateApiKeyResponse, GetApiKeyResponse, RotateApiKeyRequest, RotateApiKeyResponse,
};
use crate::api::Payload;
use crate::error::{ProviderError, Result};
use crate::provider::context::Context;
use crate::provider::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest, ImportStateResponse,
    ReadRequest, ReadResponse, State, UpdateRequest, UpdateResponse,
};
use crate::provider::traits::{import_state_passthrough_id, Resource, ResourceWithImportState};
use crate::reconcile::ids::{ResourceIds, ID, ORGANIZATION_ID};
use crate::resources::utils::{configured, delete, get, remove_if_not_found, required, send};
use crate::schema::api_key::{encode_token, ApiKey, ApiKeyResource as Grant};

#[derive(Default)]
pub struct ApiKeyResource {
    ctx: Option<Arc<Context>>,
}

fn api_keys_path(organization_id: &str) -> String {
    format!("/v4/organizations/{organization_id}/apikeys")
}

fn api_key_path(ids: &ResourceIds) -> Result<String> {
    Ok(format!("{}/{}", api_keys_path(ids.value(ORGANIZATION_ID)?), ids.value(ID)?))
}

async fn refresh(ctx: &Context, cancel: &CancellationToken, ids: &ResourceIds) -> Result<ApiKey> {
    let key: GetApiKeyResponse = get(ctx, cancel, &api_key_path(ids)?).await?.json()?;
    Ok(ApiKey::from_response(key, ids.value(ORGANIZATION_ID)?))
}

fn same_roles(planned: &[String], stored: &[String]) -> bool {
    let mut planned = planned.to_vec();
    let mut stored = stored.to_vec();
    planned.sort();
    stored.sort();
    planned == stored
}

/// Unset optional attributes in the plan keep whatever the API filled in.
fn keeps<T: PartialEq>(planned: &Option<T>, stored: &Option<T>) -> bool {
    planned.is_none() || planned == stored
}

fn same_resources(planned: &[Grant], stored: &[Grant]) -> bool {
    planned.len() == stored.len()
        && planned.iter().all(|p| {
            stored.iter().any(|s| {
                s.id == p.id && same_roles(&p.roles, &s.roles) && keeps(&p.resource_type, &s.resource_type)
            })
        })
}

/// Check that an update only asks for a rotation, and that the rotation
/// counter moved forward.
fn check_rotation(plan: &ApiKey, state: &ApiKey) -> Result<i64> {
    let rotate = plan
        .rotate
        .ok_or_else(|| ProviderError::validation("rotate must be set to rotate an api key"))?;
    if rotate <= state.rotate.unwrap_or(0) {
        return Err(ProviderError::validation(format!(
            "rotate value {rotate} must be greater than the previous value {}",
            state.rotate.unwrap_or(0),
        )));
    }

    let resources_kept = match (&plan.resources, &state.resources) {
        (None, _) => true,
        (Some(planned), Some(stored)) => same_resources(planned, stored),
        (Some(planned), None) => planned.is_empty(),
    };
    let unchanged = plan.name == state.name
        && same_roles(&plan.organization_roles, &state.organization_roles)
        && keeps(&plan.description, &state.description)
        && keeps(&plan.allowed_cidrs, &state.allowed_cidrs)
        && keeps(&plan.expiry, &state.expiry)
        && resources_kept;
    if !unchanged {
        return Err(ProviderError::validation(
            "api keys cannot be updated, only rotated. Changes to other attributes require replacement",
        ));
    }
    Ok(rotate)
}

#[async_trait]
impl Resource for ApiKeyResource {
    fn type_suffix(&self) -> &'static str {
        "apikey"
    }

    fn schema(&self) -> Schema {
        schema_for!(ApiKey)
    }

    fn configure(&mut self, ctx: Arc<Context>) {
        self.ctx = Some(ctx);
    }

    async fn create(&self, req: &CreateRequest, resp: &mut CreateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: ApiKey = req.plan.get()?;
        let organization_id = required(&plan.organization_id, ORGANIZATION_ID)?;

        let body = CreateApiKeyRequest {
            name: plan.name.clone(),
            organization_roles: plan.organization_roles.clone(),
            description: plan.description.clone(),
            allowed_cidrs: plan.allowed_cidrs.clone(),
            expiry: plan.expiry,
            resources: plan
                .resources
                .as_ref()
                .map(|resources| resources.iter().map(Into::into).collect()),
        };
        let created: CreateApiKeyResponse = send(
            ctx,
            &req.cancel,
            Method::POST,
            &api_keys_path(organization_id),
            StatusCode::CREATED,
            Payload::json(&body)?,
            &[],
        )
        .await?
        .json()?;

        let ids = ResourceIds::new().with(ID, created.id).with(ORGANIZATION_ID, organization_id);
        let mut key = refresh(ctx, &req.cancel, &ids).await?;
        key.merge_prior(&plan);
        key.token = Some(created.token);
        resp.state.set(&key)
    }

    async fn read(&self, req: &ReadRequest, resp: &mut ReadResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: ApiKey = req.state.get()?;
        let ids = state.ids()?;

        let Some(mut key) = remove_if_not_found(refresh(ctx, &req.cancel, &ids).await, resp)? else {
            return Ok(());
        };
        key.merge_prior(&state);
        resp.state.set(&key)
    }

    async fn update(&self, req: &UpdateRequest, resp: &mut UpdateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: ApiKey = req.plan.get()?;
        let state: ApiKey = req.state.get()?;
        let ids = state.ids()?;
        let rotate = check_rotation(&plan, &state)?;

        let rotated: RotateApiKeyResponse = send(
            ctx,
            &req.cancel,
            Method::POST,
            &format!("{}/rotate", api_key_path(&ids)?),
            StatusCode::OK,
            Payload::json(&RotateApiKeyRequest { secret: plan.secret.clone() })?,
            &[],
        )
        .await?
        .json()?;

        let mut key = refresh(ctx, &req.cancel, &ids).await?;
        key.merge_prior(&state);
        key.rotate = Some(rotate);
        key.token = Some(encode_token(ids.value(ID)?, &rotated.secret_key));
        key.secret = Some(rotated.secret_key);
        resp.state.set(&key)
    }

    async fn delete(&self, req: &DeleteRequest, _resp: &mut DeleteResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: ApiKey = req.state.get()?;
        let ids = state.ids()?;

        delete(ctx, &req.cancel, &api_key_path(&ids)?, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for ApiKeyResource {
    async fn import_state(&self, req: &ImportStateRequest, resp: &mut ImportStateResponse) -> Result<()> {
        import_state_passthrough_id(ID, req, resp)
    }

    fn identifiers(&self, state: &State) -> Result<ResourceIds> {
        state.get::<ApiKey>()?.ids()
    }
}
