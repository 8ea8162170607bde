use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use schemars::{schema_for, Schema};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::api::scope::{CreateScopeRequest, GetScopeResponse};
use crate::api::Payload;
use crate::error::{ProviderError, Result};
use crate::provider::context::Context;
use crate::provider::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest, ImportStateResponse,
    ReadRequest, ReadResponse, State, UpdateRequest, UpdateResponse,
};
use crate::provider::traits::{import_state_passthrough_id, Resource, ResourceWithImportState};
use crate::reconcile::ids::{ResourceIds, CLUSTER_ID, ORGANIZATION_ID, PROJECT_ID};
use crate::resources::utils::{configured, delete, get, remove_if_not_found, send};
use crate::schema::scope::{Scope, BUCKET_ID, SCOPE_NAME};

#[derive(Default)]
pub struct ScopeResource {
    ctx: Option<Arc<Context>>,
}

/// Path of the scopes of a bucket.
pub(crate) fn scopes_path(ids: &ResourceIds) -> Result<String> {
    Ok(format!(
        "/v4/organizations/{}/projects/{}/clusters/{}/buckets/{}/scopes",
        ids.value(ORGANIZATION_ID)?,
        ids.value(PROJECT_ID)?,
        ids.value(CLUSTER_ID)?,
        ids.value(BUCKET_ID)?,
    ))
}

async fn refresh(ctx: &Context, cancel: &CancellationToken, ids: &ResourceIds) -> Result<Scope> {
    let path = format!("{}/{}", scopes_path(ids)?, ids.value(SCOPE_NAME)?);
    let scope: GetScopeResponse = get(ctx, cancel, &path).await?.json()?;
    Scope::from_response(scope, ids)
}

#[async_trait]
impl Resource for ScopeResource {
    fn type_suffix(&self) -> &'static str {
        "scope"
    }

    fn schema(&self) -> Schema {
        schema_for!(Scope)
    }

    fn configure(&mut self, ctx: Arc<Context>) {
        self.ctx = Some(ctx);
    }

    async fn create(&self, req: &CreateRequest, resp: &mut CreateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: Scope = req.plan.get()?;
        let ids = plan.ids()?;

        let body = CreateScopeRequest { name: ids.value(SCOPE_NAME)?.to_string() };
        send(
            ctx,
            &req.cancel,
            Method::POST,
            &scopes_path(&ids)?,
            StatusCode::CREATED,
            Payload::json(&body)?,
            &[],
        )
        .await?;

        let scope = refresh(ctx, &req.cancel, &ids).await?;
        resp.state.set(&scope)
    }

    async fn read(&self, req: &ReadRequest, resp: &mut ReadResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: Scope = req.state.get()?;
        let ids = state.ids()?;

        if let Some(scope) = remove_if_not_found(refresh(ctx, &req.cancel, &ids).await, resp)? {
            resp.state.set(&scope)?;
        }
        Ok(())
    }

    async fn update(&self, _req: &UpdateRequest, _resp: &mut UpdateResponse) -> Result<()> {
        Err(ProviderError::validation("scopes cannot be updated, changes require the scope to be replaced"))
    }

    async fn delete(&self, req: &DeleteRequest, _resp: &mut DeleteResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: Scope = req.state.get()?;
        let ids = state.ids()?;

        let path = format!("{}/{}", scopes_path(&ids)?, ids.value(SCOPE_NAME)?);
        delete(ctx, &req.cancel, &path, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for ScopeResource {
    async fn import_state(&self, req: &ImportStateRequest, resp: &mut ImportStateResponse) -> Result<()> {
        import_state_passthrough_id(SCOPE_NAME, req, resp)
    }

    fn identifiers(&self, state: &State) -> Result<ResourceIds> {
        state.get::<Scope>()?.ids()
    }
}
