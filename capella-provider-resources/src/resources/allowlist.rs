use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use schemars::{schema_for, Schema};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::api::allowlist::{CreateAllowListRequest, CreateAllowListResponse, GetAllowListResponse};
use crate::api::Payload;
use crate::error::{ProviderError, Result};
use crate::provider::context::Context;
use crate::provider::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest, ImportStateResponse,
    ReadRequest, ReadResponse, State, UpdateRequest, UpdateResponse,
};
use crate::provider::traits::{import_state_passthrough_id, Resource, ResourceWithImportState};
use crate::reconcile::ids::{ResourceIds, CLUSTER_ID, ID, ORGANIZATION_ID, PROJECT_ID};
use crate::resources::utils::{configured, delete, get, remove_if_not_found, required, send};
use crate::schema::allowlist::AllowList;

#[derive(Default)]
pub struct AllowListResource {
    ctx: Option<Arc<Context>>,
}

fn allowlists_path(organization_id: &str, project_id: &str, cluster_id: &str) -> String {
    format!("/v4/organizations/{organization_id}/projects/{project_id}/clusters/{cluster_id}/allowedcidrs")
}

fn allowlist_path(ids: &ResourceIds) -> Result<String> {
    Ok(format!(
        "{}/{}",
        allowlists_path(ids.value(ORGANIZATION_ID)?, ids.value(PROJECT_ID)?, ids.value(CLUSTER_ID)?),
        ids.value(ID)?,
    ))
}

async fn refresh(ctx: &Context, cancel: &CancellationToken, ids: &ResourceIds) -> Result<AllowList> {
    let allowlist: GetAllowListResponse = get(ctx, cancel, &allowlist_path(ids)?).await?.json()?;
    AllowList::from_response(allowlist, ids)
}

#[async_trait]
impl Resource for AllowListResource {
    fn type_suffix(&self) -> &'static str {
        "allowlist"
    }

    fn schema(&self) -> Schema {
        schema_for!(AllowList)
    }

    fn configure(&mut self, ctx: Arc<Context>) {
        self.ctx = Some(ctx);
    }

    async fn create(&self, req: &CreateRequest, resp: &mut CreateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: AllowList = req.plan.get()?;
        let organization_id = required(&plan.organization_id, ORGANIZATION_ID)?;
        let project_id = required(&plan.project_id, PROJECT_ID)?;
        let cluster_id = required(&plan.cluster_id, CLUSTER_ID)?;

        let body = CreateAllowListRequest {
            cidr: plan.cidr.clone(),
            comment: plan.comment.clone(),
            expires_at: plan.expires_at.clone(),
        };
        let created: CreateAllowListResponse = send(
            ctx,
            &req.cancel,
            Method::POST,
            &allowlists_path(organization_id, project_id, cluster_id),
            StatusCode::CREATED,
            Payload::json(&body)?,
            &[],
        )
        .await?
        .json()?;

        let ids = ResourceIds::new()
            .with(ID, created.id)
            .with(ORGANIZATION_ID, organization_id)
            .with(PROJECT_ID, project_id)
            .with(CLUSTER_ID, cluster_id);
        let allowlist = refresh(ctx, &req.cancel, &ids).await?;
        resp.state.set(&allowlist)
    }

    async fn read(&self, req: &ReadRequest, resp: &mut ReadResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: AllowList = req.state.get()?;
        let ids = state.ids()?;

        if let Some(allowlist) = remove_if_not_found(refresh(ctx, &req.cancel, &ids).await, resp)? {
            resp.state.set(&allowlist)?;
        }
        Ok(())
    }

    async fn update(&self, _req: &UpdateRequest, _resp: &mut UpdateResponse) -> Result<()> {
        // The allowed CIDRs endpoint has no update, every attribute forces
        // replacement.
        Err(ProviderError::validation(
            "allowlist entries cannot be updated, changes require the entry to be replaced",
        ))
    }

    async fn delete(&self, req: &DeleteRequest, _resp: &mut DeleteResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: AllowList = req.state.get()?;
        let ids = state.ids()?;

        delete(ctx, &req.cancel, &allowlist_path(&ids)?, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for AllowListResource {
    async fn import_state(&self, req: &ImportStateRequest, resp: &mut ImportStateResponse) -> Result<()> {
        import_state_passthrough_id(ID, req, resp)
    }

    fn identifiers(&self, state: &State) -> Result<ResourceIds> {
        state.get::<AllowList>()?.ids()
    }
}
