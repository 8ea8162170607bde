use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use schemars::{schema_for, Schema};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::api::project::{CreateProjectRequest, CreateProjectResponse, GetProjectResponse};
use crate::api::Payload;
use crate::error::Result;
use crate::provider::context::Context;
use crate::provider::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest, ImportStateResponse,
    ReadRequest, ReadResponse, State, UpdateRequest, UpdateResponse,
};
use crate::provider::traits::{import_state_passthrough_id, Resource, ResourceWithImportState};
use crate::reconcile::ids::{ResourceIds, ID, ORGANIZATION_ID};
use crate::resources::utils::{configured, delete, get, remove_if_not_found, required, send};
use crate::schema::project::Project;

#[derive(Default)]
pub struct ProjectResource {
    ctx: Option<Arc<Context>>,
}

fn projects_path(organization_id: &str) -> String {
    format!("/v4/organizations/{organization_id}/projects")
}

async fn refresh(ctx: &Context, cancel: &CancellationToken, organization_id: &str, id: &str) -> Result<Project> {
    let response = get(ctx, cancel, &format!("{}/{id}", projects_path(organization_id))).await?;
    let mut project: GetProjectResponse = response.json()?;
    project.etag = response.header("ETag");
    Ok(Project::from_response(project, organization_id))
}

#[async_trait]
impl Resource for ProjectResource {
    fn type_suffix(&self) -> &'static str {
        "project"
    }

    fn schema(&self) -> Schema {
        schema_for!(Project)
    }

    fn configure(&mut self, ctx: Arc<Context>) {
        self.ctx = Some(ctx);
    }

    async fn create(&self, req: &CreateRequest, resp: &mut CreateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: Project = req.plan.get()?;
        let organization_id = required(&plan.organization_id, ORGANIZATION_ID)?;

        let body = CreateProjectRequest {
            name: plan.name.clone(),
            description: plan.description.clone().unwrap_or_default(),
        };
        let created: CreateProjectResponse = send(
            ctx,
            &req.cancel,
            Method::POST,
            &projects_path(organization_id),
            StatusCode::CREATED,
            Payload::json(&body)?,
            &[],
        )
        .await?
        .json()?;

        let mut project = refresh(ctx, &req.cancel, organization_id, &created.id).await?;
        project.if_match = plan.if_match;
        resp.state.set(&project)
    }

    async fn read(&self, req: &ReadRequest, resp: &mut ReadResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: Project = req.state.get()?;
        let ids = state.ids()?;

        let fetched = refresh(ctx, &req.cancel, ids.value(ORGANIZATION_ID)?, ids.value(ID)?).await;
        let Some(mut project) = remove_if_not_found(fetched, resp)? else {
            return Ok(());
        };
        project.if_match = state.if_match;
        resp.state.set(&project)
    }

    async fn update(&self, req: &UpdateRequest, resp: &mut UpdateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: Project = req.plan.get()?;
        let state: Project = req.state.get()?;
        let ids = state.ids()?;
        let (organization_id, id) = (ids.value(ORGANIZATION_ID)?, ids.value(ID)?);

        let body = CreateProjectRequest {
            name: plan.name.clone(),
            description: plan.description.clone().unwrap_or_default(),
        };
        let headers: Vec<(&str, &str)> = plan
            .if_match
            .as_deref()
            .map(|version| vec![("If-Match", version)])
            .unwrap_or_default();

        send(
            ctx,
            &req.cancel,
            Method::PUT,
            &format!("{}/{id}", projects_path(organization_id)),
            StatusCode::NO_CONTENT,
            Payload::json(&body)?,
            &headers,
        )
        .await?;

        let mut project = refresh(ctx, &req.cancel, organization_id, id).await?;
        project.if_match = plan.if_match;
        resp.state.set(&project)
    }

    async fn delete(&self, req: &DeleteRequest, _resp: &mut DeleteResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: Project = req.state.get()?;
        let ids = state.ids()?;

        let path = format!("{}/{}", projects_path(ids.value(ORGANIZATION_ID)?), ids.value(ID)?);
        delete(ctx, &req.cancel, &path, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for ProjectResource {
    async fn import_state(&self, req: &ImportStateRequest, resp: &mut ImportStateResponse) -> Result<()> {
        import_state_passthrough_id(ID, req, resp)
    }

    fn identifiers(&self, state: &State) -> Result<ResourceIds> {
        state.get::<Project>()?.ids()
    }
}
