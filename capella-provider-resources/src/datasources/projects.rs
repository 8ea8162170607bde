use async_trait::async_trait;
use schemars::{schema_for, Schema};
use std::sync::Arc;

use capella_provider_common::telemetry::debug;

use crate::api::pagination::get_paginated;
use crate::api::project::GetProjectResponse;
use crate::error::{ProviderError, Result};
use crate::provider::context::Context;
use crate::provider::request::{ReadRequest, ReadResponse};
use crate::provider::traits::DataSource;
use crate::reconcile::ids::ORGANIZATION_ID;
use crate::resources::utils::configured;
use crate::schema::projects::{ProjectData, Projects};

/// Every project of an organization, walked page by page.
#[derive(Default)]
pub struct ProjectsDataSource {
    ctx: Option<Arc<Context>>,
}

#[async_trait]
impl DataSource for ProjectsDataSource {
    fn type_suffix(&self) -> &'static str {
        "projects"
    }

    fn schema(&self) -> Schema {
        schema_for!(Projects)
    }

    fn configure(&mut self, ctx: Arc<Context>) {
        self.ctx = Some(ctx);
    }

    async fn read(&self, req: &ReadRequest, resp: &mut ReadResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let mut projects: Projects = req.state.get()?;
        if projects.organization_id.is_empty() {
            return Err(ProviderError::missing_id(ORGANIZATION_ID));
        }

        let url = ctx.url(&format!("/v4/organizations/{}/projects", projects.organization_id))?;
        let listed: Vec<GetProjectResponse> =
            get_paginated(&ctx.client, &req.cancel, ctx.token()?, &url, "id").await?;
        debug!(event = "ProjectsListed", count = listed.len());

        let organization_id = projects.organization_id.clone();
        projects.data = listed
            .into_iter()
            .map(|project| ProjectData::from_response(project, &organization_id))
            .collect();
        resp.state.set(&projects)
    }
}
