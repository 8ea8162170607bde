use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use schemars::{schema_for, Schema};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use capella_provider_common::telemetry::warn;

use crate::api::cluster::{CreateClusterResponse, GetClusterResponse, FINAL_STATES, HEALTHY};
use crate::api::Payload;
use crate::error::{ProviderError, Result};
use crate::provider::context::Context;
use crate::provider::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest, ImportStateResponse,
    ReadRequest, ReadResponse, State, UpdateRequest, UpdateResponse,
};
use crate::provider::traits::{import_state_passthrough_id, Resource, ResourceWithImportState};
use crate::reconcile::ids::{ResourceIds, ID, ORGANIZATION_ID, PROJECT_ID};
use crate::reconcile::poll::Poller;
use crate::resources::utils::{configured, delete, get, remove_if_not_found, required, send};
use crate::schema::cluster::Cluster;

/// Status reported by the delete wait once the cluster no longer exists.
static GONE: &str = "gone";

#[derive(Default)]
pub struct ClusterResource {
    ctx: Option<Arc<Context>>,
}

fn clusters_path(organization_id: &str, project_id: &str) -> String {
    format!("/v4/organizations/{organization_id}/projects/{project_id}/clusters")
}

fn cluster_path(ids: &ResourceIds) -> Result<String> {
    Ok(format!(
        "{}/{}",
        clusters_path(ids.value(ORGANIZATION_ID)?, ids.value(PROJECT_ID)?),
        ids.value(ID)?,
    ))
}

async fn fetch(ctx: &Context, cancel: &CancellationToken, ids: &ResourceIds) -> Result<GetClusterResponse> {
    let response = get(ctx, cancel, &cluster_path(ids)?).await?;
    let mut cluster: GetClusterResponse = response.json()?;
    cluster.etag = response.header("ETag");
    Ok(cluster)
}

async fn refresh(ctx: &Context, cancel: &CancellationToken, ids: &ResourceIds) -> Result<Cluster> {
    let cluster = fetch(ctx, cancel, ids).await?;
    Ok(Cluster::from_response(cluster, ids.value(ORGANIZATION_ID)?, ids.value(PROJECT_ID)?))
}

/// Wait for the cluster to settle in `healthy`. Any other final state
/// ends the wait with an error.
async fn wait_until_healthy(ctx: &Context, cancel: &CancellationToken, ids: &ResourceIds) -> Result<String> {
    let settings = &ctx.config()?.polling.cluster;
    Poller::new(format!("cluster {}", ids.value(ID)?), HEALTHY, settings)
        .terminal(&FINAL_STATES)
        .with_cancellation(cancel.clone())
        .wait(|| async move { fetch(ctx, cancel, ids).await.map(|cluster| cluster.current_state) })
        .await
}

/// Write the refreshed cluster to state, keeping planned ordering, then
/// report how the wait ended. The cluster is kept in state even when it
/// settled in a failed state so the next plan can see it.
async fn settle(
    ctx: &Context,
    cancel: &CancellationToken,
    ids: &ResourceIds,
    plan: &Cluster,
    waited: Result<String>,
    resp: &mut CreateResponse,
) -> Result<()> {
    if let Err(e) = &waited {
        if !matches!(e, ProviderError::WrongTerminalState { .. }) {
            return waited.map(|_| ());
        }
        warn!(event = "ClusterUnhealthy", cluster = ids.value(ID)?, error = %e);
    }

    let mut cluster = refresh(ctx, cancel, ids).await?;
    cluster.keep_service_order(&plan.service_groups);
    cluster.if_match = plan.if_match.clone();
    resp.state.set(&cluster)?;
    waited.map(|_| ())
}

#[async_trait]
impl Resource for ClusterResource {
    fn type_suffix(&self) -> &'static str {
        "cluster"
    }

    fn schema(&self) -> Schema {
        schema_for!(Cluster)
    }

    fn configure(&mut self, ctx: Arc<Context>) {
        self.ctx = Some(ctx);
    }

    async fn create(&self, req: &CreateRequest, resp: &mut CreateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: Cluster = req.plan.get()?;
        let organization_id = required(&plan.organization_id, ORGANIZATION_ID)?;
        let project_id = required(&plan.project_id, PROJECT_ID)?;

        let created: CreateClusterResponse = send(
            ctx,
            &req.cancel,
            Method::POST,
            &clusters_path(organization_id, project_id),
            StatusCode::ACCEPTED,
            Payload::json(&plan.to_create_request())?,
            &[],
        )
        .await?
        .json()?;

        // Track the id right away so a failed wait does not orphan the cluster.
        let mut tracked = plan.clone();
        tracked.id = Some(created.id.clone());
        resp.state.set(&tracked)?;

        let ids = ResourceIds::new()
            .with(ID, created.id)
            .with(ORGANIZATION_ID, organization_id)
            .with(PROJECT_ID, project_id);
        let waited = wait_until_healthy(ctx, &req.cancel, &ids).await;
        settle(ctx, &req.cancel, &ids, &plan, waited, resp).await
    }

    async fn read(&self, req: &ReadRequest, resp: &mut ReadResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: Cluster = req.state.get()?;
        let ids = state.ids()?;

        let Some(mut cluster) = remove_if_not_found(refresh(ctx, &req.cancel, &ids).await, resp)? else {
            return Ok(());
        };
        cluster.keep_service_order(&state.service_groups);
        cluster.if_match = state.if_match;
        resp.state.set(&cluster)
    }

    async fn update(&self, req: &UpdateRequest, resp: &mut UpdateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: Cluster = req.plan.get()?;
        let state: Cluster = req.state.get()?;
        let ids = state.ids()?;

        let headers: Vec<(&str, &str)> = plan
            .if_match
            .as_deref()
            .map(|version| vec![("If-Match", version)])
            .unwrap_or_default();
        send(
            ctx,
            &req.cancel,
            Method::PUT,
            &cluster_path(&ids)?,
            StatusCode::NO_CONTENT,
            Payload::json(&plan.to_update_request())?,
            &headers,
        )
        .await?;

        let waited = wait_until_healthy(ctx, &req.cancel, &ids).await;
        settle(ctx, &req.cancel, &ids, &plan, waited, resp).await
    }

    async fn delete(&self, req: &DeleteRequest, _resp: &mut DeleteResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: Cluster = req.state.get()?;
        let ids = state.ids()?;

        if !delete(ctx, &req.cancel, &cluster_path(&ids)?, StatusCode::ACCEPTED).await? {
            return Ok(());
        }

        let settings = &ctx.config()?.polling.cluster;
        let (ids, cancel) = (&ids, &req.cancel);
        let waited = Poller::new(format!("cluster {}", ids.value(ID)?), GONE, settings)
            .terminal(&FINAL_STATES)
            .with_cancellation(cancel.clone())
            .wait(|| async move {
                match fetch(ctx, cancel, ids).await {
                    Ok(cluster) => Ok(cluster.current_state),
                    Err(e) if e.is_not_found() => Ok(GONE.to_string()),
                    Err(e) => Err(e),
                }
            })
            .await;

        match waited {
            Ok(_) => Ok(()),
            Err(ProviderError::WrongTerminalState { actual, .. }) => Err(ProviderError::validation(format!(
                "Could not delete cluster id {}, as current Cluster state: {actual}",
                ids.value(ID)?,
            ))),
            Err(e) => Err(e),
        }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for ClusterResource {
    async fn import_state(&self, req: &ImportStateRequest, resp: &mut ImportStateResponse) -> Result<()> {
        import_state_passthrough_id(ID, req, resp)
    }

    fn identifiers(&self, state: &State) -> Result<ResourceIds> {
        state.get::<Cluster>()?.ids()
    }
}
