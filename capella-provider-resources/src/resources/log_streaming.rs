use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use schemars::{schema_for, Schema};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use capella_provider_common::telemetry::info;

use crate::api::log_streaming::{GetLogStreamingResponse, DISABLED, ENABLED, FINAL_STATES};
use crate::api::Payload;
use crate::error::{ProviderError, Result};
use crate::provider::context::Context;
use crate::provider::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest, ImportStateResponse,
    ReadRequest, ReadResponse, State, UpdateRequest, UpdateResponse, ValidateConfigRequest,
    ValidateConfigResponse,
};
use crate::provider::traits::{
    import_state_passthrough_id, Resource, ResourceWithImportState, ResourceWithValidateConfig,
};
use crate::reconcile::ids::{ResourceIds, CLUSTER_ID, ORGANIZATION_ID, PROJECT_ID};
use crate::reconcile::poll::Poller;
use crate::resources::utils::{configured, delete, get, remove_if_not_found, send};
use crate::schema::log_streaming::{LogStreaming, LogStreamingCredentials, APP_SERVICE_ID};

#[derive(Default)]
pub struct LogStreamingResource {
    ctx: Option<Arc<Context>>,
}

fn log_streaming_path(ids: &ResourceIds) -> Result<String> {
    Ok(format!(
        "/v4/organizations/{}/projects/{}/clusters/{}/appservices/{}/logStreaming",
        ids.value(ORGANIZATION_ID)?,
        ids.value(PROJECT_ID)?,
        ids.value(CLUSTER_ID)?,
        ids.value(APP_SERVICE_ID)?,
    ))
}

async fn fetch(ctx: &Context, cancel: &CancellationToken, ids: &ResourceIds) -> Result<GetLogStreamingResponse> {
    get(ctx, cancel, &log_streaming_path(ids)?).await?.json()
}

/// Poll the config state until it reaches `target`. Settling in any other
/// final state ends the wait with an error.
async fn wait_for_state(ctx: &Context, cancel: &CancellationToken, ids: &ResourceIds, target: &str) -> Result<()> {
    let settings = &ctx.config()?.polling.log_streaming;
    Poller::new(format!("log streaming of app service {}", ids.value(APP_SERVICE_ID)?), target, settings)
        .terminal(&FINAL_STATES)
        .with_cancellation(cancel.clone())
        .wait(|| async move {
            fetch(ctx, cancel, ids)
                .await?
                .config_state
                .ok_or_else(|| ProviderError::validation("API returned empty response body or missing config state"))
        })
        .await
        .map(|_| ())
}

/// Enable streaming with the planned collector, wait for it to settle and
/// write the result to state. Credentials are never returned by the API so
/// the planned ones are kept.
async fn enable(ctx: &Context, cancel: &CancellationToken, plan: &LogStreaming, resp: &mut CreateResponse) -> Result<()> {
    let ids = plan.ids()?;
    send(
        ctx,
        cancel,
        Method::POST,
        &log_streaming_path(&ids)?,
        StatusCode::ACCEPTED,
        Payload::json(&plan.to_request()?)?,
        &[],
    )
    .await?;

    wait_for_state(ctx, cancel, &ids, ENABLED).await?;

    let refreshed = fetch(ctx, cancel, &ids).await?;
    resp.state.set(&LogStreaming::from_response(refreshed, &ids, plan.credentials.clone())?)
}

/// Check that exactly the credentials block matching `output_type` is set.
/// Stops at the first problem found.
fn validate(config: &LogStreaming, resp: &mut ValidateConfigResponse) {
    let (Some(credentials), Some(output_type)) = (&config.credentials, config.output_type.as_deref()) else {
        return;
    };

    let mut matched = false;
    for (kind, present) in LogStreamingCredentials::present(credentials) {
        if kind == output_type {
            matched = true;
            if !present {
                resp.diagnostics.add_attribute_error(
                    "credentials",
                    "Missing Credential Configuration",
                    &format!("credentials.{kind} must be configured when output_type is {output_type:?}"),
                );
                return;
            }
        } else if present {
            resp.diagnostics.add_attribute_error(
                "credentials",
                "Invalid Credential Configuration",
                &format!("credentials.{kind} must not be configured when output_type is {output_type:?}"),
            );
            return;
        }
    }

    if !matched {
        resp.diagnostics.add_attribute_error(
            "output_type",
            "Invalid Attribute Configuration",
            &format!("Unsupported output_type {output_type:?}. Please read the documentation for supported values."),
        );
    }
}

#[async_trait]
impl Resource for LogStreamingResource {
    fn type_suffix(&self) -> &'static str {
        "app_service_log_streaming"
    }

    fn schema(&self) -> Schema {
        schema_for!(LogStreaming)
    }

    fn configure(&mut self, ctx: Arc<Context>) {
        self.ctx = Some(ctx);
    }

    async fn create(&self, req: &CreateRequest, resp: &mut CreateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: LogStreaming = req.plan.get()?;
        enable(ctx, &req.cancel, &plan, resp).await
    }

    async fn read(&self, req: &ReadRequest, resp: &mut ReadResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: LogStreaming = req.state.get()?;
        let ids = state.ids()?;

        let Some(remote) = remove_if_not_found(fetch(ctx, &req.cancel, &ids).await, resp)? else {
            return Ok(());
        };

        // Disabled streaming is how the API reports a deleted configuration.
        if remote.config_state.as_deref() == Some(DISABLED) {
            info!(event = "RemovedFromState", reason = "log streaming is disabled");
            resp.state.remove();
            return Ok(());
        }

        resp.state.set(&LogStreaming::from_response(remote, &ids, state.credentials)?)
    }

    async fn update(&self, req: &UpdateRequest, resp: &mut UpdateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: LogStreaming = req.plan.get()?;
        enable(ctx, &req.cancel, &plan, resp).await
    }

    async fn delete(&self, req: &DeleteRequest, _resp: &mut DeleteResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: LogStreaming = req.state.get()?;
        let ids = state.ids()?;

        if !delete(ctx, &req.cancel, &log_streaming_path(&ids)?, StatusCode::ACCEPTED).await? {
            return Ok(());
        }
        wait_for_state(ctx, &req.cancel, &ids, DISABLED).await
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }

    fn as_validate_config(&self) -> Option<&dyn ResourceWithValidateConfig> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for LogStreamingResource {
    async fn import_state(&self, req: &ImportStateRequest, resp: &mut ImportStateResponse) -> Result<()> {
        import_state_passthrough_id(APP_SERVICE_ID, req, resp)
    }

    fn identifiers(&self, state: &State) -> Result<ResourceIds> {
        state.get::<LogStreaming>()?.ids()
    }
}

impl ResourceWithValidateConfig for LogStreamingResource {
    fn validate_config(&self, req: &ValidateConfigRequest, resp: &mut ValidateConfigResponse) -> Result<()> {
        let config: LogStreaming = req.config.get()?;
        validate(&config, resp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::log_streaming::{DatadogCredentials, SumologicCredentials};

    fn config(output_type: &str, credentials: LogStreamingCredentials) -> LogStreaming {
        LogStreaming {
            output_type: Some(output_type.to_string()),
            credentials: Some(credentials),
            ..Default::default()
        }
    }

    fn details(config: LogStreaming) -> Vec<(Option<String>, String)> {
        let mut resp = ValidateConfigResponse::default();
        validate(&config, &mut resp);
        resp.diagnostics.iter().map(|d| (d.attribute.clone(), d.detail.clone())).collect()
    }

    fn datadog() -> LogStreamingCredentials {
        LogStreamingCredentials {
            datadog: Some(DatadogCredentials { api_key: "k".into(), url: "https://dd".into() }),
            ..Default::default()
        }
    }

    #[test]
    fn matching_block_passes() {
        assert!(details(config("datadog", datadog())).is_empty());
    }

    #[test]
    fn missing_block_is_reported() {
        assert_eq!(
            details(config("sumologic", LogStreamingCredentials::default())),
            vec![(
                Some("credentials".to_string()),
                "credentials.sumologic must be configured when output_type is \"sumologic\"".to_string(),
            )],
        );
    }

    #[test]
    fn extra_block_is_reported() {
        let mut creds = datadog();
        creds.sumologic = Some(SumologicCredentials { url: "https://sumo".into() });

        assert_eq!(
            details(config("sumologic", creds)),
            vec![(
                Some("credentials".to_string()),
                "credentials.datadog must not be configured when output_type is \"sumologic\"".to_string(),
            )],
        );
    }

    #[test]
    fn unknown_output_type_is_reported() {
        assert_eq!(
            details(config("syslog", LogStreamingCredentials::default())),
            vec![(
                Some("output_type".to_string()),
                "Unsupported output_type \"syslog\". Please read the documentation for supported values.".to_string(),
            )],
        );
    }

    #[test]
    fn unset_credentials_skip_validation() {
        let config = LogStreaming { output_type: Some("datadog".into()), ..Default::default() };

        assert!(details(config).is_empty());
    }

    #[test]
    fn path_includes_every_parent() {
        let ids = ResourceIds::new()
            .with(ORGANIZATION_ID, "o")
            .with(PROJECT_ID, "p")
            .with(CLUSTER_ID, "c")
            .with(APP_SERVICE_ID, "a");

        assert_eq!(
            log_streaming_path(&ids).unwrap(),
            "/v4/organizations/o/projects/p/clusters/c/appservices/a/logStreaming",
        );
    }
}
