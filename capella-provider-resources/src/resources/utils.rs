use reqwest::{Method, StatusCode};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use capella_provider_common::telemetry::{debug, info};

use crate::api::{EndpointCfg, Payload, Response};
use crate::error::{ProviderError, Result};
use crate::provider::context::Context;
use crate::provider::request::Response as LifecycleResponse;

/// The context a resource was configured with.
///
/// # Arguments
/// * `ctx`: The context handed to `configure`, if any
///
/// # Returns
/// The context, or `NotConfigured` when `configure` was never called
pub fn configured(ctx: &Option<Arc<Context>>) -> Result<&Context> {
    ctx.as_deref().ok_or(ProviderError::NotConfigured)
}

/// Send a request to an API path with the configured token, retrying
/// transient failures
///
/// # Arguments
/// * `ctx`: The provider context
/// * `cancel`: Cancellation of the surrounding lifecycle call
/// * `method`: The HTTP method
/// * `path`: The API path, joined to the configured host
/// * `success`: The status that counts as success
/// * `payload`: The request body
/// * `headers`: Extra headers
///
/// # Returns
/// A Result containing the response or an error
pub async fn send(
    ctx: &Context,
    cancel: &CancellationToken,
    method: Method,
    path: &str,
    success: StatusCode,
    payload: Payload,
    headers: &[(&str, &str)],
) -> Result<Response> {
    let cfg = EndpointCfg::new(ctx.url(path)?, method, success);
    debug!(event = "Request", method = %cfg.method, url = cfg.url.as_str());
    ctx.client
        .execute_with_retry(cancel, &cfg, &payload, ctx.token()?, headers)
        .await
}

/// GET an API path expecting `200 OK`.
pub async fn get(ctx: &Context, cancel: &CancellationToken, path: &str) -> Result<Response> {
    send(ctx, cancel, Method::GET, path, StatusCode::OK, Payload::Empty, &[]).await
}

/// Delete a remote resource. A resource that is already gone counts as
/// deleted.
///
/// # Arguments
/// * `ctx`: The provider context
/// * `cancel`: Cancellation of the surrounding lifecycle call
/// * `path`: The API path of the resource
/// * `success`: The status the endpoint answers with
///
/// # Returns
/// `true` if the resource existed
pub async fn delete(ctx: &Context, cancel: &CancellationToken, path: &str, success: StatusCode) -> Result<bool> {
    match send(ctx, cancel, Method::DELETE, path, success, Payload::Empty, &[]).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => {
            info!(event = "AlreadyDeleted", path = path);
            Ok(false)
        },
        Err(e) => Err(e),
    }
}

/// Turn a `NotFound` into removal of the resource from state.
///
/// # Arguments
/// * `result`: The outcome of fetching the remote resource
/// * `resp`: The response whose state is removed when the resource is gone
///
/// # Returns
/// `Ok(None)` if the resource is gone, otherwise the fetched value or error
pub fn remove_if_not_found<T>(result: Result<T>, resp: &mut LifecycleResponse) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => {
            info!(
                event = "RemovedFromState",
                reason = "resource doesn't exist in remote server",
            );
            resp.state.remove();
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

/// A required attribute of a plan that has no identifiers yet.
pub fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    match value.as_deref() {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ProviderError::missing_id(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::provider::request::State;
    use serde_json::json;

    #[test]
    fn not_found_removes_state() {
        let mut resp = LifecycleResponse { state: State::new(json!({"id": "x"})), ..Default::default() };

        let value: Option<()> =
            remove_if_not_found(Err(ProviderError::NotFound(ApiError::new(404, "gone"))), &mut resp).unwrap();

        assert!(value.is_none());
        assert!(resp.state.is_null());
    }

    #[test]
    fn other_errors_keep_state() {
        let mut resp = LifecycleResponse { state: State::new(json!({"id": "x"})), ..Default::default() };

        let result: Result<Option<()>> = remove_if_not_found(Err(ProviderError::GatewayTimeout), &mut resp);

        assert!(result.is_err());
        assert!(!resp.state.is_null());
    }
}
