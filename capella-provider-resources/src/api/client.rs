use rand::Rng;
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;

use capella_provider_common::config::ClientConfig;
use capella_provider_common::constant::APP_NAME;
use capella_provider_common::telemetry::debug;

use crate::api::error::ApiError;
use crate::error::{ProviderError, Result};

static JAVASCRIPT_CONTENT_TYPE: &str = "application/javascript";
/// Error code the query service uses for a gateway timeout on index DDL.
const INDEX_DDL_GATEWAY_TIMEOUT_CODE: i64 = 7001;

/// Where a request goes and which status counts as success.
#[derive(Debug, Clone)]
pub struct EndpointCfg {
    pub url: String,
    pub method: Method,
    pub success_status: StatusCode,
}

impl EndpointCfg {
    pub fn new(url: impl Into<String>, method: Method, success_status: StatusCode) -> Self {
        EndpointCfg { url: url.into(), method, success_status }
    }
}

/// Request body handed to the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Json(Value),
}

impl Payload {
    pub fn json<T: Serialize + ?Sized>(body: &T) -> Result<Self> {
        serde_json::to_value(body)
            .map(Payload::Json)
            .map_err(ProviderError::Encode)
    }
}

/// A successful response, body already read.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Response {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(ProviderError::Decode)
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
    }
}

/// How a single attempt failed, and whether it may be retried.
#[derive(Debug)]
enum Failure {
    /// Retry after the given wait, or the default wait when none is known.
    Wait(Option<Duration>, ProviderError),
    /// The request itself timed out, retry with exponential back-off.
    ClientTimeout(ProviderError),
    Fatal(ProviderError),
}

impl Failure {
    fn into_error(self) -> ProviderError {
        match self {
            Failure::Wait(_, e) | Failure::ClientTimeout(e) | Failure::Fatal(e) => e,
        }
    }
}

/// HTTP client for the Capella v4 API.
///
/// Cheap to clone and safe to share between concurrent lifecycle calls.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
}

impl Client {
    /// Create a new client
    ///
    /// # Arguments
    /// * `config` - Request timeout and retry timings
    ///
    /// # Returns
    /// A Result containing the Client or a transport error
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Client { http, config: config.clone() })
    }

    /// Execute a request once
    ///
    /// # Arguments
    /// * `cfg` - The endpoint to call
    /// * `payload` - The request body
    /// * `token` - Bearer token
    /// * `headers` - Extra headers, set after the defaults
    ///
    /// # Returns
    /// The response if its status matches `cfg.success_status`
    pub async fn execute(
        &self,
        cfg: &EndpointCfg,
        payload: &Payload,
        token: &str,
        headers: &[(&str, &str)],
    ) -> Result<Response> {
        let body = encode_body(payload, headers)?;
        self.attempt(cfg, body, token, headers)
            .await
            .map_err(Failure::into_error)
    }

    /// Execute a request, retrying rate limits, gateway timeouts and client
    /// timeouts until the retry window closes
    ///
    /// # Arguments
    /// * `cancel` - Cancellation of the surrounding operation
    /// * `cfg` - The endpoint to call
    /// * `payload` - The request body
    /// * `token` - Bearer token
    /// * `headers` - Extra headers, set after the defaults
    ///
    /// # Returns
    /// The response if its status matches `cfg.success_status`
    pub async fn execute_with_retry(
        &self,
        cancel: &CancellationToken,
        cfg: &EndpointCfg,
        payload: &Payload,
        token: &str,
        headers: &[(&str, &str)],
    ) -> Result<Response> {
        let body = encode_body(payload, headers)?;
        let deadline = Instant::now() + self.config.retry_timeout();
        let mut timeouts: u32 = 0;

        loop {
            let (wait, error) = match self.attempt(cfg, body.clone(), token, headers).await {
                Ok(response) => return Ok(response),
                Err(Failure::Fatal(e)) => return Err(e),
                Err(Failure::Wait(wait, e)) => (wait.unwrap_or_else(|| self.config.retry_wait()), e),
                Err(Failure::ClientTimeout(e)) => {
                    timeouts += 1;
                    (backoff(timeouts, self.config.retry_wait(), self.config.max_backoff()), e)
                },
            };

            if Instant::now() + wait > deadline {
                return Err(ProviderError::RetryTimeout(error.to_string()));
            }

            debug!(
                event = "Retrying",
                method = %cfg.method,
                url = cfg.url.as_str(),
                wait_ms = wait.as_millis() as u64,
                error = %error,
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                _ = sleep(wait) => {},
            }
        }
    }

    async fn attempt(
        &self,
        cfg: &EndpointCfg,
        body: Option<String>,
        token: &str,
        headers: &[(&str, &str)],
    ) -> std::result::Result<Response, Failure> {
        let mut request = self.http
            .request(cfg.method.clone(), &cfg.url)
            .bearer_auth(token);

        if let Some(body) = body {
            if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str())) {
                request = request.header(CONTENT_TYPE, "application/json");
            }
            request = request.body(body);
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Failure::ClientTimeout(ProviderError::Transport(e))
            } else {
                Failure::Fatal(ProviderError::Transport(e))
            }
        })?;

        let status = response.status();
        let response_headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|e| Failure::Fatal(ProviderError::Transport(e)))?;

        if status == cfg.success_status {
            return Ok(Response { status, headers: response_headers, body: text });
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response_headers
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(Failure::Wait(retry_after, ProviderError::RateLimited))
            },
            StatusCode::GATEWAY_TIMEOUT => match serde_json::from_str::<ApiError>(&text) {
                Ok(api) if api.code == INDEX_DDL_GATEWAY_TIMEOUT_CODE => {
                    Err(Failure::Fatal(ProviderError::Api(api)))
                },
                _ => Err(Failure::Wait(None, ProviderError::GatewayTimeout)),
            },
            _ => Err(Failure::Fatal(status_error(status, cfg.success_status, text))),
        }
    }
}

fn user_agent() -> String {
    format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION"))
}

/// Serialize the payload, sending JavaScript sources untouched.
fn encode_body(payload: &Payload, headers: &[(&str, &str)]) -> Result<Option<String>> {
    let javascript = headers.iter().any(|(name, value)| {
        name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) && *value == JAVASCRIPT_CONTENT_TYPE
    });

    match payload {
        Payload::Empty => Ok(None),
        Payload::Json(Value::String(source)) if javascript => Ok(Some(source.clone())),
        Payload::Json(_) if javascript => Err(ProviderError::validation(
            "expected string payload for javascript content type",
        )),
        Payload::Json(value) => serde_json::to_string(value)
            .map(Some)
            .map_err(ProviderError::Encode),
    }
}

/// Map an unexpected status to an error, decoding the API error body when
/// there is one.
fn status_error(status: StatusCode, expected: StatusCode, body: String) -> ProviderError {
    let unexpected = |body: String| ProviderError::UnexpectedStatus {
        status: status.as_u16(),
        expected: expected.as_u16(),
        body,
    };

    match serde_json::from_str::<ApiError>(&body) {
        Ok(mut api) if status == StatusCode::NOT_FOUND => {
            api.http_status_code = status.as_u16();
            ProviderError::NotFound(api)
        },
        Err(_) if status == StatusCode::NOT_FOUND => {
            ProviderError::NotFound(ApiError::new(status.as_u16(), &body))
        },
        Ok(mut api) if api.code != 0 => {
            api.http_status_code = status.as_u16();
            ProviderError::Api(api)
        },
        _ => unexpected(body),
    }
}

/// Exponential back-off with +/-20% jitter: 2s, 4s, 8s, 16s, then capped.
fn backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let backoff = base.saturating_mul(1 << exponent).min(max);

    let spread = (backoff.as_millis() / 5) as u64;
    if spread == 0 {
        return backoff;
    }

    let mut rng = rand::rng();
    let jitter = Duration::from_millis(rng.random_range(0..spread));
    if rng.random_bool(0.5) {
        backoff + jitter
    } else {
        backoff - jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_stays_within_jitter_bounds() {
        let base = Duration::from_secs(2);
        let max = Duration::from_secs(32);

        for (attempt, nominal) in [(1, 2_000u64), (2, 4_000), (3, 8_000), (5, 32_000), (9, 32_000)] {
            let wait = backoff(attempt, base, max).as_millis() as u64;
            assert!(wait >= nominal * 4 / 5 && wait <= nominal * 6 / 5, "attempt {attempt}: {wait}");
        }
    }

    #[test]
    fn javascript_payload_is_sent_raw() {
        let headers = [("Content-Type", "application/javascript")];
        let body = encode_body(&Payload::Json(Value::String("function (doc) { return \"a\"; }".into())), &headers)
            .unwrap();

        assert_eq!(body.as_deref(), Some("function (doc) { return \"a\"; }"));
        assert!(encode_body(&Payload::Json(serde_json::json!({"a": 1})), &headers).is_err());
    }

    #[test]
    fn not_found_maps_to_not_found() {
        let err = status_error(
            StatusCode::NOT_FOUND,
            StatusCode::OK,
            r#"{"code":404,"hint":"","httpStatusCode":404,"message":"gone"}"#.to_string(),
        );

        assert!(err.is_not_found());
    }

    #[test]
    fn undecodable_body_reports_unexpected_status() {
        let err = status_error(StatusCode::BAD_REQUEST, StatusCode::CREATED, "oops".to_string());

        assert_eq!(err.to_string(), "unexpected code: 400, expected: 201, body: oops");
    }
}
