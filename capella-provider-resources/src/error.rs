// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use std::result;
use thiserror::Error;

use crate::api::error::ApiError;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("some ID is missing or was passed incorrectly, please check provider documentation for syntax: {0}")]
    MissingId(String),
    #[error("malformed import identifier `{identifier}`: {reason}")]
    MalformedIdentifier {
        identifier: String,
        reason: &'static str,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
    #[error("{0}")]
    Api(ApiError),
    #[error("resource not found: {0}")]
    NotFound(ApiError),
    #[error("failed to execute request: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected code: {status}, expected: {expected}, body: {body}")]
    UnexpectedStatus {
        status: u16,
        expected: u16,
        body: String,
    },
    #[error("failed to marshal payload: {0}")]
    Encode(serde_json::Error),
    #[error("failed to unmarshal response: {0}")]
    Decode(serde_json::Error),
    #[error("api key reached the ratelimit")]
    RateLimited,
    #[error("gateway timeout")]
    GatewayTimeout,
    #[error("timed out executing request against api: {0}")]
    RetryTimeout(String),
    #[error(
        "timed out waiting for {resource} to reach state `{target}`, the operation may still complete, \
         run `terraform plan` later to observe the current state"
    )]
    ConvergenceTimeout {
        resource: String,
        target: String,
    },
    #[error("{resource} reached state `{actual}` instead of expected `{target}`")]
    WrongTerminalState {
        resource: String,
        actual: String,
        target: String,
    },
    #[error("another index build is already in progress, the build will be retried in the background")]
    IndexBuildInProgress,
    #[error("query service rejected the statement: {0}")]
    Query(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("failed to read state: {0}")]
    State(String),
    #[error("provider has not been configured")]
    NotConfigured,
}

impl ProviderError {
    /// Whether the remote resource is already gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }

    pub(crate) fn missing_id(key: &str) -> Self {
        ProviderError::MissingId(key.to_string())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ProviderError::Validation(message.into())
    }
}

pub type Result<T> = result::Result<T, ProviderError>;
