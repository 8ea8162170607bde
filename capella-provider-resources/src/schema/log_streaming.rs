use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::log_streaming::{Credentials, GetLogStreamingResponse, PostLogStreamingRequest};
use crate::error::{ProviderError, Result};
use crate::reconcile::ids::{resolve, ResourceIds, CLUSTER_ID, ORGANIZATION_ID, PROJECT_ID};

pub static APP_SERVICE_ID: &str = "app_service_id";

/// Collectors log streaming can send to.
pub static OUTPUT_TYPES: [&str; 7] = [
    "datadog",
    "dynatrace",
    "elastic",
    "generic_http",
    "loki",
    "splunk",
    "sumologic",
];

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct LogStreaming {
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub cluster_id: Option<String>,
    pub app_service_id: Option<String>,
    pub output_type: Option<String>,
    pub config_state: Option<String>,
    pub streaming_state: Option<String>,
    /// Never returned by the API, kept from plan or prior state.
    pub credentials: Option<LogStreamingCredentials>,
}

/// Exactly one block is set, matching `output_type`.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct LogStreamingCredentials {
    pub datadog: Option<DatadogCredentials>,
    pub dynatrace: Option<DynatraceCredentials>,
    pub elastic: Option<BasicCredentials>,
    pub generic_http: Option<GenericHttpCredentials>,
    pub loki: Option<BasicCredentials>,
    pub splunk: Option<SplunkCredentials>,
    pub sumologic: Option<SumologicCredentials>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DatadogCredentials {
    pub api_key: String,
    pub url: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DynatraceCredentials {
    pub api_token: String,
    pub url: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct BasicCredentials {
    pub user: String,
    pub password: String,
    pub url: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct GenericHttpCredentials {
    pub user: Option<String>,
    pub password: Option<String>,
    pub url: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct SplunkCredentials {
    pub splunk_token: String,
    pub url: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct SumologicCredentials {
    pub url: String,
}

impl LogStreamingCredentials {
    /// Which output type each block belongs to, and whether it is set.
    pub fn present(&self) -> [(&'static str, bool); 7] {
        [
            ("datadog", self.datadog.is_some()),
            ("dynatrace", self.dynatrace.is_some()),
            ("elastic", self.elastic.is_some()),
            ("generic_http", self.generic_http.is_some()),
            ("loki", self.loki.is_some()),
            ("splunk", self.splunk.is_some()),
            ("sumologic", self.sumologic.is_some()),
        ]
    }

    /// Select the block for `output_type` and convert it to the wire shape.
    pub fn to_wire(&self, output_type: &str) -> Result<Credentials> {
        let missing = || {
            ProviderError::validation(format!(
                "{output_type} credentials are required when output_type is '{output_type}'"
            ))
        };
        let basic = |creds: &BasicCredentials| Credentials::Basic {
            url: creds.url.clone(),
            user: creds.user.clone(),
            password: creds.password.clone(),
        };

        match output_type {
            "datadog" => self.datadog.as_ref().map(|c| Credentials::Datadog {
                url: c.url.clone(),
                api_key: c.api_key.clone(),
            }),
            "dynatrace" => self.dynatrace.as_ref().map(|c| Credentials::Dynatrace {
                url: c.url.clone(),
                api_token: c.api_token.clone(),
            }),
            "elastic" => self.elastic.as_ref().map(basic),
            "loki" => self.loki.as_ref().map(basic),
            "generic_http" => self.generic_http.as_ref().map(|c| Credentials::GenericHttp {
                url: c.url.clone(),
                user: c.user.clone(),
                password: c.password.clone(),
            }),
            "splunk" => self.splunk.as_ref().map(|c| Credentials::Splunk {
                url: c.url.clone(),
                splunk_token: c.splunk_token.clone(),
            }),
            "sumologic" => self.sumologic.as_ref().map(|c| Credentials::Sumologic { url: c.url.clone() }),
            other => {
                return Err(ProviderError::validation(format!("unsupported output_type: {other}")));
            },
        }
        .ok_or_else(missing)
    }
}

impl LogStreaming {
    pub fn ids(&self) -> Result<ResourceIds> {
        resolve(
            &[
                (APP_SERVICE_ID, self.app_service_id.as_deref()),
                (CLUSTER_ID, self.cluster_id.as_deref()),
                (PROJECT_ID, self.project_id.as_deref()),
                (ORGANIZATION_ID, self.organization_id.as_deref()),
            ],
            APP_SERVICE_ID,
        )
    }

    pub fn to_request(&self) -> Result<PostLogStreamingRequest> {
        let output_type = self
            .output_type
            .as_deref()
            .ok_or_else(|| ProviderError::validation("output_type is required"))?;
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ProviderError::validation("credentials are required"))?;

        Ok(PostLogStreamingRequest {
            output_type: output_type.to_string(),
            credentials: credentials.to_wire(output_type)?,
        })
    }

    pub fn from_response(
        response: GetLogStreamingResponse,
        ids: &ResourceIds,
        credentials: Option<LogStreamingCredentials>,
    ) -> Result<Self> {
        Ok(LogStreaming {
            organization_id: Some(ids.value(ORGANIZATION_ID)?.to_string()),
            project_id: Some(ids.value(PROJECT_ID)?.to_string()),
            cluster_id: Some(ids.value(CLUSTER_ID)?.to_string()),
            app_service_id: Some(ids.value(APP_SERVICE_ID)?.to_string()),
            output_type: response.output_type,
            config_state: response.config_state,
            streaming_state: response.streaming_state,
            credentials,
        })
    }
}
