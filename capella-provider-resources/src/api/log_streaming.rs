use serde::{Deserialize, Serialize};

pub static ENABLED: &str = "enabled";
pub static DISABLED: &str = "disabled";
/// Config states the log streaming service settles in.
pub static FINAL_STATES: [&str; 4] = ["enabled", "disabled", "paused", "errored"];

/// Collector credentials, serialized in the shape the chosen output expects.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Credentials {
    #[serde(rename_all = "camelCase")]
    Datadog { url: String, api_key: String },
    #[serde(rename_all = "camelCase")]
    Dynatrace { url: String, api_token: String },
    Basic { url: String, user: String, password: String },
    GenericHttp {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        user: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Splunk { url: String, splunk_token: String },
    Sumologic { url: String },
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostLogStreamingRequest {
    pub output_type: String,
    pub credentials: Credentials,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetLogStreamingResponse {
    #[serde(default)]
    pub output_type: Option<String>,
    #[serde(default)]
    pub config_state: Option<String>,
    #[serde(default)]
    pub streaming_state: Option<String>,
}
