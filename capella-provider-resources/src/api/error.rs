use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Error body returned by the Capella v4 API.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub http_status_code: u16,
    #[serde(default)]
    pub message: String,
}

impl ApiError {
    pub fn new(http_status_code: u16, message: &str) -> Self {
        ApiError {
            http_status_code,
            message: message.to_string(),
            ..Default::default()
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{{\"code\":{},\"hint\":\"{}\",\"httpStatusCode\":{},\"message\":\"{}\"}}",
            self.code, self.hint, self.http_status_code, self.message,
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_camel_case_body() {
        let error: ApiError = serde_json::from_str(
            r#"{"code":4025,"hint":"check the id","httpStatusCode":404,"message":"not found"}"#,
        )
        .unwrap();

        assert_eq!(error.code, 4025);
        assert_eq!(error.http_status_code, 404);
        assert_eq!(
            error.to_string(),
            r#"{"code":4025,"hint":"check the id","httpStatusCode":404,"message":"not found"}"#,
        );
    }
}
