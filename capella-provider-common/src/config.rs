// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use std::path::Path;
use std::time::Duration;
use serde::{Serialize, Deserialize};
use figment::{Figment, Error, providers::{Format, Json, Toml, Yaml, Env, Serialized}};

use crate::constant::{DEFAULT_HOST, DEFAULT_PROVIDER_TYPE_NAME, ENV_PREFIX};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[derive(Default)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}


#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    /// Base URL of the Capella control plane API.
    #[serde(default)]
    pub host: String,
    /// Bearer token sent with every request.
    #[serde(default)]
    pub authentication_token: String,
    /// Prefix of every resource and data source type name.
    #[serde(default)]
    pub type_name: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            host: DEFAULT_HOST.to_string(),
            authentication_token: String::new(),
            type_name: DEFAULT_PROVIDER_TYPE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClientConfig {
    #[serde(default)]
    pub request_timeout_secs: u64,
    /// Overall window in which a single request may be retried.
    #[serde(default)]
    pub retry_timeout_secs: u64,
    #[serde(default)]
    pub retry_wait_ms: u64,
    #[serde(default)]
    pub max_backoff_ms: u64,
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs(self.retry_timeout_secs)
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            request_timeout_secs: 60,
            retry_timeout_secs: 600,
            retry_wait_ms: 2_000,
            max_backoff_ms: 32_000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "PollSettings::log_streaming")]
    pub log_streaming: PollSettings,
    #[serde(default = "PollSettings::cluster")]
    pub cluster: PollSettings,
    #[serde(default = "PollSettings::index_build")]
    pub index_build: PollSettings,
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            log_streaming: PollSettings::log_streaming(),
            cluster: PollSettings::cluster(),
            index_build: PollSettings::index_build(),
        }
    }
}

/// Timing of a single convergence wait.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub timeout_secs: u64,
    /// Delay before the first status fetch, defaults to one interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<u64>,
    /// When set, the interval doubles after every fetch up to this cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_interval_ms: Option<u64>,
}

impl PollSettings {
    pub fn log_streaming() -> Self {
        PollSettings {
            interval_ms: 3_000,
            timeout_secs: 3 * 60,
            initial_delay_ms: None,
            max_interval_ms: None,
        }
    }

    pub fn cluster() -> Self {
        PollSettings {
            interval_ms: 3_000,
            timeout_secs: 60 * 60,
            initial_delay_ms: Some(2 * 60 * 1_000),
            max_interval_ms: None,
        }
    }

    pub fn index_build() -> Self {
        PollSettings {
            interval_ms: 60 * 1_000,
            timeout_secs: 60 * 60,
            initial_delay_ms: None,
            max_interval_ms: Some(20 * 60 * 1_000),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.interval())
    }

    pub fn max_interval(&self) -> Option<Duration> {
        self.max_interval_ms.map(Duration::from_millis)
    }
}

pub struct AppConfigBuilder {
    figment: Figment,
}

impl AppConfigBuilder {
    pub fn with_file(&mut self, path: &str) -> &mut Self {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        self.figment = match extension {
            "json" => self.figment.clone().merge(Json::file(path)),
            "yaml" | "yml" => self.figment.clone().merge(Yaml::file(path)),
            "toml" => self.figment.clone().merge(Toml::file(path)),
            _ => self.figment.clone(),
        };
        self
    }

    pub fn with_env(&mut self) -> &mut Self {
        self.figment = self.figment.clone().merge(Env::prefixed(&format!("{}__", ENV_PREFIX)).split("__"));
        self
    }

    pub fn with_override_option(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.figment = self.figment.clone().merge(Serialized::default(key, value));
        }
        self
    }

    pub fn build(&self) -> Result<AppConfig, Error> {
        self.figment.extract()
    }
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        AppConfigBuilder {
            figment: Figment::from(Serialized::defaults(AppConfig::default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_timings() {
        let config = AppConfigBuilder::default().build().unwrap();

        assert_eq!(config.provider.host, DEFAULT_HOST);
        assert_eq!(config.polling.log_streaming.timeout(), Duration::from_secs(180));
        assert_eq!(config.polling.log_streaming.initial_delay(), Duration::from_secs(3));
        assert_eq!(config.polling.cluster.initial_delay(), Duration::from_secs(120));
        assert_eq!(config.polling.index_build.max_interval(), Some(Duration::from_secs(1200)));
    }

    #[test]
    fn override_option_replaces_nested_key() {
        let config = AppConfigBuilder::default()
            .with_override_option("provider.host", Some("http://localhost:8080"))
            .with_override_option("provider.authentication_token", None)
            .build()
            .unwrap();

        assert_eq!(config.provider.host, "http://localhost:8080");
        assert!(config.provider.authentication_token.is_empty());
    }
}
