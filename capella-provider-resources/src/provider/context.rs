use std::sync::Arc;

use capella_provider_common::config::AppConfig;
use capella_provider_common::state::State;

use crate::api::Client;
use crate::error::{ProviderError, Result};

// Context shared read-only by every configured resource: the API client
// and the provider state
#[derive(Clone, Debug)]
pub struct Context {
    pub client: Client,
    pub state: Option<Arc<State>>,
}

impl Context {
    pub fn new(client: Client) -> Self {
        Self { client, state: None }
    }

    pub fn with_state(mut self, state: Arc<State>) -> Self {
        self.state = Some(state);
        self
    }

    /// Build a context from a loaded configuration
    ///
    /// # Arguments
    /// * `config` - The provider configuration
    ///
    /// # Returns
    /// A Result containing the Context or an error if the client could not
    /// be built
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let client = Client::new(&config.client)?;
        Ok(Self::new(client).with_state(Arc::new(State { config })))
    }

    pub fn config(&self) -> Result<&AppConfig> {
        self.state
            .as_ref()
            .map(|state| &state.config)
            .ok_or(ProviderError::NotConfigured)
    }

    pub fn token(&self) -> Result<&str> {
        Ok(self.config()?.provider.authentication_token.as_str())
    }

    /// Absolute URL of an API path such as `/v4/organizations/{id}`.
    pub fn url(&self, path: &str) -> Result<String> {
        let host = self.config()?.provider.host.trim_end_matches('/');
        Ok(format!("{host}{path}"))
    }
}
