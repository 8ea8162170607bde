use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};
use crate::provider::diagnostics::Diagnostics;

/// A resource document as the host stores it. `None` means the resource
/// does not exist in state.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct State(Option<Value>);

pub type Plan = State;
pub type Config = State;

impl State {
    pub fn new(value: Value) -> Self {
        match value {
            Value::Null => State(None),
            value => State(Some(value)),
        }
    }

    pub fn null() -> Self {
        State(None)
    }

    pub fn from_model<T: Serialize>(model: &T) -> Result<Self> {
        serde_json::to_value(model)
            .map(Self::new)
            .map_err(ProviderError::Encode)
    }

    /// Decode the document into a model.
    pub fn get<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self
            .0
            .as_ref()
            .ok_or_else(|| ProviderError::State("no value present".to_string()))?;
        T::deserialize(value).map_err(|e| ProviderError::State(e.to_string()))
    }

    /// Replace the document with a model.
    pub fn set<T: Serialize>(&mut self, model: &T) -> Result<()> {
        *self = Self::from_model(model)?;
        Ok(())
    }

    /// Set a single root attribute, creating the document when absent.
    pub fn set_attribute<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(ProviderError::Encode)?;
        match self.0.get_or_insert_with(|| Value::Object(Map::new())) {
            Value::Object(object) => {
                object.insert(name.to_string(), value);
                Ok(())
            },
            _ => Err(ProviderError::State(format!("cannot set `{name}` on a non-object document"))),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.0.as_ref().and_then(|value| value.get(name))
    }

    /// Remove the resource from state.
    pub fn remove(&mut self) {
        self.0 = None;
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn value(&self) -> Option<&Value> {
        self.0.as_ref()
    }

    pub fn into_value(self) -> Value {
        self.0.unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub plan: Plan,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    pub state: State,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub plan: Plan,
    pub state: State,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    pub state: State,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct ImportStateRequest {
    pub id: String,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct ValidateConfigRequest {
    pub config: Config,
    pub cancel: CancellationToken,
}

/// Outcome of one lifecycle call: the new state plus diagnostics.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub state: State,
    pub diagnostics: Diagnostics,
}

pub type CreateResponse = Response;
pub type ReadResponse = Response;
pub type UpdateResponse = Response;
pub type DeleteResponse = Response;
pub type ImportStateResponse = Response;
pub type ValidateConfigResponse = Response;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_attribute_creates_document() {
        let mut state = State::null();

        state.set_attribute("id", "id=u,organization_id=o").unwrap();

        assert_eq!(state.into_value(), json!({"id": "id=u,organization_id=o"}));
    }

    #[test]
    fn get_on_removed_state_fails() {
        let mut state = State::new(json!({"id": "x"}));
        state.remove();

        assert!(state.is_null());
        assert!(matches!(state.get::<Value>(), Err(ProviderError::State(_))));
    }
}
