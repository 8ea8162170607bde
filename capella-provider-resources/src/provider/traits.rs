use async_trait::async_trait;
use schemars::Schema;
use std::sync::Arc;

use crate::error::Result;
use crate::provider::context::Context;
use crate::provider::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest, ImportStateResponse,
    ReadRequest, ReadResponse, State, UpdateRequest, UpdateResponse, ValidateConfigRequest,
    ValidateConfigResponse,
};
use crate::reconcile::ids::ResourceIds;

// Core lifecycle every managed resource implements. An error returned from
// a lifecycle method is turned into an error diagnostic by the dispatcher,
// state already written to the response is kept.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Suffix appended to the provider type name, e.g. `project`.
    fn type_suffix(&self) -> &'static str;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{provider_type_name}_{}", self.type_suffix())
    }

    fn schema(&self) -> Schema;

    fn configure(&mut self, ctx: Arc<Context>);

    async fn create(&self, req: &CreateRequest, resp: &mut CreateResponse) -> Result<()>;

    async fn read(&self, req: &ReadRequest, resp: &mut ReadResponse) -> Result<()>;

    async fn update(&self, req: &UpdateRequest, resp: &mut UpdateResponse) -> Result<()>;

    async fn delete(&self, req: &DeleteRequest, resp: &mut DeleteResponse) -> Result<()>;

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        None
    }

    fn as_validate_config(&self) -> Option<&dyn ResourceWithValidateConfig> {
        None
    }
}

// Resources that can be adopted from an import identifier
#[async_trait]
pub trait ResourceWithImportState: Resource {
    async fn import_state(&self, req: &ImportStateRequest, resp: &mut ImportStateResponse) -> Result<()>;

    /// Identifiers carried by a stored or freshly imported state.
    fn identifiers(&self, state: &State) -> Result<ResourceIds>;
}

// Resources with checks across several attributes of their configuration
pub trait ResourceWithValidateConfig: Resource {
    fn validate_config(&self, req: &ValidateConfigRequest, resp: &mut ValidateConfigResponse) -> Result<()>;
}

// Read-only lookups
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_suffix(&self) -> &'static str;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{provider_type_name}_{}", self.type_suffix())
    }

    fn schema(&self) -> Schema;

    fn configure(&mut self, ctx: Arc<Context>);

    async fn read(&self, req: &ReadRequest, resp: &mut ReadResponse) -> Result<()>;
}

/// Write the raw import identifier to `attribute`, to be decoded by the
/// following read.
///
/// # Arguments
/// * `attribute` - The root attribute that holds the import string
/// * `req` - The import request
/// * `resp` - The import response
pub fn import_state_passthrough_id(
    attribute: &str,
    req: &ImportStateRequest,
    resp: &mut ImportStateResponse,
) -> Result<()> {
    resp.state.set_attribute(attribute, req.id.as_str())
}
