pub mod context;
pub mod diagnostics;
pub mod request;
pub mod traits;

use schemars::Schema;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use capella_provider_common::config::AppConfig;
use capella_provider_common::telemetry::{error, info};

use crate::datasources::projects::ProjectsDataSource;
use crate::error::{ProviderError, Result};
use crate::reconcile::ids::ResourceIds;
use crate::resources::{
    allowlist::AllowListResource, api_key::ApiKeyResource, cluster::ClusterResource,
    collection::CollectionResource, gsi::QueryIndexResource, log_streaming::LogStreamingResource,
    project::ProjectResource, scope::ScopeResource, user::UserResource,
};
use context::Context;
use request::{
    CreateRequest, DeleteRequest, ImportStateRequest, ReadRequest, Response, State, UpdateRequest,
    ValidateConfigRequest,
};
use traits::{DataSource, Resource};

pub type ResourceFactory = fn() -> Box<dyn Resource>;
pub type DataSourceFactory = fn() -> Box<dyn DataSource>;

fn boxed_resource<R: Resource + Default + 'static>() -> Box<dyn Resource> {
    Box::new(R::default())
}

fn boxed_data_source<D: DataSource + Default + 'static>() -> Box<dyn DataSource> {
    Box::new(D::default())
}

static RESOURCES: [(&str, ResourceFactory); 9] = [
    ("project", boxed_resource::<ProjectResource>),
    ("cluster", boxed_resource::<ClusterResource>),
    ("allowlist", boxed_resource::<AllowListResource>),
    ("scope", boxed_resource::<ScopeResource>),
    ("collection", boxed_resource::<CollectionResource>),
    ("apikey", boxed_resource::<ApiKeyResource>),
    ("user", boxed_resource::<UserResource>),
    ("query_indexes", boxed_resource::<QueryIndexResource>),
    ("app_service_log_streaming", boxed_resource::<LogStreamingResource>),
];

static DATA_SOURCES: [(&str, DataSourceFactory); 1] = [
    ("projects", boxed_data_source::<ProjectsDataSource>),
];

/// Every managed resource, keyed by type suffix.
pub fn resource_factories() -> &'static [(&'static str, ResourceFactory)] {
    &RESOURCES
}

pub fn data_source_factories() -> &'static [(&'static str, DataSourceFactory)] {
    &DATA_SOURCES
}

/// Host-agnostic driver of the resource lifecycle.
///
/// Looks up the resource for a type name, configures it with the shared
/// context and turns whatever it returns into a response. Lifecycle errors
/// never escape as `Err`, they end up as error diagnostics.
pub struct Provider {
    context: Arc<Context>,
    type_name: String,
}

impl Provider {
    /// Create a new provider
    ///
    /// # Arguments
    /// * `config` - The provider configuration
    ///
    /// # Returns
    /// A Result containing the Provider or an error if the API client could
    /// not be built
    pub fn new(config: AppConfig) -> Result<Self> {
        let type_name = config.provider.type_name.clone();
        let context = Arc::new(Context::from_config(config)?);
        Ok(Provider { context, type_name })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Full type names of all resources.
    pub fn resource_type_names(&self) -> Vec<String> {
        resource_factories()
            .iter()
            .map(|(suffix, _)| format!("{}_{suffix}", self.type_name))
            .collect()
    }

    pub fn data_source_type_names(&self) -> Vec<String> {
        data_source_factories()
            .iter()
            .map(|(suffix, _)| format!("{}_{suffix}", self.type_name))
            .collect()
    }

    /// Schemas of every resource and data source, keyed by full type name.
    pub fn schemas(&self) -> BTreeMap<String, Schema> {
        let resources = resource_factories().iter().map(|(_, factory)| {
            let resource = factory();
            (resource.metadata(&self.type_name), resource.schema())
        });
        let data_sources = data_source_factories().iter().map(|(_, factory)| {
            let data_source = factory();
            (format!("data.{}", data_source.metadata(&self.type_name)), data_source.schema())
        });

        resources.chain(data_sources).collect()
    }

    fn suffix<'a>(&self, type_name: &'a str) -> &'a str {
        type_name
            .strip_prefix(self.type_name.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(type_name)
    }

    /// Look up and configure the resource for a full type name or a bare
    /// suffix.
    pub fn resource(&self, type_name: &str) -> Result<Box<dyn Resource>> {
        let suffix = self.suffix(type_name);
        let (_, factory) = resource_factories()
            .iter()
            .find(|(name, _)| *name == suffix)
            .ok_or_else(|| ProviderError::validation(format!("unknown resource type `{type_name}`")))?;

        let mut resource = factory();
        resource.configure(self.context.clone());
        Ok(resource)
    }

    pub fn data_source(&self, type_name: &str) -> Result<Box<dyn DataSource>> {
        let suffix = self.suffix(type_name);
        let (_, factory) = data_source_factories()
            .iter()
            .find(|(name, _)| *name == suffix)
            .ok_or_else(|| ProviderError::validation(format!("unknown data source type `{type_name}`")))?;

        let mut data_source = factory();
        data_source.configure(self.context.clone());
        Ok(data_source)
    }

    pub async fn create(&self, type_name: &str, plan: State, cancel: CancellationToken) -> Response {
        let mut resp = Response::default();
        let result = match self.resource(type_name) {
            Ok(resource) => resource.create(&CreateRequest { plan, cancel }, &mut resp).await,
            Err(e) => Err(e),
        };
        finish("Create", type_name, result, resp)
    }

    pub async fn read(&self, type_name: &str, state: State, cancel: CancellationToken) -> Response {
        let mut resp = Response { state: state.clone(), ..Default::default() };
        let result = match self.resource(type_name) {
            Ok(resource) => resource.read(&ReadRequest { state, cancel }, &mut resp).await,
            Err(e) => Err(e),
        };
        finish("Read", type_name, result, resp)
    }

    pub async fn update(&self, type_name: &str, plan: State, state: State, cancel: CancellationToken) -> Response {
        let mut resp = Response { state: plan.clone(), ..Default::default() };
        let result = match self.resource(type_name) {
            Ok(resource) => resource.update(&UpdateRequest { plan, state, cancel }, &mut resp).await,
            Err(e) => Err(e),
        };
        finish("Update", type_name, result, resp)
    }

    pub async fn delete(&self, type_name: &str, state: State, cancel: CancellationToken) -> Response {
        let mut resp = Response { state: state.clone(), ..Default::default() };
        let result = match self.resource(type_name) {
            Ok(resource) => resource.delete(&DeleteRequest { state, cancel }, &mut resp).await,
            Err(e) => Err(e),
        };

        let mut resp = finish("Delete", type_name, result, resp);
        if !resp.diagnostics.has_error() {
            resp.state.remove();
        }
        resp
    }

    /// Import a resource and read it back, as the host does after an
    /// import.
    pub async fn import_state(&self, type_name: &str, id: &str, cancel: CancellationToken) -> Response {
        let mut resp = Response::default();
        let result = match self.resource(type_name) {
            Ok(resource) => match resource.as_import_state() {
                Some(importer) => {
                    let req = ImportStateRequest { id: id.to_string(), cancel: cancel.clone() };
                    importer.import_state(&req, &mut resp).await
                },
                None => Err(ProviderError::validation(format!("resource `{type_name}` does not support import"))),
            },
            Err(e) => Err(e),
        };

        let resp = finish("ImportState", type_name, result, resp);
        if resp.diagnostics.has_error() {
            return resp;
        }
        self.read(type_name, resp.state, cancel).await
    }

    /// Decode an import identifier the way the resource's import would,
    /// without contacting the API.
    ///
    /// # Arguments
    /// * `type_name` - Full type name or bare suffix of the resource
    /// * `id` - The import identifier
    ///
    /// # Returns
    /// The identifiers in the resource's import order
    pub async fn parse_import_id(&self, type_name: &str, id: &str) -> Result<ResourceIds> {
        let resource = self.resource(type_name)?;
        let importer = resource
            .as_import_state()
            .ok_or_else(|| ProviderError::validation(format!("resource `{type_name}` does not support import")))?;

        let mut resp = Response::default();
        let req = ImportStateRequest { id: id.to_string(), cancel: CancellationToken::new() };
        importer.import_state(&req, &mut resp).await?;
        importer.identifiers(&resp.state)
    }

    pub fn validate_config(&self, type_name: &str, config: State) -> Response {
        let mut resp = Response::default();
        let result = self.resource(type_name).and_then(|resource| match resource.as_validate_config() {
            Some(validator) => {
                let req = ValidateConfigRequest { config, cancel: CancellationToken::new() };
                validator.validate_config(&req, &mut resp)
            },
            None => Ok(()),
        });
        finish("ValidateConfig", type_name, result, resp)
    }

    pub async fn read_data_source(&self, type_name: &str, config: State, cancel: CancellationToken) -> Response {
        let mut resp = Response { state: config.clone(), ..Default::default() };
        let result = match self.data_source(type_name) {
            Ok(data_source) => data_source.read(&ReadRequest { state: config, cancel }, &mut resp).await,
            Err(e) => Err(e),
        };
        finish("ReadDataSource", type_name, result, resp)
    }
}

fn finish(operation: &str, type_name: &str, result: Result<()>, mut resp: Response) -> Response {
    match result {
        Ok(()) => info!(
            event = "LifecycleCompleted",
            operation = operation,
            resource = type_name,
            diagnostics = resp.diagnostics.len(),
        ),
        Err(e) => {
            error!(
                event = "LifecycleFailed",
                operation = operation,
                resource = type_name,
                error = %e,
            );
            resp.diagnostics.add_error(&format!("Error during {operation} of {type_name}"), &e.to_string());
        },
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> Provider {
        Provider::new(AppConfig::default()).unwrap()
    }

    #[test]
    fn registry_names_are_unique() {
        let mut names: Vec<&str> = resource_factories().iter().map(|(name, _)| *name).collect();
        names.sort();
        names.dedup();

        assert_eq!(names.len(), resource_factories().len());
    }

    #[test]
    fn factories_agree_with_type_suffix() {
        for (name, factory) in resource_factories() {
            assert_eq!(factory().type_suffix(), *name);
        }
        for (name, factory) in data_source_factories() {
            assert_eq!(factory().type_suffix(), *name);
        }
    }

    #[test]
    fn resolves_full_and_bare_type_names() {
        let provider = provider();

        assert!(provider.resource("couchbase-capella_project").is_ok());
        assert!(provider.resource("project").is_ok());
        assert!(provider.resource("couchbase-capella_bucket").is_err());
    }

    #[test]
    fn schemas_cover_resources_and_data_sources() {
        let schemas = provider().schemas();

        assert!(schemas.contains_key("couchbase-capella_user"));
        assert!(schemas.contains_key("data.couchbase-capella_projects"));
        assert_eq!(schemas.len(), RESOURCES.len() + DATA_SOURCES.len());
    }

    #[tokio::test]
    async fn unknown_type_becomes_error_diagnostic() {
        let resp = provider()
            .read("couchbase-capella_bucket", State::new(json!({"id": "x"})), CancellationToken::new())
            .await;

        assert!(resp.diagnostics.has_error());
        assert_eq!(resp.state, State::new(json!({"id": "x"})));
    }

    #[tokio::test]
    async fn malformed_import_string_is_reported() {
        let resp = provider()
            .import_state("couchbase-capella_project", "id=p1,organization_id", CancellationToken::new())
            .await;

        // the read decodes the import string and rejects the bad segment
        assert!(resp.diagnostics.has_error());
    }

    #[tokio::test]
    async fn import_id_is_parsed_in_import_order() {
        let ids = provider()
            .parse_import_id("scope", "scope_name=inventory,bucket_id=b,cluster_id=c,project_id=p,organization_id=o")
            .await
            .unwrap();

        assert_eq!(
            ids.keys().collect::<Vec<_>>(),
            vec!["scope_name", "bucket_id", "cluster_id", "project_id", "organization_id"],
        );
        assert_eq!(ids.get("bucket_id"), Some("b"));
    }

    #[tokio::test]
    async fn import_id_missing_a_key_is_rejected() {
        let err = provider()
            .parse_import_id("couchbase-capella_user", "id=u1")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::MissingId(_)), "{err}");
    }
}
