use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use schemars::{schema_for, Schema};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use capella_provider_common::telemetry::{info, warn};

use crate::api::gsi::{IndexBuildStatusResponse, IndexDdlRequest, IndexDdlResponse, IndexDefinitionResponse, READY};
use crate::api::{EndpointCfg, Payload};
use crate::error::{ProviderError, Result};
use crate::provider::context::Context;
use crate::provider::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest, ImportStateResponse,
    ReadRequest, ReadResponse, State, UpdateRequest, UpdateResponse, ValidateConfigRequest,
    ValidateConfigResponse,
};
use crate::provider::traits::{
    import_state_passthrough_id, Resource, ResourceWithImportState, ResourceWithValidateConfig,
};
use crate::reconcile::ids::{ResourceIds, CLUSTER_ID, ORGANIZATION_ID, PROJECT_ID};
use crate::reconcile::poll::Poller;
use crate::resources::utils::{configured, remove_if_not_found, required, send};
use crate::schema::gsi::{QueryIndex, BUCKET_NAME, COLLECTION_NAME, INDEX_NAME, SCOPE_NAME};

static BUILD_IN_PROGRESS: &str = "build already in progress";

#[derive(Default)]
pub struct QueryIndexResource {
    ctx: Option<Arc<Context>>,
}

/// The keyspace and cluster an index lives in.
#[derive(Debug, Clone, PartialEq)]
struct Keyspace<'a> {
    organization_id: &'a str,
    project_id: &'a str,
    cluster_id: &'a str,
    bucket: &'a str,
    scope: &'a str,
    collection: &'a str,
}

impl<'a> Keyspace<'a> {
    fn of(index: &'a QueryIndex) -> Result<Self> {
        Ok(Keyspace {
            organization_id: required(&index.organization_id, ORGANIZATION_ID)?,
            project_id: required(&index.project_id, PROJECT_ID)?,
            cluster_id: required(&index.cluster_id, CLUSTER_ID)?,
            bucket: required(&index.bucket_name, BUCKET_NAME)?,
            scope: required(&index.scope_name, SCOPE_NAME)?,
            collection: required(&index.collection_name, COLLECTION_NAME)?,
        })
    }

    fn query_service_path(&self) -> String {
        format!(
            "/v4/organizations/{}/projects/{}/clusters/{}/queryService",
            self.organization_id, self.project_id, self.cluster_id,
        )
    }

    /// URL of a per-index endpoint, the index name escaped as a single
    /// path segment.
    fn index_url(&self, ctx: &Context, endpoint: &str, index_name: &str) -> Result<String> {
        let base = ctx.url(&format!("{}/{endpoint}", self.query_service_path()))?;
        let mut url = Url::parse(&base).map_err(|e| ProviderError::validation(format!("invalid host: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::validation("host cannot carry a path"))?
            .push(index_name);
        url.query_pairs_mut()
            .append_pair("bucket", self.bucket)
            .append_pair("scope", self.scope)
            .append_pair("collection", self.collection);
        Ok(url.to_string())
    }

    fn target(&self) -> String {
        format!("`{}`.`{}`.`{}`", self.bucket, self.scope, self.collection)
    }
}

/// Attributes of the `WITH` clause of a secondary index. Zero and false
/// values are left out.
#[derive(Serialize, Debug, Default)]
struct WithClause {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    defer_build: bool,
    #[serde(skip_serializing_if = "is_zero")]
    num_replica: i64,
    #[serde(skip_serializing_if = "is_zero")]
    num_partition: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

pub fn build_ddl(bucket: &str, scope: &str, collection: &str, indexes: &[String]) -> String {
    format!("BUILD INDEX ON `{bucket}`.`{scope}`.`{collection}`({})", indexes.join(","))
}

pub fn create_primary_ddl(
    name: &str,
    bucket: &str,
    scope: &str,
    collection: &str,
    defer_build: bool,
    num_replica: i64,
) -> String {
    format!(
        "CREATE PRIMARY INDEX `{name}` ON `{bucket}`.`{scope}`.`{collection}`  WITH {{ \"defer_build\": {defer_build},  \"num_replica\": {num_replica} }}"
    )
}

/// `CREATE INDEX` for a secondary index, with the optional partition,
/// where and with clauses appended in that order.
pub fn create_secondary_ddl(index: &QueryIndex) -> Result<String> {
    let keyspace = Keyspace::of(index)?;
    let keys = index.index_keys.as_deref().unwrap_or_default().join(",");
    let mut ddl = format!("CREATE INDEX `{}` ON {}({keys}) ", index.ddl_name(), keyspace.target());

    if let Some(partition_by) = &index.partition_by {
        ddl.push_str(&format!(" PARTITION BY HASH({}) ", partition_by.join(",")));
    }
    if let Some(where_clause) = &index.where_clause {
        ddl.push_str(&format!(" WHERE {where_clause} "));
    }
    if let Some(with) = &index.with {
        let clause = WithClause {
            defer_build: with.defer_build.unwrap_or(false),
            num_replica: with.num_replica.unwrap_or(0),
            num_partition: with.num_partition.unwrap_or(0),
        };
        let json = serde_json::to_string(&clause).map_err(ProviderError::Encode)?;
        if json != "{}" {
            ddl.push_str(" WITH ");
            ddl.push_str(&json);
        }
    }
    Ok(ddl)
}

pub fn alter_replica_ddl(name: &str, bucket: &str, scope: &str, collection: &str, num_replica: i64) -> String {
    format!(
        "ALTER INDEX `{name}` ON `{bucket}`.`{scope}`.`{collection}` WITH {{ \"action\": \"replica_count\", \"num_replica\" : {num_replica} }}"
    )
}

pub fn drop_ddl(name: &str, bucket: &str, scope: &str, collection: &str) -> String {
    format!("DROP INDEX `{name}` ON `{bucket}`.`{scope}`.`{collection}`")
}

/// The statement a create executes for a plan.
fn create_ddl(plan: &QueryIndex) -> Result<String> {
    let keyspace = Keyspace::of(plan)?;
    let (bucket, scope, collection) = (keyspace.bucket, keyspace.scope, keyspace.collection);

    if let Some(indexes) = &plan.build_indexes {
        return Ok(build_ddl(bucket, scope, collection, indexes));
    }
    if plan.is_primary() {
        let with = plan.with.clone().unwrap_or_default();
        return Ok(create_primary_ddl(
            plan.ddl_name(),
            bucket,
            scope,
            collection,
            with.defer_build.unwrap_or(false),
            with.num_replica.unwrap_or(0),
        ));
    }
    create_secondary_ddl(plan)
}

fn is_build_in_progress(error: &ProviderError) -> bool {
    let message = match error {
        ProviderError::Api(api) if api.http_status_code == StatusCode::INTERNAL_SERVER_ERROR.as_u16() => &api.message,
        ProviderError::UnexpectedStatus { status: 500, body, .. } => body,
        _ => return false,
    };
    message.to_lowercase().contains(BUILD_IN_PROGRESS)
}

/// Run a statement through the query service. A `200` carrying an
/// `errors` array is still a failure.
async fn execute_ddl(ctx: &Context, cancel: &CancellationToken, keyspace: &Keyspace<'_>, ddl: &str) -> Result<()> {
    info!(event = "ExecutingIndexDdl", ddl = ddl);

    let response = send(
        ctx,
        cancel,
        Method::POST,
        &format!("{}/indexes", keyspace.query_service_path()),
        StatusCode::OK,
        Payload::json(&IndexDdlRequest { definition: ddl.to_string() })?,
        &[],
    )
    .await
    .map_err(|e| if is_build_in_progress(&e) { ProviderError::IndexBuildInProgress } else { e })?;

    let body: IndexDdlResponse = if response.body.trim().is_empty() {
        IndexDdlResponse::default()
    } else {
        response.json()?
    };
    match body.errors {
        Some(errors) => Err(ProviderError::Query(
            errors.into_iter().next().map(|e| e.msg).unwrap_or_default(),
        )),
        None => Ok(()),
    }
}

async fn get_index(
    ctx: &Context,
    cancel: &CancellationToken,
    keyspace: &Keyspace<'_>,
    index_name: &str,
) -> Result<IndexDefinitionResponse> {
    let cfg = EndpointCfg::new(keyspace.index_url(ctx, "indexes", index_name)?, Method::GET, StatusCode::OK);
    ctx.client
        .execute_with_retry(cancel, &cfg, &Payload::Empty, ctx.token()?, &[])
        .await?
        .json()
}

/// Wait until every index of a deferred build reports `Ready`.
async fn watch_build(ctx: &Context, cancel: &CancellationToken, keyspace: &Keyspace<'_>, indexes: &[String]) -> Result<()> {
    let settings = &ctx.config()?.polling.index_build;
    for index in indexes {
        let url = keyspace.index_url(ctx, "indexBuildStatus", index)?;
        let url = url.as_str();
        Poller::new(format!("index {index}"), READY, settings)
            .with_cancellation(cancel.clone())
            .wait(|| async move {
                let cfg = EndpointCfg::new(url, Method::GET, StatusCode::OK);
                let status: IndexBuildStatusResponse = ctx
                    .client
                    .execute_with_retry(cancel, &cfg, &Payload::Empty, ctx.token()?, &[])
                    .await?
                    .json()?;
                Ok(status.status)
            })
            .await?;
    }
    Ok(())
}

/// Cross-attribute checks on a query index configuration.
///
/// Primary indexes carry no keys, where or partition clause. Secondary
/// indexes need a name and keys, and `num_partition` only makes sense with
/// `partition_by`. A deferred build excludes the other optional
/// attributes.
fn validate(config: &QueryIndex, resp: &mut ValidateConfigResponse) {
    if config.build_indexes.is_some() {
        if config.is_primary.is_some()
            || config.index_name.is_some()
            || config.index_keys.is_some()
            || config.where_clause.is_some()
            || config.partition_by.is_some()
        {
            resp.diagnostics.add_attribute_error(
                "build_indexes",
                "Invalid Attribute Configuration",
                "build_indexes is set so other optional attributes must be null",
            );
        }
        return;
    }

    if config.is_primary() {
        if config.index_keys.is_some() || config.where_clause.is_some() || config.partition_by.is_some() {
            resp.diagnostics.add_attribute_error(
                "is_primary",
                "Invalid Attribute Configuration",
                "A primary index cannot have index keys, where clause or partition by clause",
            );
        }
        return;
    }

    if config.index_name.as_deref().unwrap_or_default().is_empty() {
        resp.diagnostics.add_attribute_error(
            "index_name",
            "Missing Attribute Configuration",
            "Expected index_name to be configured but is null",
        );
        return;
    }
    if config.index_keys.is_none() {
        resp.diagnostics.add_attribute_error(
            "index_keys",
            "Missing Attribute Configuration",
            "Expected index_keys to be configured but is null",
        );
        return;
    }
    let num_partition = config.with.as_ref().and_then(|with| with.num_partition);
    if config.partition_by.is_none() && num_partition.is_some() {
        resp.diagnostics.add_attribute_error(
            "with",
            "Invalid Attribute Configuration",
            "Cannot set num_partition for a non-partitioned index",
        );
    }
}

#[async_trait]
impl Resource for QueryIndexResource {
    fn type_suffix(&self) -> &'static str {
        "query_indexes"
    }

    fn schema(&self) -> Schema {
        schema_for!(QueryIndex)
    }

    fn configure(&mut self, ctx: Arc<Context>) {
        self.ctx = Some(ctx);
    }

    async fn create(&self, req: &CreateRequest, resp: &mut CreateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: QueryIndex = req.plan.get()?;
        let keyspace = Keyspace::of(&plan)?;
        let ddl = create_ddl(&plan)?;

        match execute_ddl(ctx, &req.cancel, &keyspace, &ddl).await {
            Ok(()) => {},
            Err(ProviderError::IndexBuildInProgress) => {
                // Saved so a refresh can pick the index up once the indexer
                // retries the build.
                warn!(event = "IndexBuildInProgress", index = plan.ddl_name(), keyspace = keyspace.target());
                resp.state.set(&plan)?;
                return Err(ProviderError::IndexBuildInProgress);
            },
            Err(e) => return Err(e),
        }

        if let Some(indexes) = &plan.build_indexes {
            watch_build(ctx, &req.cancel, &keyspace, indexes).await?;
        }
        resp.state.set(&plan)
    }

    async fn read(&self, req: &ReadRequest, resp: &mut ReadResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let mut state: QueryIndex = req.state.get()?;

        // A deferred build has nothing to read back.
        if state.is_build() {
            return Ok(());
        }

        let ids = state.ids()?;
        let keyspace = Keyspace {
            organization_id: ids.value(ORGANIZATION_ID)?,
            project_id: ids.value(PROJECT_ID)?,
            cluster_id: ids.value(CLUSTER_ID)?,
            bucket: ids.value(BUCKET_NAME)?,
            scope: ids.value(SCOPE_NAME)?,
            collection: ids.value(COLLECTION_NAME)?,
        };
        let fetched = get_index(ctx, &req.cancel, &keyspace, ids.value(INDEX_NAME)?).await;
        let Some(index) = remove_if_not_found(fetched, resp)? else {
            return Ok(());
        };

        state.refresh(index, &ids)?;
        resp.state.set(&state)
    }

    async fn update(&self, req: &UpdateRequest, resp: &mut UpdateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: QueryIndex = req.plan.get()?;
        let keyspace = Keyspace::of(&plan)?;

        // Only the replica count can change in place.
        let num_replica = plan.with.as_ref().and_then(|with| with.num_replica).unwrap_or(0);
        let ddl = alter_replica_ddl(
            plan.ddl_name(),
            keyspace.bucket,
            keyspace.scope,
            keyspace.collection,
            num_replica,
        );
        execute_ddl(ctx, &req.cancel, &keyspace, &ddl).await?;
        resp.state.set(&plan)
    }

    async fn delete(&self, req: &DeleteRequest, _resp: &mut DeleteResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: QueryIndex = req.state.get()?;

        // Dropping a deferred build only forgets it.
        if state.is_build() {
            return Ok(());
        }

        let keyspace = Keyspace::of(&state)?;
        let ddl = drop_ddl(state.ddl_name(), keyspace.bucket, keyspace.scope, keyspace.collection);
        execute_ddl(ctx, &req.cancel, &keyspace, &ddl).await
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }

    fn as_validate_config(&self) -> Option<&dyn ResourceWithValidateConfig> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for QueryIndexResource {
    async fn import_state(&self, req: &ImportStateRequest, resp: &mut ImportStateResponse) -> Result<()> {
        import_state_passthrough_id(INDEX_NAME, req, resp)
    }

    fn identifiers(&self, state: &State) -> Result<ResourceIds> {
        state.get::<QueryIndex>()?.ids()
    }
}

impl ResourceWithValidateConfig for QueryIndexResource {
    fn validate_config(&self, req: &ValidateConfigRequest, resp: &mut ValidateConfigResponse) -> Result<()> {
        let config: QueryIndex = req.config.get()?;
        validate(&config, resp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::schema::gsi::IndexOptions;

    fn secondary() -> QueryIndex {
        QueryIndex {
            organization_id: Some("o".into()),
            project_id: Some("p".into()),
            cluster_id: Some("c".into()),
            bucket_name: Some("b".into()),
            scope_name: Some("s".into()),
            collection_name: Some("c".into()),
            index_name: Some("idx".into()),
            index_keys: Some(vec!["k1".into(), "k2".into()]),
            ..Default::default()
        }
    }

    #[test]
    fn build_statement() {
        assert_eq!(
            build_ddl("b", "s", "c", &["i1".to_string(), "i2".to_string()]),
            "BUILD INDEX ON `b`.`s`.`c`(i1,i2)",
        );
    }

    #[test]
    fn primary_statement_defaults_name() {
        let plan = QueryIndex { is_primary: Some(true), index_name: None, index_keys: None, ..secondary() };

        assert_eq!(
            create_ddl(&plan).unwrap(),
            "CREATE PRIMARY INDEX `#primary` ON `b`.`s`.`c`  WITH { \"defer_build\": false,  \"num_replica\": 0 }",
        );
    }

    #[test]
    fn secondary_statement_with_every_clause() {
        let plan = QueryIndex {
            partition_by: Some(vec!["meta().id".into()]),
            where_clause: Some("age > 21".into()),
            with: Some(IndexOptions { defer_build: Some(true), num_replica: Some(1), num_partition: Some(8) }),
            ..secondary()
        };

        assert_eq!(
            create_ddl(&plan).unwrap(),
            "CREATE INDEX `idx` ON `b`.`s`.`c`(k1,k2)  PARTITION BY HASH(meta().id)  WHERE age > 21  WITH {\"defer_build\":true,\"num_replica\":1,\"num_partition\":8}",
        );
    }

    #[test]
    fn empty_with_clause_is_omitted() {
        let plan = QueryIndex {
            with: Some(IndexOptions { defer_build: Some(false), num_replica: Some(0), num_partition: None }),
            ..secondary()
        };

        assert_eq!(create_ddl(&plan).unwrap(), "CREATE INDEX `idx` ON `b`.`s`.`c`(k1,k2) ");
    }

    #[test]
    fn alter_and_drop_statements() {
        assert_eq!(
            alter_replica_ddl("idx", "b", "s", "c", 2),
            "ALTER INDEX `idx` ON `b`.`s`.`c` WITH { \"action\": \"replica_count\", \"num_replica\" : 2 }",
        );
        assert_eq!(drop_ddl("idx", "b", "s", "c"), "DROP INDEX `idx` ON `b`.`s`.`c`");
    }

    #[test]
    fn build_in_progress_is_recognised() {
        let mut api = ApiError::new(500, "Build Already In Progress for keyspace");
        api.code = 1;

        assert!(is_build_in_progress(&ProviderError::Api(api)));
        assert!(!is_build_in_progress(&ProviderError::GatewayTimeout));
    }

    fn errors_for(config: QueryIndex) -> Vec<String> {
        let mut resp = ValidateConfigResponse::default();
        validate(&config, &mut resp);
        resp.diagnostics.iter().filter_map(|d| d.attribute.clone()).collect()
    }

    #[test]
    fn validation_rules() {
        assert!(errors_for(secondary()).is_empty());

        let primary_with_keys = QueryIndex { is_primary: Some(true), ..secondary() };
        assert_eq!(errors_for(primary_with_keys), vec!["is_primary"]);

        let unnamed = QueryIndex { index_name: None, ..secondary() };
        assert_eq!(errors_for(unnamed), vec!["index_name"]);

        let keyless = QueryIndex { index_keys: None, ..secondary() };
        assert_eq!(errors_for(keyless), vec!["index_keys"]);

        let unpartitioned = QueryIndex {
            with: Some(IndexOptions { num_partition: Some(4), ..Default::default() }),
            ..secondary()
        };
        assert_eq!(errors_for(unpartitioned), vec!["with"]);

        let build = QueryIndex { build_indexes: Some(vec!["idx".into()]), ..secondary() };
        assert_eq!(errors_for(build), vec!["build_indexes"]);
    }
}
