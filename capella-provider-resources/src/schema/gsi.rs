use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::gsi::IndexDefinitionResponse;
use crate::error::Result;
use crate::reconcile::ids::{resolve, ResourceIds, CLUSTER_ID, ORGANIZATION_ID, PROJECT_ID};

pub static INDEX_NAME: &str = "index_name";
pub static COLLECTION_NAME: &str = "collection_name";
pub static SCOPE_NAME: &str = "scope_name";
pub static BUCKET_NAME: &str = "bucket_name";
pub static PRIMARY_INDEX_NAME: &str = "#primary";

/// A primary or secondary query index, or a deferred build of several.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct QueryIndex {
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub cluster_id: Option<String>,
    pub bucket_name: Option<String>,
    pub scope_name: Option<String>,
    pub collection_name: Option<String>,
    pub index_name: Option<String>,
    pub is_primary: Option<bool>,
    pub index_keys: Option<Vec<String>>,
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
    pub partition_by: Option<Vec<String>>,
    pub with: Option<IndexOptions>,
    /// Names of deferred indexes to build. Excludes every other optional
    /// attribute.
    pub build_indexes: Option<Vec<String>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct IndexOptions {
    pub defer_build: Option<bool>,
    pub num_replica: Option<i64>,
    pub num_partition: Option<i64>,
}

impl QueryIndex {
    pub fn ids(&self) -> Result<ResourceIds> {
        resolve(
            &[
                (INDEX_NAME, self.index_name.as_deref()),
                (COLLECTION_NAME, self.collection_name.as_deref()),
                (SCOPE_NAME, self.scope_name.as_deref()),
                (BUCKET_NAME, self.bucket_name.as_deref()),
                (CLUSTER_ID, self.cluster_id.as_deref()),
                (PROJECT_ID, self.project_id.as_deref()),
                (ORGANIZATION_ID, self.organization_id.as_deref()),
            ],
            INDEX_NAME,
        )
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary.unwrap_or(false)
    }

    pub fn is_build(&self) -> bool {
        self.build_indexes.is_some()
    }

    /// Name used in DDL, primary indexes default to `#primary`.
    pub fn ddl_name(&self) -> &str {
        match self.index_name.as_deref() {
            Some(name) => name,
            None if self.is_primary() => PRIMARY_INDEX_NAME,
            None => "",
        }
    }

    /// Refresh from the index definition. A tracked index only picks up
    /// the replica count, an imported one takes every attribute.
    pub fn refresh(&mut self, index: IndexDefinitionResponse, ids: &ResourceIds) -> Result<()> {
        if self.organization_id.is_some() {
            self.with.get_or_insert_with(IndexOptions::default).num_replica = Some(index.num_replica);
            return Ok(());
        }

        self.organization_id = Some(ids.value(ORGANIZATION_ID)?.to_string());
        self.project_id = Some(ids.value(PROJECT_ID)?.to_string());
        self.cluster_id = Some(ids.value(CLUSTER_ID)?.to_string());
        self.bucket_name = Some(ids.value(BUCKET_NAME)?.to_string());
        self.scope_name = Some(ids.value(SCOPE_NAME)?.to_string());
        self.collection_name = Some(ids.value(COLLECTION_NAME)?.to_string());
        self.index_name = Some(ids.value(INDEX_NAME)?.to_string());
        self.is_primary = Some(index.is_primary);
        self.index_keys = Some(index.sec_exprs).filter(|keys| !keys.is_empty());
        self.where_clause = index.where_clause.filter(|w| !w.is_empty());
        self.partition_by = index
            .partition_by
            .filter(|p| !p.is_empty())
            .map(|p| vec![p]);
        self.with = Some(IndexOptions {
            defer_build: None,
            num_replica: Some(index.num_replica),
            num_partition: Some(index.num_partition).filter(|n| *n > 0),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_fills_every_attribute() {
        let mut index = QueryIndex {
            index_name: Some(
                "index_name=idx1,collection_name=c,scope_name=s,bucket_name=b,cluster_id=cl,project_id=p,organization_id=o"
                    .into(),
            ),
            ..Default::default()
        };
        let ids = index.ids().unwrap();

        index
            .refresh(
                IndexDefinitionResponse {
                    index_name: "idx1".into(),
                    sec_exprs: vec!["`age`".into()],
                    num_replica: 1,
                    ..Default::default()
                },
                &ids,
            )
            .unwrap();

        assert_eq!(index.index_name.as_deref(), Some("idx1"));
        assert_eq!(index.bucket_name.as_deref(), Some("b"));
        assert_eq!(index.index_keys, Some(vec!["`age`".to_string()]));
        assert_eq!(index.with.unwrap().num_replica, Some(1));
    }

    #[test]
    fn tracked_index_only_refreshes_replicas() {
        let mut index = QueryIndex {
            organization_id: Some("o".into()),
            index_keys: Some(vec!["a".into()]),
            ..Default::default()
        };

        index
            .refresh(IndexDefinitionResponse { num_replica: 2, ..Default::default() }, &ResourceIds::new())
            .unwrap();

        assert_eq!(index.index_keys, Some(vec!["a".to_string()]));
        assert_eq!(index.with.unwrap().num_replica, Some(2));
    }

    #[test]
    fn primary_name_defaults() {
        let index = QueryIndex { is_primary: Some(true), ..Default::default() };

        assert_eq!(index.ddl_name(), "#primary");
    }
}
