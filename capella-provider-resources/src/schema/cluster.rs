use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::cluster as api;
use crate::error::Result;
use crate::reconcile::ids::{resolve, ResourceIds, ID, ORGANIZATION_ID, PROJECT_ID};
use crate::schema::audit::Audit;

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Cluster {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub cloud_provider: CloudProvider,
    pub couchbase_server: Option<CouchbaseServer>,
    pub service_groups: Vec<ServiceGroup>,
    pub availability: Availability,
    pub support: Support,
    pub configuration_type: Option<String>,
    pub app_service_id: Option<String>,
    pub current_state: Option<String>,
    pub if_match: Option<String>,
    pub etag: Option<String>,
    pub audit: Option<Audit>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct CloudProvider {
    #[serde(rename = "type")]
    pub provider_type: String,
    pub region: String,
    pub cidr: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct CouchbaseServer {
    pub version: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ServiceGroup {
    pub node: Node,
    pub num_of_nodes: i64,
    /// Set semantics, the API may return services in any order.
    pub services: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct Node {
    pub compute: Compute,
    pub disk: Disk,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct Compute {
    pub cpu: i64,
    pub ram: i64,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct Disk {
    #[serde(rename = "type")]
    pub disk_type: String,
    pub storage: Option<i64>,
    pub iops: Option<i64>,
    pub autoexpansion: Option<bool>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct Availability {
    #[serde(rename = "type")]
    pub availability_type: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct Support {
    pub plan: String,
    pub timezone: Option<String>,
}

impl From<&ServiceGroup> for api::ServiceGroup {
    fn from(group: &ServiceGroup) -> Self {
        api::ServiceGroup {
            node: api::Node {
                compute: api::Compute { cpu: group.node.compute.cpu, ram: group.node.compute.ram },
                disk: api::Disk {
                    disk_type: group.node.disk.disk_type.clone(),
                    storage: group.node.disk.storage,
                    iops: group.node.disk.iops,
                    autoexpansion: group.node.disk.autoexpansion,
                },
            },
            num_of_nodes: group.num_of_nodes,
            services: group.services.clone(),
        }
    }
}

impl From<api::ServiceGroup> for ServiceGroup {
    fn from(group: api::ServiceGroup) -> Self {
        ServiceGroup {
            node: Node {
                compute: Compute { cpu: group.node.compute.cpu, ram: group.node.compute.ram },
                disk: Disk {
                    disk_type: group.node.disk.disk_type,
                    storage: group.node.disk.storage,
                    iops: group.node.disk.iops,
                    autoexpansion: group.node.disk.autoexpansion,
                },
            },
            num_of_nodes: group.num_of_nodes,
            services: group.services,
        }
    }
}

impl From<&Support> for api::Support {
    fn from(support: &Support) -> Self {
        api::Support {
            plan: support.plan.clone(),
            timezone: support.timezone.clone().unwrap_or_default(),
        }
    }
}

impl Cluster {
    pub fn ids(&self) -> Result<ResourceIds> {
        resolve(
            &[
                (ID, self.id.as_deref()),
                (ORGANIZATION_ID, self.organization_id.as_deref()),
                (PROJECT_ID, self.project_id.as_deref()),
            ],
            ID,
        )
    }

    pub fn to_create_request(&self) -> api::CreateClusterRequest {
        api::CreateClusterRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            cloud_provider: api::CloudProvider {
                provider_type: self.cloud_provider.provider_type.clone(),
                region: self.cloud_provider.region.clone(),
                cidr: self.cloud_provider.cidr.clone(),
            },
            couchbase_server: self
                .couchbase_server
                .as_ref()
                .map(|server| api::CouchbaseServer { version: server.version.clone() }),
            service_groups: self.service_groups.iter().map(Into::into).collect(),
            availability: api::Availability {
                availability_type: self.availability.availability_type.clone(),
            },
            support: (&self.support).into(),
            configuration_type: self
                .configuration_type
                .clone()
                .unwrap_or_else(|| "multiNode".to_string()),
        }
    }

    pub fn to_update_request(&self) -> api::UpdateClusterRequest {
        api::UpdateClusterRequest {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            support: (&self.support).into(),
            service_groups: self.service_groups.iter().map(Into::into).collect(),
        }
    }

    pub fn from_response(cluster: api::GetClusterResponse, organization_id: &str, project_id: &str) -> Self {
        Cluster {
            id: Some(cluster.id),
            organization_id: Some(organization_id.to_string()),
            project_id: Some(project_id.to_string()),
            name: cluster.name,
            description: Some(cluster.description),
            cloud_provider: CloudProvider {
                provider_type: cluster.cloud_provider.provider_type,
                region: cluster.cloud_provider.region,
                cidr: cluster.cloud_provider.cidr,
            },
            couchbase_server: Some(CouchbaseServer { version: cluster.couchbase_server.version }),
            service_groups: cluster.service_groups.into_iter().map(Into::into).collect(),
            availability: Availability { availability_type: cluster.availability.availability_type },
            support: Support {
                plan: cluster.support.plan,
                timezone: Some(cluster.support.timezone).filter(|tz| !tz.is_empty()),
            },
            configuration_type: Some(cluster.configuration_type).filter(|c| !c.is_empty()),
            app_service_id: cluster.app_service_id,
            current_state: Some(cluster.current_state),
            if_match: None,
            etag: cluster.etag,
            audit: Some(cluster.audit.into()),
        }
    }

    /// Keep the planned ordering of services in each service group when
    /// the refreshed group holds the same services.
    pub fn keep_service_order(&mut self, prior: &[ServiceGroup]) {
        if prior.len() != self.service_groups.len() {
            return;
        }
        for (group, previous) in self.service_groups.iter_mut().zip(prior) {
            group.services = crate::reconcile::patch::reconcile_order(&previous.services, &group.services);
        }
    }
}
