//! EKS node group interface and lifecycle operations.
//!
//! A node group lives inside one cluster and runs its nodes under one IAM
//! role. Either can be declared inline in the configuration or resolved
//! through a relationship to the owning node.

use ::strato_common::{
    anyhow::anyhow,
    arn::Arn,
    error::{Result, StratoError},
    instance::NodeInstance,
    lifecycle::{self, Operation, ResourceInterface},
    relationships,
    remote::RemoteApi,
    resource_id::ResourceId,
    serde::{Deserialize, Serialize},
    serde_json::{self, json, Map, Value},
    tracing::{debug, info, warn},
};

use crate::{CLUSTER_NODE_TYPE, IAM_ROLE_TYPE};

pub const RESOURCE_TYPE: &str = "EKS Node Group";

const NODEGROUPS: &str = "nodegroups";
const NODEGROUP: &str = "nodegroup";
const NODEGROUP_ARN: &str = "nodegroupArn";
const NODEGROUP_RESOURCE_NAME: &str = "nodegroupName";
const CLUSTER_RESOURCE_NAME: &str = "clusterName";

/// Declared configuration of a node group, with the same pass-through tail
/// as the cluster configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(crate = "strato_common::serde")]
pub struct NodeGroupConfig {
    /// Name of the node group. Falls back to the declared resource id or
    /// the instance id when absent.
    #[serde(
        rename = "nodegroupName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub nodegroup_name: Option<String>,
    /// Cluster the node group belongs to. Resolved through the one cluster
    /// relationship when absent.
    #[serde(
        rename = "clusterName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cluster_name: Option<String>,
    /// Role the nodes run under. Resolved through the one IAM role
    /// relationship when absent.
    #[serde(rename = "nodeRole", default, skip_serializing_if = "Option::is_none")]
    pub node_role: Option<Arn>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeGroupConfig {
    /// The exact parameter object the create call sends.
    pub fn to_params(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn validated(&self) -> Result<()> {
        let require = |name: &str, present: bool| {
            if present {
                Ok(())
            } else {
                Err(StratoError::configuration(anyhow!(
                    "{} is required to create an {}.",
                    name,
                    RESOURCE_TYPE
                )))
            }
        };
        require(
            NODEGROUP_RESOURCE_NAME,
            self.nodegroup_name.as_deref().is_some_and(|name| !name.is_empty()),
        )?;
        require(
            CLUSTER_RESOURCE_NAME,
            self.cluster_name.as_deref().is_some_and(|name| !name.is_empty()),
        )?;
        require(
            "nodeRole",
            self.node_role.as_ref().is_some_and(|arn| !arn.as_str().is_empty()),
        )
    }
}

/// Status token of a node group as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeGroupStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    CreateFailed,
    DeleteFailed,
    Degraded,
    /// A token this plugin does not know yet, kept verbatim.
    Other(String),
}

impl NodeGroupStatus {
    pub fn from_token(token: &str) -> Self {
        match token {
            "CREATING" => Self::Creating,
            "ACTIVE" => Self::Active,
            "UPDATING" => Self::Updating,
            "DELETING" => Self::Deleting,
            "CREATE_FAILED" => Self::CreateFailed,
            "DELETE_FAILED" => Self::DeleteFailed,
            "DEGRADED" => Self::Degraded,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// One node group record from a describe response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(crate = "strato_common::serde")]
pub struct NodeGroupRecord {
    #[serde(
        rename = "nodegroupName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub nodegroup_name: Option<String>,
    #[serde(
        rename = "clusterName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cluster_name: Option<String>,
    #[serde(
        rename = "nodegroupArn",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub nodegroup_arn: Option<Arn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One node group on the remote service, bound to a node instance.
///
/// Describing a node group needs both the cluster and the group name, so
/// the scope exists only once both are known.
pub struct EksNodeGroup<'a, A> {
    api: &'a A,
    describe_nodegroup_filter: Option<Value>,
}

impl<'a, A: RemoteApi> EksNodeGroup<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            describe_nodegroup_filter: None,
        }
    }

    /// Scope later describes to `nodegroup_name` inside `cluster_name`.
    pub fn scope_to(&mut self, cluster_name: &str, nodegroup_name: &str) {
        self.describe_nodegroup_filter =
            Some(describe_nodegroup_filter(cluster_name, nodegroup_name));
    }

    /// Send the validated create parameters to the service, untouched.
    pub async fn create(&self, config: &NodeGroupConfig) -> Result<Value> {
        config.validated()?;
        let params = config.to_params()?;
        debug!("Creating {} with parameters: {}.", RESOURCE_TYPE, params);
        Ok(self.api.create_nodegroup(params).await?)
    }

    /// Delete the node group. The request carries the two identifying
    /// fields only.
    pub async fn delete(&self, cluster_name: &str, nodegroup_name: &str) -> Result<Value> {
        let response = self
            .api
            .delete_nodegroup(json!({
                CLUSTER_RESOURCE_NAME: cluster_name,
                NODEGROUP_RESOURCE_NAME: nodegroup_name,
            }))
            .await?;
        debug!("Response: {}", response);
        Ok(response)
    }
}

fn describe_nodegroup_filter(cluster_name: &str, nodegroup_name: &str) -> Value {
    json!({
        CLUSTER_RESOURCE_NAME: cluster_name,
        NODEGROUPS: [nodegroup_name],
    })
}

fn staged_field(instance: &NodeInstance, field: &str) -> Option<String> {
    instance
        .get_runtime_properties()
        .resource_config()?
        .get(field)?
        .as_str()
        .map(str::to_owned)
}

/// The cluster this node group belongs to: the staged configuration first,
/// the one cluster relationship otherwise.
fn owning_cluster_name(instance: &NodeInstance) -> Option<String> {
    staged_field(instance, CLUSTER_RESOURCE_NAME).or_else(|| {
        relationships::target_external_id(instance, CLUSTER_NODE_TYPE)
            .ok()
            .map(|id| id.as_str().to_owned())
    })
}

impl<'a, A: RemoteApi> ResourceInterface<'a, A> for EksNodeGroup<'a, A> {
    const RESOURCE_TYPE: &'static str = RESOURCE_TYPE;
    type Properties = NodeGroupRecord;
    type Status = NodeGroupStatus;

    fn bind(api: &'a A, instance: &NodeInstance) -> Self {
        let nodegroup_name = instance
            .get_runtime_properties()
            .external_id()
            .map(str::to_owned)
            .or_else(|| staged_field(instance, NODEGROUP_RESOURCE_NAME))
            .or_else(|| {
                instance
                    .get_node()
                    .resource_id
                    .as_ref()
                    .map(|id| id.as_str().to_owned())
            });
        let mut interface = Self::new(api);
        if let (Some(cluster_name), Some(nodegroup_name)) =
            (owning_cluster_name(instance), nodegroup_name)
        {
            interface.scope_to(&cluster_name, &nodegroup_name);
        }
        interface
    }

    async fn properties(&self) -> Result<Option<NodeGroupRecord>> {
        let Some(filter) = &self.describe_nodegroup_filter else {
            return Ok(None);
        };
        let response = match self.api.describe_nodegroups(filter.clone()).await {
            Ok(response) => response,
            Err(error) if error.is_not_found() => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        match response
            .get(NODEGROUPS)
            .and_then(Value::as_array)
            .and_then(|nodegroups| nodegroups.first())
        {
            Some(record) => Ok(Some(serde_json::from_value(record.clone())?)),
            None => Ok(None),
        }
    }

    async fn status(&self) -> Result<Option<NodeGroupStatus>> {
        let properties = self.properties().await?;
        Ok(properties
            .and_then(|record| record.status)
            .map(|token| NodeGroupStatus::from_token(&token)))
    }
}

/// Stage the declared configuration. No remote call is made.
pub async fn prepare<A: RemoteApi>(
    api: &A,
    instance: &mut NodeInstance,
    resource_config: &NodeGroupConfig,
) -> Result<()> {
    lifecycle::run::<A, EksNodeGroup<'_, A>, _, _>(
        api,
        instance,
        Operation::Prepare,
        async |_interface, instance| {
            instance
                .runtime_properties_mut()
                .stage_resource_config(resource_config.to_params()?);
            debug!("Staged the configuration of {} {}.", RESOURCE_TYPE, instance.get_id());
            Ok(())
        },
    )
    .await
}

/// Create the node group and persist its identity.
///
/// The group name comes from the configuration, the declared resource id or
/// the instance id, in that order. The owning cluster and the node role come
/// from the configuration or their relationships.
pub async fn create<A: RemoteApi>(
    api: &A,
    instance: &mut NodeInstance,
    resource_config: &NodeGroupConfig,
) -> Result<()> {
    lifecycle::run::<A, EksNodeGroup<'_, A>, _, _>(
        api,
        instance,
        Operation::Create,
        async |interface, instance| {
            let mut params = resource_config.clone();
            let resource_id = instance.resolve_resource_id(params.nodegroup_name.as_deref())?;
            params
                .nodegroup_name
                .get_or_insert_with(|| resource_id.to_string());
            let cluster_name = match params.cluster_name.clone() {
                Some(cluster_name) => cluster_name,
                None => {
                    let cluster =
                        relationships::target_external_id(instance, CLUSTER_NODE_TYPE)?;
                    let cluster_name = cluster.as_str().to_owned();
                    params.cluster_name = Some(cluster_name.clone());
                    cluster_name
                }
            };
            interface.scope_to(&cluster_name, resource_id.as_str());

            if instance.get_node().use_external_resource {
                return adopt_external_node_group(interface, instance, &resource_id).await;
            }

            if params.node_role.is_none() {
                let role = relationships::target_external_id(instance, IAM_ROLE_TYPE)?;
                params.node_role = Some(Arn::from(role.as_str()));
            }

            info!(
                "Creating {} {} in cluster {}.",
                RESOURCE_TYPE, resource_id, cluster_name
            );
            instance
                .runtime_properties_mut()
                .set_external_id(resource_id.as_str())?;
            let response = interface.create(&params).await?;
            persist_node_group_identity(instance, &response)?;
            instance
                .runtime_properties_mut()
                .stage_resource_config(params.to_params()?);
            Ok(())
        },
    )
    .await
}

/// Delete the node group and release its identity. Without a persisted
/// identity there is nothing to delete and the operation is a no-op.
pub async fn delete<A: RemoteApi>(api: &A, instance: &mut NodeInstance) -> Result<()> {
    lifecycle::run::<A, EksNodeGroup<'_, A>, _, _>(
        api,
        instance,
        Operation::Delete,
        async |interface, instance| {
            let Some(external_id) = instance
                .get_runtime_properties()
                .external_id()
                .map(str::to_owned)
            else {
                warn!(
                    "{} {} has no external resource id, nothing to delete.",
                    RESOURCE_TYPE,
                    instance.get_id()
                );
                return Ok(());
            };
            let nodegroup_name =
                staged_field(instance, NODEGROUP_RESOURCE_NAME).unwrap_or(external_id);
            let Some(cluster_name) = owning_cluster_name(instance) else {
                return Err(StratoError::configuration(anyhow!(
                    "Cannot delete {} {} without knowing its {}.",
                    RESOURCE_TYPE,
                    nodegroup_name,
                    CLUSTER_RESOURCE_NAME
                )));
            };

            if instance.get_node().use_external_resource {
                info!("Not deleting external {} {}.", RESOURCE_TYPE, nodegroup_name);
            } else {
                interface.delete(&cluster_name, &nodegroup_name).await?;
                info!(
                    "Deleted {} {} from cluster {}.",
                    RESOURCE_TYPE, nodegroup_name, cluster_name
                );
            }
            instance.runtime_properties_mut().clear_identity();
            Ok(())
        },
    )
    .await
}

async fn adopt_external_node_group<'a, A: RemoteApi>(
    interface: &EksNodeGroup<'a, A>,
    instance: &mut NodeInstance,
    resource_id: &ResourceId,
) -> Result<()> {
    let record = interface.properties().await?.ok_or_else(|| {
        StratoError::configuration(anyhow!(
            "use_external_resource is set, but {} {} is not in the account.",
            RESOURCE_TYPE,
            resource_id
        ))
    })?;
    info!(
        "Using external {} {} instead of creating one.",
        RESOURCE_TYPE, resource_id
    );
    let name = record
        .nodegroup_name
        .as_deref()
        .unwrap_or(resource_id.as_str());
    instance.runtime_properties_mut().set_external_id(name)?;
    if let Some(nodegroup_arn) = &record.nodegroup_arn {
        instance
            .runtime_properties_mut()
            .set_external_arn(nodegroup_arn.as_str())?;
    }
    Ok(())
}

fn persist_node_group_identity(instance: &mut NodeInstance, response: &Value) -> Result<()> {
    let Some(record) = response.get(NODEGROUP) else {
        warn!(
            "Create response of {} carried no {} record.",
            RESOURCE_TYPE, NODEGROUP
        );
        return Ok(());
    };
    if let Some(name) = record.get(NODEGROUP_RESOURCE_NAME).and_then(Value::as_str) {
        instance.runtime_properties_mut().set_external_id(name)?;
    }
    if let Some(nodegroup_arn) = record.get(NODEGROUP_ARN).and_then(Value::as_str) {
        instance
            .runtime_properties_mut()
            .set_external_arn(nodegroup_arn)?;
    }
    Ok(())
}
