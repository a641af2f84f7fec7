//! EKS cluster interface and lifecycle operations.

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
    time::{self, OffsetDateTime},
    tracing::{debug, info, warn},
};

use crate::IAM_ROLE_TYPE;

pub const RESOURCE_TYPE: &str = "EKS Cluster";

const CLUSTERS: &str = "clusters";
const CLUSTER: &str = "cluster";
const CLUSTER_ARN: &str = "clusterArn";
const CLUSTER_RESOURCE_NAME: &str = "clusterName";

/// Declared configuration of a cluster.
///
/// Only the fields the lifecycle itself needs are typed. Everything else is
/// collected in `extra` and forwarded to the create call verbatim, so new
/// service parameters need no plugin change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(crate = "strato_common::serde")]
pub struct ClusterConfig {
    /// Name of the cluster. Falls back to the declared resource id or the
    /// instance id when absent.
    #[serde(
        rename = "clusterName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cluster_name: Option<String>,
    /// Role the service assumes to manage the cluster. Resolved through the
    /// one IAM role relationship when absent.
    #[serde(rename = "RoleArn", default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<Arn>,
    /// Everything else the service accepts, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClusterConfig {
    /// The exact parameter object the create call sends.
    pub fn to_params(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn validated(&self) -> Result<()> {
        if self
            .cluster_name
            .as_deref()
            .is_none_or(|name| name.is_empty())
        {
            return Err(StratoError::configuration(anyhow!(
                "{} is required to create an {}.",
                CLUSTER_RESOURCE_NAME,
                RESOURCE_TYPE
            )));
        }
        if self
            .role_arn
            .as_ref()
            .is_none_or(|arn| arn.as_str().is_empty())
        {
            return Err(StratoError::configuration(anyhow!(
                "RoleArn is required to create an {}.",
                RESOURCE_TYPE
            )));
        }
        Ok(())
    }
}

/// Status token of a cluster as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterStatus {
    Creating,
    Active,
    Deleting,
    Failed,
    Updating,
    Pending,
    /// A token this plugin does not know yet, kept verbatim.
    Other(String),
}

impl ClusterStatus {
    pub fn from_token(token: &str) -> Self {
        match token {
            "CREATING" => Self::Creating,
            "ACTIVE" => Self::Active,
            "DELETING" => Self::Deleting,
            "FAILED" => Self::Failed,
            "UPDATING" => Self::Updating,
            "PENDING" => Self::Pending,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_token(&self) -> &str {
        match self {
            Self::Creating => "CREATING",
            Self::Active => "ACTIVE",
            Self::Deleting => "DELETING",
            Self::Failed => "FAILED",
            Self::Updating => "UPDATING",
            Self::Pending => "PENDING",
            Self::Other(token) => token,
        }
    }
}

/// One cluster record from a describe response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(crate = "strato_common::serde")]
pub struct ClusterRecord {
    #[serde(
        rename = "clusterName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cluster_name: Option<String>,
    #[serde(
        rename = "clusterArn",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cluster_arn: Option<Arn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        rename = "createdAt",
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One cluster on the remote service, bound to a node instance.
///
/// The describe scope is derived at bind time, persisted identity first.
/// Without a scope the cluster reads as missing instead of guessing.
pub struct EksCluster<'a, A> {
    api: &'a A,
    describe_cluster_filter: Option<Value>,
}

impl<'a, A: RemoteApi> EksCluster<'a, A> {
    pub fn new(api: &'a A, cluster_name: Option<&str>) -> Self {
        Self {
            api,
            describe_cluster_filter: cluster_name.map(describe_cluster_filter),
        }
    }

    /// Scope later describes to `cluster_name`.
    pub fn scope_to(&mut self, cluster_name: &str) {
        self.describe_cluster_filter = Some(describe_cluster_filter(cluster_name));
    }

    /// Send the validated create parameters to the service, untouched.
    pub async fn create(&self, config: &ClusterConfig) -> Result<Value> {
        config.validated()?;
        let params = config.to_params()?;
        debug!("Creating {} with parameters: {}.", RESOURCE_TYPE, params);
        Ok(self.api.create_cluster(params).await?)
    }

    /// Delete the cluster. The request carries the identifying field only.
    pub async fn delete(&self, cluster_name: &str) -> Result<Value> {
        let response = self
            .api
            .delete_cluster(json!({ CLUSTER: cluster_name }))
            .await?;
        debug!("Response: {}", response);
        Ok(response)
    }
}

fn describe_cluster_filter(cluster_name: &str) -> Value {
    json!({ CLUSTERS: [cluster_name] })
}

fn staged_cluster_name(instance: &NodeInstance) -> Option<String> {
    instance
        .get_runtime_properties()
        .resource_config()?
        .get(CLUSTER_RESOURCE_NAME)?
        .as_str()
        .map(str::to_owned)
}

impl<'a, A: RemoteApi> ResourceInterface<'a, A> for EksCluster<'a, A> {
    const RESOURCE_TYPE: &'static str = RESOURCE_TYPE;
    type Properties = ClusterRecord;
    type Status = ClusterStatus;

    fn bind(api: &'a A, instance: &NodeInstance) -> Self {
        let known_name = instance
            .get_runtime_properties()
            .external_id()
            .map(str::to_owned)
            .or_else(|| staged_cluster_name(instance))
            .or_else(|| {
                instance
                    .get_node()
                    .resource_id
                    .as_ref()
                    .map(|id| id.as_str().to_owned())
            });
        Self::new(api, known_name.as_deref())
    }

    async fn properties(&self) -> Result<Option<ClusterRecord>> {
        let Some(filter) = &self.describe_cluster_filter else {
            return Ok(None);
        };
        let response = match self.api.describe_clusters(filter.clone()).await {
            Ok(response) => response,
            // only the missing-resource answer reads as None,
            // every other failure propagates
            Err(error) if error.is_not_found() => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        match response
            .get(CLUSTERS)
            .and_then(Value::as_array)
            .and_then(|clusters| clusters.first())
        {
            Some(record) => Ok(Some(serde_json::from_value(record.clone())?)),
            None => Ok(None),
        }
    }

    async fn status(&self) -> Result<Option<ClusterStatus>> {
        let properties = self.properties().await?;
        Ok(properties
            .and_then(|record| record.status)
            .map(|token| ClusterStatus::from_token(&token)))
    }
}

/// Stage the declared configuration. No remote call is made.
pub async fn prepare<A: RemoteApi>(
    api: &A,
    instance: &mut NodeInstance,
    resource_config: &ClusterConfig,
) -> Result<()> {
    lifecycle::run::<A, EksCluster<'_, A>, _, _>(
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

/// Create the cluster and persist its identity.
///
/// The cluster name comes from the configuration, the declared resource id
/// or the instance id, in that order. The role comes from the configuration
/// or the one IAM role relationship. With `use_external_resource` set, an
/// existing cluster is adopted instead.
pub async fn create<A: RemoteApi>(
    api: &A,
    instance: &mut NodeInstance,
    resource_config: &ClusterConfig,
) -> Result<()> {
    lifecycle::run::<A, EksCluster<'_, A>, _, _>(
        api,
        instance,
        Operation::Create,
        async |interface, instance| {
            let mut params = resource_config.clone();
            let resource_id = instance.resolve_resource_id(params.cluster_name.as_deref())?;
            params
                .cluster_name
                .get_or_insert_with(|| resource_id.to_string());
            interface.scope_to(resource_id.as_str());

            if instance.get_node().use_external_resource {
                return adopt_external_cluster(interface, instance, &resource_id).await;
            }

            if params.role_arn.is_none() {
                let role = relationships::target_external_id(instance, IAM_ROLE_TYPE)?;
                params.role_arn = Some(Arn::from(role.as_str()));
            }

            info!("Creating {} {}.", RESOURCE_TYPE, resource_id);
            instance
                .runtime_properties_mut()
                .set_external_id(resource_id.as_str())?;
            let response = interface.create(&params).await?;
            persist_cluster_identity(instance, &response)?;
            instance
                .runtime_properties_mut()
                .stage_resource_config(params.to_params()?);
            Ok(())
        },
    )
    .await
}

/// Delete the cluster and release its identity. Without a persisted
/// identity there is nothing to delete and the operation is a no-op.
pub async fn delete<A: RemoteApi>(api: &A, instance: &mut NodeInstance) -> Result<()> {
    lifecycle::run::<A, EksCluster<'_, A>, _, _>(
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
            let cluster_name = staged_cluster_name(instance).unwrap_or(external_id);

            if instance.get_node().use_external_resource {
                info!("Not deleting external {} {}.", RESOURCE_TYPE, cluster_name);
            } else {
                interface.delete(&cluster_name).await?;
                info!("Deleted {} {}.", RESOURCE_TYPE, cluster_name);
            }
            instance.runtime_properties_mut().clear_identity();
            Ok(())
        },
    )
    .await
}

async fn adopt_external_cluster<'a, A: RemoteApi>(
    interface: &EksCluster<'a, A>,
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
        .cluster_name
        .as_deref()
        .unwrap_or(resource_id.as_str());
    instance.runtime_properties_mut().set_external_id(name)?;
    if let Some(cluster_arn) = &record.cluster_arn {
        instance
            .runtime_properties_mut()
            .set_external_arn(cluster_arn.as_str())?;
    }
    Ok(())
}

fn persist_cluster_identity(instance: &mut NodeInstance, response: &Value) -> Result<()> {
    let Some(record) = response.get(CLUSTER) else {
        warn!(
            "Create response of {} carried no {} record.",
            RESOURCE_TYPE, CLUSTER
        );
        return Ok(());
    };
    if let Some(name) = record.get(CLUSTER_RESOURCE_NAME).and_then(Value::as_str) {
        instance.runtime_properties_mut().set_external_id(name)?;
    }
    if let Some(cluster_arn) = record.get(CLUSTER_ARN).and_then(Value::as_str) {
        instance.runtime_properties_mut().set_external_arn(cluster_arn)?;
    }
    Ok(())
}
