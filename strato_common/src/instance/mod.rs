//! The node instance model.
//!
//! Lifecycle operations never reach into the orchestrator. Everything they
//! may read or write travels in a [NodeInstance]: the declared node shape,
//! the runtime properties, and a snapshot of the instance's relationships.

use ::serde::{Deserialize, Serialize};

use crate::{error::Result, resource_id::ResourceId};

mod runtime_properties;
mod stage;

pub use runtime_properties::{
    RuntimeProperties, EXTERNAL_RESOURCE_ARN, EXTERNAL_RESOURCE_ID, RESOURCE_CONFIG,
};
pub use stage::LifecycleStage;

/// Declared shape of a node, as written in the deployment plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    /// Type tag of the node, e.g. `strato.nodes.eks.Cluster`.
    pub node_type: String,
    /// Resource id declared in the plan. When absent, the instance id is
    /// used as the fallback name for created resources.
    pub resource_id: Option<ResourceId>,
    /// Adopt a resource that already exists on the remote service instead
    /// of creating and deleting one.
    #[serde(default)]
    pub use_external_resource: bool,
}

impl NodeSpec {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            resource_id: None,
            use_external_resource: false,
        }
    }
}

/// One relationship of a node instance, snapshotted by the orchestrator
/// before the operation runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    target_type: String,
    target_id: String,
    target_properties: RuntimeProperties,
}

impl Relationship {
    pub fn new(
        target_type: impl Into<String>,
        target_id: impl Into<String>,
        target_properties: RuntimeProperties,
    ) -> Self {
        Self {
            target_type: target_type.into(),
            target_id: target_id.into(),
            target_properties,
        }
    }

    pub fn get_target_type(&self) -> &str {
        &self.target_type
    }

    pub fn get_target_id(&self) -> &str {
        &self.target_id
    }

    pub fn get_target_properties(&self) -> &RuntimeProperties {
        &self.target_properties
    }
}

/// A node instance handed to a lifecycle operation by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeInstance {
    id: String,
    node: NodeSpec,
    #[serde(default)]
    runtime_properties: RuntimeProperties,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

impl NodeInstance {
    pub fn new(id: impl Into<String>, node: NodeSpec) -> Self {
        Self {
            id: id.into(),
            node,
            runtime_properties: RuntimeProperties::new(),
            relationships: Vec::new(),
        }
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_node(&self) -> &NodeSpec {
        &self.node
    }

    pub fn get_runtime_properties(&self) -> &RuntimeProperties {
        &self.runtime_properties
    }

    pub fn runtime_properties_mut(&mut self) -> &mut RuntimeProperties {
        &mut self.runtime_properties
    }

    pub fn get_relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn stage(&self) -> LifecycleStage {
        LifecycleStage::of(&self.runtime_properties)
    }

    /// The identifier this instance's resource goes by on the remote service.
    ///
    /// A persisted identity always wins. Otherwise the first of: the name
    /// from the operation parameters, the resource id declared on the node,
    /// the instance id.
    pub fn resolve_resource_id(&self, preferred: Option<&str>) -> Result<ResourceId> {
        if let Some(existing) = self.runtime_properties.external_id() {
            return ResourceId::try_from(existing.to_owned());
        }
        if let Some(preferred) = preferred {
            return ResourceId::try_from(preferred.to_owned());
        }
        if let Some(declared) = &self.node.resource_id {
            return Ok(declared.clone());
        }
        ResourceId::try_from(self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::serde_json::{from_value, json};

    fn instance() -> NodeInstance {
        NodeInstance::new("node_1", NodeSpec::new("strato.nodes.eks.Cluster"))
    }

    #[test]
    fn node_spec_denies_unknown_fields() {
        let result = from_value::<NodeSpec>(json!(
            {
                "node_type": "strato.nodes.eks.Cluster",
                "flavor": "large"
            }
        ));
        assert_eq!(
            result.unwrap_err().to_string(),
            "unknown field `flavor`, expected one of `node_type`, `resource_id`, `use_external_resource`"
        );
    }

    #[test]
    fn node_spec_defaults() -> anyhow::Result<()> {
        let spec = from_value::<NodeSpec>(json!({"node_type": "strato.nodes.eks.Cluster"}))?;
        assert_eq!(spec, NodeSpec::new("strato.nodes.eks.Cluster"));
        assert!(!spec.use_external_resource);
        Ok(())
    }

    #[test]
    fn resolve_resource_id_prefers_the_operation_parameters() -> Result<()> {
        let instance = instance();
        assert_eq!(
            instance.resolve_resource_id(Some("from_params"))?,
            ResourceId::try_from("from_params")?
        );
        Ok(())
    }

    #[test]
    fn resolve_resource_id_falls_back_to_the_declared_id() -> Result<()> {
        let mut instance = instance();
        instance.node.resource_id = Some(ResourceId::try_from("declared")?);
        assert_eq!(
            instance.resolve_resource_id(None)?,
            ResourceId::try_from("declared")?
        );
        Ok(())
    }

    #[test]
    fn resolve_resource_id_falls_back_to_the_instance_id() -> Result<()> {
        let instance = instance();
        assert_eq!(
            instance.resolve_resource_id(None)?,
            ResourceId::try_from("node_1")?
        );
        Ok(())
    }

    #[test]
    fn resolve_resource_id_never_changes_a_persisted_identity() -> Result<()> {
        let mut instance = instance();
        instance.runtime_properties_mut().set_external_id("persisted")?;
        assert_eq!(
            instance.resolve_resource_id(Some("from_params"))?,
            ResourceId::try_from("persisted")?
        );
        Ok(())
    }

    #[test]
    fn instance_round_trips_through_json() -> anyhow::Result<()> {
        let mut instance = instance();
        instance
            .runtime_properties_mut()
            .stage_resource_config(json!({"clusterName": "c1"}));
        instance.add_relationship(Relationship::new(
            "strato.nodes.iam.Role",
            "role_1",
            RuntimeProperties::new(),
        ));
        let value = serde_json::to_value(&instance)?;
        let back: NodeInstance = from_value(value)?;
        assert_eq!(back, instance);
        Ok(())
    }
}
