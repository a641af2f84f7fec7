//! Relationship resolution.
//!
//! Lifecycle operations find collaborating resources through the
//! relationship snapshot on the instance, never by calling back into the
//! orchestrator.

use ::anyhow::anyhow;

use crate::{
    error::{Result, StratoError},
    instance::{NodeInstance, Relationship},
    resource_id::ResourceId,
};

/// The relationship whose target is the one node of type `target_type`.
///
/// Exactly one relationship must match. No match means the plan forgot the
/// connection, more than one means the plan is ambiguous about which target
/// to use. Both are configuration errors.
pub fn single_target_by_type<'i>(
    instance: &'i NodeInstance,
    target_type: &str,
) -> Result<&'i Relationship> {
    let mut matched = instance
        .get_relationships()
        .iter()
        .filter(|relationship| relationship.get_target_type() == target_type);
    match (matched.next(), matched.next()) {
        (Some(relationship), None) => Ok(relationship),
        (None, _) => Err(StratoError::configuration(anyhow!(
            "Instance {} must be connected to exactly one node of type {}, found none.",
            instance.get_id(),
            target_type
        ))),
        (Some(_), Some(_)) => Err(StratoError::configuration(anyhow!(
            "Instance {} is connected to more than one node of type {}, expected exactly one.",
            instance.get_id(),
            target_type
        ))),
    }
}

/// The external resource id persisted on the one target of type
/// `target_type`.
pub fn target_external_id(instance: &NodeInstance, target_type: &str) -> Result<ResourceId> {
    let relationship = single_target_by_type(instance, target_type)?;
    let id = relationship
        .get_target_properties()
        .external_id()
        .ok_or_else(|| {
            StratoError::configuration(anyhow!(
                "Target {} of type {} has no external resource id yet.",
                relationship.get_target_id(),
                target_type
            ))
        })?;
    ResourceId::try_from(id.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{NodeSpec, RuntimeProperties};

    const ROLE_TYPE: &str = "strato.nodes.iam.Role";

    fn role_relationship(target_id: &str, external_id: Option<&str>) -> Relationship {
        let mut properties = RuntimeProperties::new();
        if let Some(external_id) = external_id {
            properties.set_external_id(external_id).unwrap();
        }
        Relationship::new(ROLE_TYPE, target_id, properties)
    }

    fn instance_with(relationships: Vec<Relationship>) -> NodeInstance {
        let mut instance = NodeInstance::new("node_1", NodeSpec::new("strato.nodes.eks.Cluster"));
        for relationship in relationships {
            instance.add_relationship(relationship);
        }
        instance
    }

    #[test]
    fn missing_relationship_is_a_configuration_error() {
        let instance = instance_with(vec![]);
        let result = target_external_id(&instance, ROLE_TYPE);
        assert!(result.is_err_and(|e| e.to_string().starts_with(
            "Configuration error: Instance node_1 must be connected to exactly one node of type strato.nodes.iam.Role, found none."
        )));
    }

    #[test]
    fn ambiguous_relationships_are_a_configuration_error() {
        let instance = instance_with(vec![
            role_relationship("role_1", Some("arn:aws:iam::123456789012:role/a")),
            role_relationship("role_2", Some("arn:aws:iam::123456789012:role/b")),
        ]);
        let result = target_external_id(&instance, ROLE_TYPE);
        assert!(result.is_err_and(|e| e.to_string().starts_with(
            "Configuration error: Instance node_1 is connected to more than one node of type strato.nodes.iam.Role, expected exactly one."
        )));
    }

    #[test]
    fn resolves_the_single_matching_target() -> Result<()> {
        let instance = instance_with(vec![
            Relationship::new("strato.nodes.eks.Cluster", "c_1", RuntimeProperties::new()),
            role_relationship("role_1", Some("arn:aws:iam::123456789012:role/a")),
        ]);
        let id = target_external_id(&instance, ROLE_TYPE)?;
        assert_eq!(id, ResourceId::try_from("arn:aws:iam::123456789012:role/a")?);
        Ok(())
    }

    #[test]
    fn target_without_identity_is_a_configuration_error() {
        let instance = instance_with(vec![role_relationship("role_1", None)]);
        let result = target_external_id(&instance, ROLE_TYPE);
        assert!(result.is_err_and(|e| e.to_string().starts_with(
            "Configuration error: Target role_1 of type strato.nodes.iam.Role has no external resource id yet."
        )));
    }
}
