use ::core::fmt::Display;

use super::RuntimeProperties;

/// Where a resource stands in its lifecycle.
///
/// The stage is derived from the runtime properties and never stored itself:
/// a persisted external id means the resource exists remotely, staged create
/// parameters alone mean it has only been prepared. Deleting the resource
/// clears both, so the stages move in a cycle:
/// `Absent` -> `Prepared` -> `Created` -> `Absent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    /// No operation has run yet, or the resource was deleted.
    Absent,
    /// Create parameters are staged, nothing exists remotely.
    Prepared,
    /// The resource exists on the remote service.
    Created,
}

impl LifecycleStage {
    pub fn of(properties: &RuntimeProperties) -> Self {
        if properties.external_id().is_some() {
            Self::Created
        } else if properties.resource_config().is_some() {
            Self::Prepared
        } else {
            Self::Absent
        }
    }
}

impl Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Prepared => write!(f, "prepared"),
            Self::Created => write!(f, "created"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use ::serde_json::json;

    #[test]
    fn stage_follows_the_lifecycle_keys() -> Result<()> {
        let mut properties = RuntimeProperties::new();
        assert_eq!(LifecycleStage::of(&properties), LifecycleStage::Absent);

        properties.stage_resource_config(json!({"clusterName": "c1"}));
        assert_eq!(LifecycleStage::of(&properties), LifecycleStage::Prepared);

        properties.set_external_id("c1")?;
        assert_eq!(LifecycleStage::of(&properties), LifecycleStage::Created);

        properties.clear_identity();
        assert_eq!(LifecycleStage::of(&properties), LifecycleStage::Absent);
        Ok(())
    }
}
