use ::anyhow::anyhow;
use ::serde::{Deserialize, Serialize};
use ::serde_json::{Map, Value};

use crate::error::{Result, StratoError};

/// Runtime property holding the staged create parameters.
pub const RESOURCE_CONFIG: &str = "resource_config";
/// Runtime property holding the identifier of the remote resource.
pub const EXTERNAL_RESOURCE_ID: &str = "external_resource_id";
/// Runtime property holding the full name (ARN) of the remote resource.
pub const EXTERNAL_RESOURCE_ARN: &str = "external_resource_arn";

/// State the orchestrator keeps for a node instance between operations.
///
/// The identity keys [EXTERNAL_RESOURCE_ID] and [EXTERNAL_RESOURCE_ARN] are
/// written at most once per lifetime of the remote resource: writing the same
/// value again is a no-op, writing a conflicting value is a configuration
/// error. Deleting the resource removes them, after which they may be set
/// again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeProperties {
    entries: Map<String, Value>,
}

impl RuntimeProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resource_config(&self) -> Option<&Value> {
        self.entries.get(RESOURCE_CONFIG)
    }

    /// Stage the parameters a later create operation will send.
    /// Staging again replaces the previous parameters.
    pub fn stage_resource_config(&mut self, config: Value) {
        self.entries.insert(RESOURCE_CONFIG.to_owned(), config);
    }

    pub fn external_id(&self) -> Option<&str> {
        self.entries.get(EXTERNAL_RESOURCE_ID).and_then(Value::as_str)
    }

    pub fn set_external_id(&mut self, id: &str) -> Result<()> {
        self.set_once(EXTERNAL_RESOURCE_ID, id)
    }

    pub fn external_arn(&self) -> Option<&str> {
        self.entries
            .get(EXTERNAL_RESOURCE_ARN)
            .and_then(Value::as_str)
    }

    pub fn set_external_arn(&mut self, arn: &str) -> Result<()> {
        self.set_once(EXTERNAL_RESOURCE_ARN, arn)
    }

    /// Remove the staged parameters and both identity keys.
    /// The instance reads as absent afterwards.
    pub fn clear_identity(&mut self) {
        self.entries.remove(RESOURCE_CONFIG);
        self.entries.remove(EXTERNAL_RESOURCE_ID);
        self.entries.remove(EXTERNAL_RESOURCE_ARN);
    }

    fn set_once(&mut self, key: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return Err(StratoError::configuration(anyhow!(
                "Cannot set {} to an empty string.",
                key
            )));
        }
        match self.entries.get(key) {
            None => {
                self.entries
                    .insert(key.to_owned(), Value::String(value.to_owned()));
                Ok(())
            }
            Some(current) if current.as_str() == Some(value) => Ok(()),
            Some(current) => Err(StratoError::configuration(anyhow!(
                "{} is already set to {}, refusing to overwrite it with {}.",
                key,
                current,
                value
            ))),
        }
    }
}
