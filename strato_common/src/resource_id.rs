use ::core::fmt::Display;
use ::std::{borrow::Cow, fmt};

use ::anyhow::anyhow;
use ::serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};

use crate::error::{Result, StratoError};

/// Identifier of a resource on the remote cluster service.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Clone, Serialize)]
pub struct ResourceId {
    id: Cow<'static, str>,
}

impl ResourceId {
    pub fn new(id: Cow<'static, str>) -> Result<Self> {
        if id.is_empty() {
            Err(StratoError::configuration(anyhow!(
                "Resource id cannot be empty."
            )))
        } else {
            Ok(Self { id })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_string(ResourceIdVisitor)
    }
}

struct ResourceIdVisitor;

impl Visitor<'_> for ResourceIdVisitor {
    type Value = ResourceId;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a non-empty string representing a ResourceId")
    }

    fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        ResourceId::try_from(value.to_owned()).map_err(de::Error::custom)
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = StratoError;
    fn try_from(id: String) -> Result<Self> {
        Self::new(Cow::Owned(id))
    }
}

impl TryFrom<&'static str> for ResourceId {
    type Error = StratoError;
    fn try_from(id: &'static str) -> Result<Self> {
        Self::new(Cow::Borrowed(id))
    }
}
