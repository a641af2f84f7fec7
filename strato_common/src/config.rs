//! Configuration for clients of the remote cluster service.

use ::serde::Deserialize;
use ::serde_json::from_reader;
use ::std::{fs::File, io::BufReader};

use crate::error::{Result, StratoError};

/// Credentials for authenticating with the remote cluster service.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub enum Credentials {
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer {
        token: String,
    },
}

/// Configuration for a remote cluster service client.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// URL of the service endpoint, e.g. `https://containers.us-east-1.example.com`.
    pub endpoint: String,
    /// Region the endpoint serves. Sent with every request when set.
    pub region: Option<String>,
    pub credentials: Option<Credentials>,
    /// Per-request timeout. No timeout when unset.
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn read_config(path: &str) -> Result<Self> {
        let file = File::open(path).map_err(StratoError::configuration)?;
        let reader = BufReader::new(file);
        let config = from_reader(reader)?;
        Ok(config)
    }
}
