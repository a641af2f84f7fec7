//! Amazon-style resource names.
//!
//! An [Arn] is stored exactly as the remote service returned it. Parsing is
//! offered on the side and never rejects a value at construction time, so
//! persisted identities round-trip byte for byte.

use ::core::fmt::Display;

use ::serde::{Deserialize, Serialize};

/// A resource name of the form
/// `arn:partition:service:region:account-id:resource`.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arn {
    arn: String,
}

/// The sections of a well-formed [Arn].
#[derive(Debug, PartialEq, Eq)]
pub struct ArnFields<'a> {
    pub partition: &'a str,
    pub service: &'a str,
    pub region: &'a str,
    pub account_id: &'a str,
    /// `instance` in `instance/i-0123`, absent for flat resources
    /// such as s3 buckets.
    pub resource_type: Option<&'a str>,
    pub resource: &'a str,
}

impl Arn {
    pub fn new(arn: impl Into<String>) -> Self {
        Self { arn: arn.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.arn
    }

    /// All colon-separated sections, with the trailing resource section
    /// further split on `/`.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.arn.split(':').collect();
        if let Some(last) = segments.pop() {
            segments.extend(last.split('/'));
        }
        segments
    }

    /// Parse the name into its sections. Returns `None` when the value does
    /// not follow the `arn:` format, never an error.
    pub fn fields(&self) -> Option<ArnFields<'_>> {
        let mut sections = self.arn.splitn(6, ':');
        let prefix = sections.next()?;
        if prefix != "arn" {
            return None;
        }
        let partition = sections.next()?;
        let service = sections.next()?;
        let region = sections.next()?;
        let account_id = sections.next()?;
        let tail = sections.next()?;

        // `instance/i-0123` and `function:name` carry a resource type,
        // `bucket_name` does not.
        let (resource_type, resource) = match tail.find(['/', ':']) {
            Some(at) => (Some(&tail[..at]), &tail[at + 1..]),
            None => (None, tail),
        };
        Some(ArnFields {
            partition,
            service,
            region,
            account_id,
            resource_type,
            resource,
        })
    }
}

impl Display for Arn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.arn)
    }
}

impl From<String> for Arn {
    fn from(arn: String) -> Self {
        Self::new(arn)
    }
}

impl From<&str> for Arn {
    fn from(arn: &str) -> Self {
        Self::new(arn.to_owned())
    }
}
