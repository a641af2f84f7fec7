//! The remote cluster service seam.
//!
//! Resource interfaces never talk to the network themselves. They go through
//! [RemoteApi], so tests can swap in a mock and the wire client lives in its
//! own crate.

use ::core::fmt::Display;
use ::core::time::Duration;

use ::serde_json::Value;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Vendor error codes that mean the described resource does not exist.
const NOT_FOUND_CODES: [&str; 2] = ["ResourceNotFoundException", "NotFoundException"];

/// Vendor error codes for transient conditions that are worth retrying.
const RETRYABLE_CODES: [&str; 6] = [
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "ServiceUnavailableException",
    "InternalServerError",
    "RequestTimeout",
];

/// HTTP statuses for transient conditions that are worth retrying.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Raw operations of the remote cluster service.
///
/// Parameters and responses are plain JSON values so that declared
/// configurations pass through to the wire without loss.
#[allow(async_fn_in_trait)]
pub trait RemoteApi {
    async fn create_cluster(&self, params: Value) -> RemoteResult<Value>;

    /// Describe the clusters selected by `filter`.
    /// The response carries a `clusters` array.
    async fn describe_clusters(&self, filter: Value) -> RemoteResult<Value>;

    async fn delete_cluster(&self, request: Value) -> RemoteResult<Value>;

    async fn create_nodegroup(&self, params: Value) -> RemoteResult<Value>;

    /// Describe the node groups selected by `filter`.
    /// The response carries a `nodegroups` array.
    async fn describe_nodegroups(&self, filter: Value) -> RemoteResult<Value>;

    async fn delete_nodegroup(&self, request: Value) -> RemoteResult<Value>;
}

/// A failed call to the remote cluster service.
///
/// Carries enough of the wire response to classify the failure:
/// [RemoteError::is_not_found] for missing resources,
/// [RemoteError::is_retryable] for transient conditions.
#[derive(Debug)]
pub struct RemoteError {
    action: &'static str,
    status: Option<u16>,
    code: Option<String>,
    message: String,
    retry_after: Option<Duration>,
    transport_retryable: bool,
}

impl RemoteError {
    /// An error response from the remote service.
    pub fn api(action: &'static str, status: u16, code: Option<String>, message: String) -> Self {
        Self {
            action,
            status: Some(status),
            code,
            message,
            retry_after: None,
            transport_retryable: false,
        }
    }

    /// A failure on the way to or from the remote service, before any
    /// response could be read. `retryable` marks timeouts and refused
    /// connections, which may succeed on a later attempt.
    pub fn transport(action: &'static str, message: String, retryable: bool) -> Self {
        Self {
            action,
            status: None,
            code: None,
            message,
            retry_after: None,
            transport_retryable: retryable,
        }
    }

    /// Attach the wait the remote service asked for before retrying.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn action(&self) -> &'static str {
        self.action
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Whether the remote service said the requested resource does not exist.
    /// Boto-style suffixed codes such as `InvalidInstanceID.NotFound` count.
    pub fn is_not_found(&self) -> bool {
        if let Some(code) = &self.code {
            if NOT_FOUND_CODES.contains(&code.as_str()) || code.ends_with(".NotFound") {
                return true;
            }
        }
        self.status == Some(404)
    }

    /// Whether the failure is transient and the call may succeed if retried.
    pub fn is_retryable(&self) -> bool {
        if self.transport_retryable {
            return true;
        }
        if let Some(code) = &self.code {
            if RETRYABLE_CODES.contains(&code.as_str()) {
                return true;
            }
        }
        self.status
            .is_some_and(|status| RETRYABLE_STATUSES.contains(&status))
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "remote {} call failed", self.action)?;
        match (self.status, &self.code) {
            (Some(status), Some(code)) => write!(f, " (status {}, code {})", status, code)?,
            (Some(status), None) => write!(f, " (status {})", status)?,
            (None, Some(code)) => write!(f, " (code {})", code)?,
            (None, None) => {}
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for RemoteError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn throttled() -> RemoteError {
        RemoteError::api(
            "CreateCluster",
            429,
            Some("ThrottlingException".to_owned()),
            "Rate exceeded.".to_owned(),
        )
    }

    #[test]
    fn not_found_by_code() {
        let error = RemoteError::api(
            "DescribeClusters",
            400,
            Some("ResourceNotFoundException".to_owned()),
            "No cluster found for name: c1.".to_owned(),
        );
        assert!(error.is_not_found());
        assert!(!error.is_retryable());
    }

    #[test]
    fn not_found_by_suffixed_code() {
        let error = RemoteError::api(
            "DescribeClusters",
            400,
            Some("InvalidClusterID.NotFound".to_owned()),
            "not found".to_owned(),
        );
        assert!(error.is_not_found());
    }

    #[test]
    fn not_found_by_status() {
        let error = RemoteError::api("DescribeClusters", 404, None, "not found".to_owned());
        assert!(error.is_not_found());
    }

    #[test]
    fn retryable_by_code_and_status() {
        assert!(throttled().is_retryable());
        let error = RemoteError::api("CreateCluster", 503, None, "try later".to_owned());
        assert!(error.is_retryable());
    }

    #[test]
    fn access_denied_is_neither_retryable_nor_not_found() {
        let error = RemoteError::api(
            "CreateCluster",
            403,
            Some("AccessDeniedException".to_owned()),
            "not authorized".to_owned(),
        );
        assert!(!error.is_retryable());
        assert!(!error.is_not_found());
    }

    #[test]
    fn transport_timeout_is_retryable() {
        let error = RemoteError::transport("DeleteCluster", "operation timed out".to_owned(), true);
        assert!(error.is_retryable());
        assert!(!error.is_not_found());
    }

    #[test]
    fn display_includes_action_status_and_code() {
        assert_eq!(
            throttled().to_string(),
            "remote CreateCluster call failed (status 429, code ThrottlingException): Rate exceeded."
        );
    }

    #[test]
    fn retry_after_hint_is_kept() {
        let error = throttled().with_retry_after(Duration::from_secs(2));
        assert_eq!(error.retry_after(), Some(Duration::from_secs(2)));
    }
}
