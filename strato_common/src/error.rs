//! Error types shared by all Strato plugin crates.

use ::core::fmt::Display;
use ::core::time::Duration;

use crate::remote::RemoteError;

pub type Result<T> = std::result::Result<T, StratoError>;

/// Classification of a [StratoError], used by lifecycle runners and hosts
/// to decide whether an operation failed for good or should be re-invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StratoErrorType {
    /// The declared node configuration is invalid or incomplete.
    /// Retrying cannot help until the blueprint is fixed.
    Configuration,
    /// A required object does not exist.
    NotFound,
    /// The remote API rejected or failed an operation.
    RemoteApi,
    /// A transient failure. The host should re-invoke the operation later,
    /// optionally after [StratoError::retry_after].
    Recoverable,
    /// Serializing or deserializing a wire payload failed.
    Serialization,
}

#[derive(Debug)]
pub struct StratoError {
    error_type: StratoErrorType,
    retry_after: Option<Duration>,
    source: anyhow::Error,
}

impl StratoError {
    fn new(error_type: StratoErrorType, source: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            retry_after: None,
            source: source.into(),
        }
    }

    pub fn configuration(error: impl Into<anyhow::Error>) -> Self {
        Self::new(StratoErrorType::Configuration, error)
    }

    pub fn not_found(error: impl Into<anyhow::Error>) -> Self {
        Self::new(StratoErrorType::NotFound, error)
    }

    pub fn remote_api(error: impl Into<anyhow::Error>) -> Self {
        Self::new(StratoErrorType::RemoteApi, error)
    }

    pub fn recoverable(error: impl Into<anyhow::Error>) -> Self {
        Self::new(StratoErrorType::Recoverable, error)
    }

    /// Same as [StratoError::recoverable] with a hint on how long the host
    /// should wait before re-invoking the operation.
    pub fn recoverable_after(retry_after: Duration, error: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type: StratoErrorType::Recoverable,
            retry_after: Some(retry_after),
            source: error.into(),
        }
    }

    pub fn serialization(error: impl Into<anyhow::Error>) -> Self {
        Self::new(StratoErrorType::Serialization, error)
    }

    pub fn get_error_type(&self) -> StratoErrorType {
        self.error_type
    }

    pub fn is_recoverable(&self) -> bool {
        self.error_type == StratoErrorType::Recoverable
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// The [RemoteError] that caused this error, if there is one anywhere
    /// in the error chain.
    pub fn remote(&self) -> Option<&RemoteError> {
        self.source
            .chain()
            .find_map(|cause| cause.downcast_ref::<RemoteError>())
    }

    fn label(&self) -> &'static str {
        match self.error_type {
            StratoErrorType::Configuration => "Configuration error",
            StratoErrorType::NotFound => "Not found",
            StratoErrorType::RemoteApi => "Remote API error",
            StratoErrorType::Recoverable => "Recoverable error",
            StratoErrorType::Serialization => "Serialization error",
        }
    }
}

impl Display for StratoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:#}", self.label(), self.source)
    }
}

impl std::error::Error for StratoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let source: &(dyn std::error::Error + 'static) = self.source.as_ref();
        Some(source)
    }
}

impl<T> From<StratoError> for Result<T> {
    fn from(val: StratoError) -> Self {
        Result::Err(val)
    }
}

macro_rules! convert_to_strato_error {
    ($err_ty: ty, $constructor: expr) => {
        impl From<$err_ty> for StratoError {
            fn from(value: $err_ty) -> Self {
                $constructor(value)
            }
        }
    };
}

convert_to_strato_error!(serde_json::Error, StratoError::serialization);
convert_to_strato_error!(RemoteError, StratoError::remote_api);
