//! The lifecycle runner.
//!
//! Every lifecycle operation goes through [run]: it binds a resource
//! interface to the instance, hands both to the operation body, and is the
//! single place where transient remote failures are turned into
//! [recoverable](StratoError::is_recoverable) errors for the host to retry.
//! Operation bodies and interfaces stay free of retry logic.

use ::core::fmt::Display;

use ::tracing::{debug, warn};

use crate::{
    error::{Result, StratoError},
    instance::NodeInstance,
    remote::{RemoteApi, RemoteError},
};

/// Lifecycle operations a host can invoke on a node instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Stage the declared configuration. Nothing is created remotely.
    Prepare,
    /// Create the remote resource and persist its identity.
    Create,
    /// Delete the remote resource and release its identity.
    Delete,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prepare => write!(f, "prepare"),
            Self::Create => write!(f, "create"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A typed view of one remote resource, bound to one node instance.
///
/// Binding only derives the describe scope from the instance. It never
/// calls the remote service, so resources that do not exist yet bind fine.
#[allow(async_fn_in_trait)]
pub trait ResourceInterface<'a, A: RemoteApi>: Sized {
    /// Human readable type of the resource, e.g. `EKS Cluster`.
    const RESOURCE_TYPE: &'static str;
    /// Shape of one remote record as returned by the describe operation.
    type Properties;
    /// Status token of the resource.
    type Status;

    fn bind(api: &'a A, instance: &NodeInstance) -> Self;

    /// The remote record of the resource. `None` when the describe scope is
    /// not known yet or the remote service reports the resource missing,
    /// so callers can probe for existence without special casing.
    async fn properties(&self) -> Result<Option<Self::Properties>>;

    /// The status field of the remote record.
    async fn status(&self) -> Result<Option<Self::Status>>;
}

/// Run one lifecycle operation body with a freshly bound interface.
///
/// The error translation here is the only retry coordination in the whole
/// plugin family: a failure caused by a transient remote condition comes out
/// as a recoverable error, optionally carrying the wait the service asked
/// for. Everything else passes through unchanged.
pub async fn run<'a, A, I, T, F>(
    api: &'a A,
    instance: &mut NodeInstance,
    operation: Operation,
    body: F,
) -> Result<T>
where
    A: RemoteApi,
    I: ResourceInterface<'a, A>,
    F: AsyncFnOnce(&mut I, &mut NodeInstance) -> Result<T>,
{
    let mut interface = I::bind(api, instance);
    debug!(
        "Running {} for {} {}.",
        operation,
        I::RESOURCE_TYPE,
        instance.get_id()
    );
    match body(&mut interface, instance).await {
        Ok(value) => Ok(value),
        Err(error) => Err(into_lifecycle_error(operation, I::RESOURCE_TYPE, error)),
    }
}

fn into_lifecycle_error(
    operation: Operation,
    resource_type: &str,
    error: StratoError,
) -> StratoError {
    if error.is_recoverable() {
        return error;
    }
    let transient = error
        .remote()
        .filter(|remote| remote.is_retryable())
        .map(RemoteError::retry_after);
    match transient {
        Some(retry_after) => {
            warn!(
                "Transient remote failure during {} of {}, asking the host to retry: {}",
                operation, resource_type, error
            );
            match retry_after {
                Some(after) => StratoError::recoverable_after(after, error),
                None => StratoError::recoverable(error),
            }
        }
        None => error,
    }
}
