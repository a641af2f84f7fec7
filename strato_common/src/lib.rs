//! Common types and utilities for the Strato plugin family.
//!
//! Plugins drive resources on a remote cluster service through three pieces
//! that live here: the [remote] seam the wire client implements, the
//! [instance] model carrying everything an operation may touch, and the
//! [lifecycle] runner that binds the two together and owns retry
//! translation.

pub mod arn;
pub mod config;
pub mod error;
pub mod instance;
pub mod lifecycle;
pub mod relationships;
pub mod remote;
pub mod resource_id;

// Re-exported for the other Strato crates and for hosts, so everyone
// compiles against the same versions.
pub use anyhow;
pub use serde;
pub use serde_json;
pub use time;
pub use tokio;
pub use tracing;
pub use tracing_subscriber;
