//! Lifecycle plugin for EKS style managed clusters.
//!
//! Every resource module follows the same shape: a typed configuration with
//! a pass-through tail, an interface bound per operation, and the `prepare`,
//! `create` and `delete` operations run through the common lifecycle runner.

pub mod resources;

/// Node type tag of IAM role nodes, resolved through relationships.
pub const IAM_ROLE_TYPE: &str = "strato.nodes.iam.Role";
/// Node type tag of cluster nodes, resolved through relationships.
pub const CLUSTER_NODE_TYPE: &str = "strato.nodes.eks.Cluster";
