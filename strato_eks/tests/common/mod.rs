use ::mockall::mock;
use ::strato_common::{
    error::Result,
    instance::{Relationship, RuntimeProperties},
    remote::{RemoteApi, RemoteResult},
    serde_json::Value,
};
use ::strato_eks::IAM_ROLE_TYPE;

mock! {
    pub Remote{}
    impl RemoteApi for Remote {
        async fn create_cluster(&self, params: Value) -> RemoteResult<Value>;
        async fn describe_clusters(&self, filter: Value) -> RemoteResult<Value>;
        async fn delete_cluster(&self, request: Value) -> RemoteResult<Value>;
        async fn create_nodegroup(&self, params: Value) -> RemoteResult<Value>;
        async fn describe_nodegroups(&self, filter: Value) -> RemoteResult<Value>;
        async fn delete_nodegroup(&self, request: Value) -> RemoteResult<Value>;
    }
}

/// A relationship to an IAM role whose ARN is already persisted.
pub fn role_relationship(target_id: &str, role_arn: &str) -> Result<Relationship> {
    let mut properties = RuntimeProperties::new();
    properties.set_external_id(role_arn)?;
    Ok(Relationship::new(IAM_ROLE_TYPE, target_id, properties))
}
