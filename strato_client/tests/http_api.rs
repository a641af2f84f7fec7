use ::core::time::Duration;

use ::httpmock::prelude::*;
use ::strato_client::HttpRemoteApi;
use ::strato_common::{
    config::{ClientConfig, Credentials},
    remote::RemoteApi,
    serde_json::json,
    tokio,
};

fn config(endpoint: String) -> ClientConfig {
    ClientConfig {
        endpoint,
        region: Some("us-east-1".to_owned()),
        credentials: Some(Credentials::Bearer {
            token: "admin".to_owned(),
        }),
        timeout_secs: None,
    }
}

#[tokio::test]
async fn create_cluster_success() {
    let server = MockServer::start();
    let params = json!({
        "clusterName": "c1",
        "RoleArn": "arn:aws:iam::123456789012:role/eks",
    });
    let response_body = json!({
        "cluster": {
            "clusterName": "c1",
            "clusterArn": "arn:aws:eks:us-east-1:123456789012:cluster/c1",
            "status": "CREATING",
        }
    });
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .header("x-strato-target", "StratoContainerService.CreateCluster")
            .header("x-strato-region", "us-east-1")
            .header_exists("Authorization")
            .json_body(params.clone());
        then.status(200).json_body(response_body.clone());
    });
    let api = HttpRemoteApi::new(&config(server.base_url())).unwrap();
    let response = api.create_cluster(params).await.unwrap();

    mock.assert();
    assert_eq!(response, response_body);
}

#[tokio::test]
async fn delete_cluster_sends_exactly_the_request() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .header("x-strato-target", "StratoContainerService.DeleteCluster")
            .json_body(json!({"cluster": "c1"}));
        then.status(200)
            .json_body(json!({"cluster": {"clusterName": "c1", "status": "DELETING"}}));
    });
    let api = HttpRemoteApi::new(&config(server.base_url())).unwrap();
    let response = api.delete_cluster(json!({"cluster": "c1"})).await.unwrap();

    mock.assert();
    assert_eq!(
        response,
        json!({"cluster": {"clusterName": "c1", "status": "DELETING"}})
    );
}

#[tokio::test]
async fn describe_clusters_not_found() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .header("x-strato-target", "StratoContainerService.DescribeClusters")
            .json_body(json!({"clusters": ["c1"]}));
        then.status(404).json_body(json!({
            "__type": "ResourceNotFoundException",
            "message": "No cluster found for name: c1.",
        }));
    });
    let api = HttpRemoteApi::new(&config(server.base_url())).unwrap();
    let err = api
        .describe_clusters(json!({"clusters": ["c1"]}))
        .await
        .unwrap_err();

    mock.assert();
    assert!(err.is_not_found());
    assert!(!err.is_retryable());
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.code(), Some("ResourceNotFoundException"));
    assert_eq!(err.message(), "No cluster found for name: c1.");
}

#[tokio::test]
async fn create_cluster_throttled() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .header("x-strato-target", "StratoContainerService.CreateCluster");
        then.status(429).header("retry-after", "2").json_body(json!({
            "__type": "com.amazon.coral.availability#ThrottlingException",
            "message": "Rate exceeded.",
        }));
    });
    let api = HttpRemoteApi::new(&config(server.base_url())).unwrap();
    let err = api
        .create_cluster(json!({"clusterName": "c1"}))
        .await
        .unwrap_err();

    mock.assert();
    assert!(err.is_retryable());
    // namespace prefix is stripped from the code
    assert_eq!(err.code(), Some("ThrottlingException"));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
}

#[tokio::test]
async fn create_cluster_access_denied_is_fatal() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .header("x-strato-target", "StratoContainerService.CreateCluster");
        then.status(403).json_body(json!({
            "__type": "AccessDeniedException",
            "message": "User is not authorized to perform: CreateCluster.",
        }));
    });
    let api = HttpRemoteApi::new(&config(server.base_url())).unwrap();
    let err = api
        .create_cluster(json!({"clusterName": "c1"}))
        .await
        .unwrap_err();

    mock.assert();
    assert!(!err.is_retryable());
    assert!(!err.is_not_found());
    assert_eq!(
        err.message(),
        "User is not authorized to perform: CreateCluster."
    );
}

#[tokio::test]
async fn error_body_that_is_not_json() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .header("x-strato-target", "StratoContainerService.DeleteNodegroup");
        then.status(502).body("bad gateway");
    });
    let api = HttpRemoteApi::new(&config(server.base_url())).unwrap();
    let err = api
        .delete_nodegroup(json!({"clusterName": "c1", "nodegroupName": "ng1"}))
        .await
        .unwrap_err();

    mock.assert();
    assert!(err.is_retryable());
    assert_eq!(err.status(), Some(502));
    assert_eq!(err.code(), None);
    assert_eq!(err.message(), "no error message in the response body");
}

#[tokio::test]
async fn describe_nodegroups_success() {
    let server = MockServer::start();
    let response_body = json!({
        "nodegroups": [{
            "nodegroupName": "ng1",
            "clusterName": "c1",
            "status": "ACTIVE",
        }]
    });
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .header(
                "x-strato-target",
                "StratoContainerService.DescribeNodegroups",
            )
            .json_body(json!({"clusterName": "c1", "nodegroups": ["ng1"]}));
        then.status(200).json_body(response_body.clone());
    });
    let api = HttpRemoteApi::new(&config(server.base_url())).unwrap();
    let response = api
        .describe_nodegroups(json!({"clusterName": "c1", "nodegroups": ["ng1"]}))
        .await
        .unwrap();

    mock.assert();
    assert_eq!(response, response_body);
}

#[tokio::test]
async fn requests_without_credentials_or_region_still_work() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .header("x-strato-target", "StratoContainerService.DeleteCluster");
        then.status(200).json_body(json!({}));
    });
    let api = HttpRemoteApi::new(&ClientConfig {
        endpoint: server.base_url(),
        region: None,
        credentials: None,
        timeout_secs: Some(5),
    })
    .unwrap();
    let response = api.delete_cluster(json!({"cluster": "c1"})).await.unwrap();

    mock.assert();
    assert_eq!(response, json!({}));
}
