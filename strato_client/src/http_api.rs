//! [RemoteApi] over the service's JSON protocol.
//!
//! Every operation is a POST to the one service endpoint. The action goes in
//! the [TARGET_HEADER], parameters in the JSON body. Error responses carry
//! `__type` and `message` fields, which feed the [RemoteError]
//! classification.

use ::core::time::Duration;

use ::strato_common::{
    config::{ClientConfig, Credentials},
    remote::{RemoteApi, RemoteError, RemoteResult},
    serde_json::Value,
    tracing::debug,
};

/// Header carrying the action of a request,
/// e.g. `StratoContainerService.CreateCluster`.
pub const TARGET_HEADER: &str = "x-strato-target";
const TARGET_PREFIX: &str = "StratoContainerService";
/// Header carrying the region a request is scoped to.
pub const REGION_HEADER: &str = "x-strato-region";

/// Client for the remote cluster service.
pub struct HttpRemoteApi {
    endpoint: String,
    region: Option<String>,
    credentials: Option<Credentials>,
    client: reqwest::Client,
}

impl HttpRemoteApi {
    pub fn new(config: &ClientConfig) -> RemoteResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|error| RemoteError::transport("BuildClient", error.to_string(), false))?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            region: config.region.clone(),
            credentials: config.credentials.clone(),
            client,
        })
    }

    async fn call(&self, action: &'static str, params: Value) -> RemoteResult<Value> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(TARGET_HEADER, format!("{}.{}", TARGET_PREFIX, action))
            .json(&params);
        if let Some(region) = &self.region {
            builder = builder.header(REGION_HEADER, region);
        }
        let builder = self.enable_auth_for_request(builder);
        let response = builder
            .send()
            .await
            .map_err(|error| transport_error(action, error))?;

        let status = response.status();
        if status.is_success() {
            debug!("{} succeeded with status {}.", action, status);
            response
                .json()
                .await
                .map_err(|error| transport_error(action, error))
        } else {
            Err(api_error(action, response).await)
        }
    }

    /// Enable authentication for a request builder.
    fn enable_auth_for_request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some(Credentials::Basic { username, password }) => {
                builder.basic_auth(username, password.as_ref())
            }
            Some(Credentials::Bearer { token }) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn transport_error(action: &'static str, error: reqwest::Error) -> RemoteError {
    let retryable = error.is_timeout() || error.is_connect();
    RemoteError::transport(action, error.to_string(), retryable)
}

/// Turn an error response into a [RemoteError], keeping the pieces the
/// classification needs: status, the `__type` code with any namespace
/// prefix stripped, the message, and the `retry-after` hint.
async fn api_error(action: &'static str, response: reqwest::Response) -> RemoteError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .map(Duration::from_secs);
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let code = body
        .get("__type")
        .and_then(Value::as_str)
        .map(|code| code.rsplit('#').next().unwrap_or(code).to_owned());
    let message = body
        .get("message")
        .or_else(|| body.get("Message"))
        .and_then(Value::as_str)
        .unwrap_or("no error message in the response body")
        .to_owned();

    let error = RemoteError::api(action, status, code, message);
    match retry_after {
        Some(after) => error.with_retry_after(after),
        None => error,
    }
}

impl RemoteApi for HttpRemoteApi {
    async fn create_cluster(&self, params: Value) -> RemoteResult<Value> {
        self.call("CreateCluster", params).await
    }

    async fn describe_clusters(&self, filter: Value) -> RemoteResult<Value> {
        self.call("DescribeClusters", filter).await
    }

    async fn delete_cluster(&self, request: Value) -> RemoteResult<Value> {
        self.call("DeleteCluster", request).await
    }

    async fn create_nodegroup(&self, params: Value) -> RemoteResult<Value> {
        self.call("CreateNodegroup", params).await
    }

    async fn describe_nodegroups(&self, filter: Value) -> RemoteResult<Value> {
        self.call("DescribeNodegroups", filter).await
    }

    async fn delete_nodegroup(&self, request: Value) -> RemoteResult<Value> {
        self.call("DeleteNodegroup", request).await
    }
}
