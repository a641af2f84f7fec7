//! Wire client for the remote cluster service.

pub mod http_api;

pub use http_api::HttpRemoteApi;
