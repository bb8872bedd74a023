//! HTTP client abstraction for remote image sources.

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::store::BoxFuture;

/// Default request timeout for remote sources.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from fetching a remote source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// The client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    /// The request failed before a response arrived.
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body could not be read.
    #[error("Failed to read response: {0}")]
    Body(String),
}

/// Trait for fetching remote image bytes.
///
/// Lets the generator run against a mock in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET and returns the full response body.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, HttpError>>;
}

/// Real HTTP client implementation using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new client with [`DEFAULT_HTTP_TIMEOUT`].
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Creates a new client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, HttpError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| HttpError::Request(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(HttpError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            response
                .bytes()
                .await
                .map_err(|e| HttpError::Body(e.to_string()))
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Mock HTTP client returning a fixed response.
    pub(crate) struct MockHttpClient {
        pub response: Result<Bytes, HttpError>,
    }

    impl AsyncHttpClient for MockHttpClient {
        fn get<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Bytes, HttpError>> {
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    #[tokio::test]
    async fn test_mock_client_success() {
        let mock = MockHttpClient {
            response: Ok(Bytes::from_static(&[1, 2, 3, 4])),
        };

        let body = mock.get("http://example.com/a.png").await.unwrap();
        assert_eq!(&body[..], &[1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_mock_client_error() {
        let mock = MockHttpClient {
            response: Err(HttpError::Status {
                status: 404,
                url: "http://example.com/a.png".to_string(),
            }),
        };

        let err = mock.get("http://example.com/a.png").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 404 from http://example.com/a.png");
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(ReqwestClient::with_timeout(Duration::from_secs(5)).is_ok());
    }
}
