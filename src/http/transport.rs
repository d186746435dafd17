//! The network primitive the client issues requests through.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Request, Response};

use crate::error::{Error, ErrorKind, Result};

/// Executes a single request. Implementations must be safe for concurrent use;
/// connection pooling is their concern, not the caller's.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response>;
}

/// [`Transport`] backed by a pooled reqwest client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    async fn execute(&self, request: Request) -> Result<Response> {
        let url = request.url().to_string();
        self.client.execute(request).await.map_err(|e| {
            debug!("Transport error for {}: {}", url, e);
            classify_transport_error(&url, e)
        })
    }
}

/// Maps a reqwest failure to a domain error: timeouts and connect failures
/// keep their meaning, everything else is an operation failure.
pub fn classify_transport_error(url: &str, error: reqwest::Error) -> Error {
    let (kind, message) = if error.is_timeout() {
        (ErrorKind::Timeout, format!("Request to {} timed out", url))
    } else if error.is_connect() {
        (ErrorKind::Connection, format!("Failed to connect to {}", url))
    } else {
        (ErrorKind::OperationFailed, format!("Request to {} failed", url))
    };
    Error::new(kind, message, Some(error)).with_context_entry("url", url)
}
