//! HTTP client with an interceptor chain and retried token acquisition.

use log::debug;
use parking_lot::RwLock;
use reqwest::{IntoUrl, Method, Request, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::interceptor::Interceptor;
use super::retry::RetryPolicy;
use super::token::TokenResponse;
use super::transport::{ReqwestTransport, Transport};
use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};

const USER_AGENT: &str = "httpcl";

/// Outbound HTTP client.
///
/// Built once from a validated [`ClientConfig`] and shared (usually behind an
/// `Arc`) by every caller for the lifetime of the process.
pub struct HttpClient {
    config: ClientConfig,
    http: reqwest::Client,
    transport: Arc<dyn Transport>,
    interceptors: RwLock<Vec<Arc<dyn Interceptor>>>,
    retry: RetryPolicy,
}

pub struct HttpClientBuilder {
    config: ClientConfig,
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Option<Arc<dyn Transport>>,
    retry: RetryPolicy,
}

impl HttpClientBuilder {
    /// Appends an interceptor. Registration order is `before` order.
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Replaces the default reqwest-backed transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validates the configuration and builds the client.
    pub fn build(self) -> Result<HttpClient> {
        self.config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| {
                Error::new(
                    ErrorKind::OperationFailed,
                    "Failed to build HTTP client",
                    Some(e),
                )
            })?;

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new(http.clone())));

        debug!(
            "HTTP client ready: {} interceptors, timeout {:?}",
            self.interceptors.len(),
            self.config.timeout
        );

        Ok(HttpClient {
            config: self.config,
            http,
            transport,
            interceptors: RwLock::new(self.interceptors),
            retry: self.retry,
        })
    }
}

impl HttpClient {
    pub fn builder(config: ClientConfig) -> HttpClientBuilder {
        HttpClientBuilder {
            config,
            interceptors: Vec::new(),
            transport: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts a request on the pooled client. Send it with [`Self::do_request`]
    /// so the interceptors apply.
    pub fn request(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        self.http.request(method, url)
    }

    /// Appends an interceptor after construction.
    ///
    /// Calls already in flight keep the sequence they started with; the new
    /// interceptor applies from the next call on.
    pub fn add_interceptor(&self, interceptor: impl Interceptor + 'static) {
        self.interceptors.write().push(Arc::new(interceptor));
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.read().len()
    }

    /// Executes one request through the interceptor chain, without retry.
    ///
    /// `before` hooks run in registration order and the first error aborts
    /// the call before anything is sent. `after` hooks run in reverse order
    /// for both responses and transport errors; the first one to return an
    /// error ends the chain with that error.
    #[tracing::instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    pub async fn do_request(&self, request: Request) -> Result<Response> {
        // Snapshot so no lock is held across an await.
        let interceptors: Vec<Arc<dyn Interceptor>> = self.interceptors.read().clone();

        let mut request = request;
        for interceptor in &interceptors {
            request = interceptor.before(request).await?;
        }

        let mut outcome = self.transport.execute(request).await;

        for interceptor in interceptors.iter().rev() {
            outcome = interceptor.after(outcome).await;
            if outcome.is_err() {
                return outcome;
            }
        }

        outcome
    }

    /// Requests an access token with a URL-encoded form POST to `endpoint`.
    ///
    /// Each attempt goes through [`Self::do_request`]. Transport failures,
    /// non-200 statuses and undecodable bodies are all retried under the
    /// client's [`RetryPolicy`]. `params` are sent in order; a key may repeat.
    #[tracing::instrument(skip(self, params))]
    pub async fn get_access_token<K, V>(
        &self,
        endpoint: &str,
        params: &[(K, V)],
    ) -> Result<TokenResponse>
    where
        K: Serialize + Sync,
        V: Serialize + Sync,
    {
        debug!("Requesting access token from {}...", endpoint);

        self.retry
            .run("get access token", || self.token_attempt(endpoint, params))
            .await
    }

    /// [`Self::get_access_token`] against the configured endpoint with the
    /// configured credentials.
    pub async fn fetch_token(&self) -> Result<TokenResponse> {
        let params = self.config.token_params();
        self.get_access_token(&self.config.token_endpoint, &params)
            .await
    }

    async fn token_attempt<K, V>(&self, endpoint: &str, params: &[(K, V)]) -> Result<TokenResponse>
    where
        K: Serialize + Sync,
        V: Serialize + Sync,
    {
        let request = self
            .http
            .post(endpoint)
            .form(params)
            .build()
            .map_err(|e| {
                Error::new(
                    ErrorKind::InvalidInput,
                    format!("Failed to build token request for {}", endpoint),
                    Some(e),
                )
            })?;

        let response = self.do_request(request).await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::operation_failed(format!(
                "Token endpoint returned status {}",
                status.as_u16()
            ))
            .with_context_entry("status", status.as_u16())
            .with_context_entry("endpoint", endpoint));
        }

        response.json::<TokenResponse>().await.map_err(|e| {
            Error::new(
                ErrorKind::OperationFailed,
                "Failed to decode token response",
                Some(e),
            )
        })
    }
}
