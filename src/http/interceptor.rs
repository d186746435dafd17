//! Request/response hooks that wrap every call made through [`super::HttpClient`].

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Request, Response};
use std::sync::Arc;

use crate::error::{Error, ErrorKind, Result};

/// A pair of hooks around one request.
///
/// `before` hooks run in registration order and may rewrite or reject the
/// request. `after` hooks run in reverse registration order and see either
/// the response or the transport error; returning `Err` stops the chain.
///
/// The default `after` hands a transport error straight back, which also
/// stops the chain. Hooks registered earlier never see that error, so an
/// interceptor that must observe every failure (a logger) belongs last.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn before(&self, request: Request) -> Result<Request> {
        Ok(request)
    }

    async fn after(&self, outcome: Result<Response>) -> Result<Response> {
        outcome
    }
}

/// Logs each request and its outcome.
#[derive(Debug, Default, Clone)]
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn before(&self, request: Request) -> Result<Request> {
        debug!("--> {} {}", request.method(), request.url());
        Ok(request)
    }

    async fn after(&self, outcome: Result<Response>) -> Result<Response> {
        match &outcome {
            Ok(response) => debug!("<-- {} {}", response.status(), response.url()),
            Err(e) => warn!("<-- request failed: {}", e),
        }
        outcome
    }
}

/// Injects `Authorization: Bearer <token>` into every request.
///
/// Until a token is set, requests pass through untouched. Share it through
/// an `Arc` to register it before the token is known.
#[derive(Default)]
pub struct BearerAuthInterceptor {
    header: RwLock<Option<HeaderValue>>,
}

impl BearerAuthInterceptor {
    pub fn new(token: &str) -> Result<Self> {
        let interceptor = Self::unset();
        interceptor.set_token(token)?;
        Ok(interceptor)
    }

    pub fn unset() -> Self {
        Self::default()
    }

    /// Replaces the token sent with subsequent requests.
    pub fn set_token(&self, token: &str) -> Result<()> {
        let mut header = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                "Access token contains characters not allowed in a header",
                Some(e),
            )
        })?;
        header.set_sensitive(true);
        *self.header.write() = Some(header);
        Ok(())
    }
}

#[async_trait]
impl Interceptor for BearerAuthInterceptor {
    async fn before(&self, mut request: Request) -> Result<Request> {
        let header = self.header.read().clone();
        if let Some(header) = header {
            request.headers_mut().insert(AUTHORIZATION, header);
        }
        Ok(request)
    }
}

#[async_trait]
impl<T> Interceptor for Arc<T>
where
    T: Interceptor + ?Sized,
{
    async fn before(&self, request: Request) -> Result<Request> {
        (**self).before(request).await
    }

    async fn after(&self, outcome: Result<Response>) -> Result<Response> {
        (**self).after(outcome).await
    }
}
