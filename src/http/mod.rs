//! Outbound HTTP client with an interceptor chain and retried token acquisition.

mod client;
mod interceptor;
mod retry;
mod token;
mod transport;

pub use client::{HttpClient, HttpClientBuilder};
pub use interceptor::{BearerAuthInterceptor, Interceptor, LoggingInterceptor};
pub use retry::{RetryPolicy, BASE_DELAY, MAX_ATTEMPTS};
pub use token::TokenResponse;
pub use transport::{classify_transport_error, ReqwestTransport, Transport};
