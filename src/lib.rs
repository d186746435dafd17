pub mod config;
pub mod error;
pub mod http;

pub use config::ClientConfig;
pub use error::{new_api_error, ApiError, Error, ErrorKind, Result};
pub use http::{HttpClient, Interceptor, TokenResponse};
