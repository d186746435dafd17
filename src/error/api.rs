//! Transport-facing errors and the domain → API translation.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::domain::{find_domain_error, ErrorContext, ErrorKind};

/// Message used for errors that carry no domain classification.
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiErrorKind {
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "CONFLICT")]
    Conflict,
    #[serde(rename = "BAD_REQUEST")]
    BadRequest,
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized,
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "SERVICE_UNAVAILABLE")]
    Unavailable,
    #[serde(rename = "FORBIDDEN")]
    Forbidden,
}

impl ApiErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorKind::NotFound => "NOT_FOUND",
            ApiErrorKind::Conflict => "CONFLICT",
            ApiErrorKind::BadRequest => "BAD_REQUEST",
            ApiErrorKind::Internal => "INTERNAL_ERROR",
            ApiErrorKind::Validation => "VALIDATION_ERROR",
            ApiErrorKind::Unauthorized => "UNAUTHORIZED",
            ApiErrorKind::Timeout => "TIMEOUT",
            ApiErrorKind::Unavailable => "SERVICE_UNAVAILABLE",
            ApiErrorKind::Forbidden => "FORBIDDEN",
        }
    }

    /// Looks up the API kind for a domain kind. `None` means the domain kind
    /// has no dedicated API counterpart.
    pub fn from_domain(kind: ErrorKind) -> Option<Self> {
        match kind {
            ErrorKind::NotFound => Some(ApiErrorKind::NotFound),
            ErrorKind::Conflict => Some(ApiErrorKind::Conflict),
            ErrorKind::InvalidInput => Some(ApiErrorKind::BadRequest),
            ErrorKind::Validation => Some(ApiErrorKind::Validation),
            ErrorKind::OperationFailed => Some(ApiErrorKind::Internal),
            ErrorKind::Connection => Some(ApiErrorKind::Unavailable),
            ErrorKind::Timeout => Some(ApiErrorKind::Timeout),
            ErrorKind::Authentication => Some(ApiErrorKind::Unauthorized),
            ErrorKind::Authorization => Some(ApiErrorKind::Forbidden),
            ErrorKind::Unavailable => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorKind::BadRequest | ApiErrorKind::Validation => StatusCode::BAD_REQUEST,
            ApiErrorKind::NotFound => StatusCode::NOT_FOUND,
            ApiErrorKind::Conflict => StatusCode::CONFLICT,
            ApiErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorKind::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error ready to be reported across a transport boundary.
///
/// Only [`new_api_error`] creates these; the fields are read-only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}{}", details_suffix(.details))]
pub struct ApiError {
    kind: ApiErrorKind,
    code: u16,
    message: String,
    details: Option<String>,
    context: Option<ErrorContext>,
}

fn details_suffix(details: &Option<String>) -> String {
    match details {
        Some(d) => format!(" ({})", d),
        None => String::new(),
    }
}

impl ApiError {
    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        self.context.as_ref()
    }

    pub fn to_response(&self) -> ApiErrorResponse {
        ApiErrorResponse {
            kind: self.kind,
            code: self.code,
            message: self.message.clone(),
            details: self.details.clone(),
            context: self.context.clone(),
        }
    }
}

/// JSON body for error responses. Absent details and context are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(rename = "type")]
    pub kind: ApiErrorKind,
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

impl ApiErrorResponse {
    pub fn is_type(&self, kind: ApiErrorKind) -> bool {
        self.kind == kind
    }

    pub fn has_code(&self, code: u16) -> bool {
        self.code == code
    }
}

/// Translates any error into an [`ApiError`] and its status code.
///
/// A domain error anywhere in the source chain decides the kind; anything
/// else becomes a generic internal error whose text only appears in
/// `details`. An empty details string or context map is treated as absent.
/// Never fails.
pub fn new_api_error(err: &(dyn std::error::Error + 'static)) -> (ApiError, StatusCode) {
    match find_domain_error(err) {
        Some(domain) => {
            let kind = ApiErrorKind::from_domain(domain.kind()).unwrap_or(ApiErrorKind::Internal);
            let status = kind.status();
            let api_error = ApiError {
                kind,
                code: status.as_u16(),
                message: domain.message().to_string(),
                details: domain
                    .details()
                    .map(|cause| cause.to_string())
                    .filter(|details| !details.is_empty()),
                context: domain.context().filter(|ctx| !ctx.is_empty()).cloned(),
            };
            (api_error, status)
        }
        None => {
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            let api_error = ApiError {
                kind: ApiErrorKind::Internal,
                code: status.as_u16(),
                message: INTERNAL_SERVER_ERROR_MESSAGE.to_string(),
                details: Some(err.to_string()).filter(|details| !details.is_empty()),
                context: None,
            };
            (api_error, status)
        }
    }
}
