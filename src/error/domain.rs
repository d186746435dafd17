//! Domain-level errors raised by the client core and by application code.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Boxed underlying cause carried in [`Error::details`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Diagnostic metadata attached to an error.
pub type ErrorContext = HashMap<String, Value>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The closed set of domain error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "CONFLICT")]
    Conflict,
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput,
    #[serde(rename = "OPERATION_FAILED")]
    OperationFailed,
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    #[serde(rename = "CONNECTION_ERROR")]
    Connection,
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "SERVICE_UNAVAILABLE")]
    Unavailable,
    #[serde(rename = "AUTHENTICATION_ERROR")]
    Authentication,
    #[serde(rename = "AUTHORIZATION_ERROR")]
    Authorization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::OperationFailed => "OPERATION_FAILED",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Connection => "CONNECTION_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Unavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::Authentication => "AUTHENTICATION_ERROR",
            ErrorKind::Authorization => "AUTHORIZATION_ERROR",
        }
    }

    /// Classifies an upstream HTTP failure status.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::CONFLICT => ErrorKind::Conflict,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::InvalidInput,
            StatusCode::UNAUTHORIZED => ErrorKind::Authentication,
            StatusCode::FORBIDDEN => ErrorKind::Authorization,
            StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => ErrorKind::Timeout,
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => ErrorKind::Connection,
            _ => ErrorKind::OperationFailed,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged domain error.
///
/// The message is never empty: constructors substitute the kind name when
/// given an empty string. The wrapped cause is exposed through
/// [`std::error::Error::source`], so it takes part in normal chain walking.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}{}", details_suffix(.details))]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    details: Option<BoxError>,
    context: Option<ErrorContext>,
}

fn details_suffix(details: &Option<BoxError>) -> String {
    match details {
        Some(cause) => format!(" (details: {})", cause),
        None => String::new(),
    }
}

impl Error {
    pub fn new<E>(kind: ErrorKind, message: impl Into<String>, cause: Option<E>) -> Self
    where
        E: Into<BoxError>,
    {
        let message = message.into();
        let message = if message.is_empty() {
            kind.as_str().to_string()
        } else {
            message
        };

        Self {
            kind,
            message,
            details: cause.map(Into::into),
            context: None,
        }
    }

    pub fn with_context<E>(
        kind: ErrorKind,
        message: impl Into<String>,
        cause: Option<E>,
        context: ErrorContext,
    ) -> Self
    where
        E: Into<BoxError>,
    {
        let mut error = Self::new(kind, message, cause);
        error.context = Some(context);
        error
    }

    /// Builds an error without an underlying cause.
    pub fn msg(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None::<BoxError>)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::msg(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::msg(ErrorKind::Conflict, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::msg(ErrorKind::InvalidInput, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::msg(ErrorKind::Validation, message)
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::msg(ErrorKind::OperationFailed, message)
    }

    /// Adds a single context entry, creating the context map on first use.
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.details.as_deref()
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        self.context.as_ref()
    }
}

/// Finds the first domain error in `err`'s source chain, `err` included.
pub fn find_domain_error<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a Error> {
    std::iter::successors(Some(err), |e| e.source()).find_map(|e| e.downcast_ref::<Error>())
}

pub fn is_not_found(err: &(dyn std::error::Error + 'static)) -> bool {
    get_error_type(err) == Some(ErrorKind::NotFound)
}

pub fn is_conflict(err: &(dyn std::error::Error + 'static)) -> bool {
    get_error_type(err) == Some(ErrorKind::Conflict)
}

pub fn is_validation_error(err: &(dyn std::error::Error + 'static)) -> bool {
    get_error_type(err) == Some(ErrorKind::Validation)
}

/// Returns the kind of the first domain error in the chain, if any.
pub fn get_error_type(err: &(dyn std::error::Error + 'static)) -> Option<ErrorKind> {
    find_domain_error(err).map(Error::kind)
}

/// Returns the context of the first domain error in the chain, when it has one.
pub fn get_error_context<'a>(
    err: &'a (dyn std::error::Error + 'static),
) -> Option<&'a ErrorContext> {
    find_domain_error(err).and_then(Error::context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    #[error("repository failure")]
    struct RepositoryFailure(#[source] Error);

    #[derive(Debug, thiserror::Error)]
    #[error("plain failure")]
    struct PlainFailure;

    #[test]
    fn test_display_without_details() {
        let err = Error::not_found("customer 42 not found");
        assert_eq!(err.to_string(), "NOT_FOUND: customer 42 not found");
    }

    #[test]
    fn test_display_with_details() {
        let cause = std::io::Error::other("disk gone");
        let err = Error::new(ErrorKind::OperationFailed, "save failed", Some(cause));
        assert_eq!(
            err.to_string(),
            "OPERATION_FAILED: save failed (details: disk gone)"
        );
    }

    #[test]
    fn test_empty_message_falls_back_to_kind() {
        let err = Error::msg(ErrorKind::Timeout, "");
        assert_eq!(err.message(), "TIMEOUT");
    }

    #[test]
    fn test_source_is_details() {
        let err = Error::new(
            ErrorKind::Connection,
            "dial failed",
            Some(std::io::Error::other("refused")),
        );
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "refused");
    }

    #[test]
    fn test_with_context_entry_accumulates() {
        let err = Error::validation("bad age")
            .with_context_entry("field", "age")
            .with_context_entry("value", -3);

        let ctx = err.context().unwrap();
        assert_eq!(ctx.get("field"), Some(&json!("age")));
        assert_eq!(ctx.get("value"), Some(&json!(-3)));
    }

    #[test]
    fn test_predicates_direct() {
        assert!(is_not_found(&Error::not_found("x")));
        assert!(is_conflict(&Error::conflict("x")));
        assert!(is_validation_error(&Error::validation("x")));

        assert!(!is_not_found(&Error::conflict("x")));
        assert!(!is_conflict(&Error::validation("x")));
        assert!(!is_validation_error(&Error::invalid_input("x")));
    }

    #[test]
    fn test_predicates_walk_the_chain() {
        let wrapped = RepositoryFailure(Error::not_found("customer missing"));
        assert!(is_not_found(&wrapped));
        assert!(!is_conflict(&wrapped));

        let via_anyhow = anyhow::Error::new(Error::conflict("duplicate email")).context("creating");
        assert!(is_conflict(&*via_anyhow));
    }

    #[test]
    fn test_predicates_false_for_non_domain_errors() {
        assert!(!is_not_found(&PlainFailure));
        assert!(!is_conflict(&PlainFailure));
        assert!(!is_validation_error(&PlainFailure));
        assert_eq!(get_error_type(&PlainFailure), None);
    }

    #[test]
    fn test_get_error_context() {
        let mut ctx = ErrorContext::new();
        ctx.insert("id".to_string(), json!(7));
        let err = Error::with_context(ErrorKind::NotFound, "missing", None::<BoxError>, ctx);

        assert_eq!(get_error_type(&err), Some(ErrorKind::NotFound));
        assert_eq!(get_error_context(&err).unwrap().get("id"), Some(&json!(7)));

        // Present kind, absent context.
        assert!(get_error_context(&Error::not_found("missing")).is_none());
    }

    #[test]
    fn test_kind_from_status() {
        assert_eq!(ErrorKind::from_status(StatusCode::NOT_FOUND), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_status(StatusCode::UNAUTHORIZED), ErrorKind::Authentication);
        assert_eq!(ErrorKind::from_status(StatusCode::FORBIDDEN), ErrorKind::Authorization);
        assert_eq!(ErrorKind::from_status(StatusCode::BAD_GATEWAY), ErrorKind::Connection);
        assert_eq!(ErrorKind::from_status(StatusCode::IM_A_TEAPOT), ErrorKind::OperationFailed);
    }

    #[test]
    fn test_kind_serializes_to_wire_name() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::Validation).unwrap(),
            r#""VALIDATION_ERROR""#
        );
        assert_eq!(ErrorKind::Connection.to_string(), "CONNECTION_ERROR");
    }
}
