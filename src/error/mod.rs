//! Two-level error model: domain errors and their API projection.

mod api;
mod domain;

pub use api::{
    new_api_error, ApiError, ApiErrorKind, ApiErrorResponse, INTERNAL_SERVER_ERROR_MESSAGE,
};
pub use domain::{
    find_domain_error, get_error_context, get_error_type, is_conflict, is_not_found,
    is_validation_error, BoxError, Error, ErrorContext, ErrorKind, Result,
};
