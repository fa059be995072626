//! Conversion of [`DomainError`] into HTTP responses.
//!
//! The create and read routes answer with `{error}`; the vote route answers
//! with `{success:false,message}`. Storage failures never leak their cause.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use thiserror::Error;
use tracing::error;

use crate::dto::{ErrorResponse, VoteRejected};

const SERVER_ERROR: &str = "Server error";

#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub DomainError);

#[derive(Debug, Error)]
#[error(transparent)]
pub struct VoteError(#[from] pub DomainError);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(DomainError::InvalidPayload(rejection.body_text()))
    }
}

impl From<JsonRejection> for VoteError {
    fn from(rejection: JsonRejection) -> Self {
        Self(DomainError::InvalidPayload(rejection.body_text()))
    }
}

pub fn status_of(err: &DomainError) -> StatusCode {
    match err {
        DomainError::InvalidPayload(_) | DomainError::InvalidOption(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Network(_) => StatusCode::BAD_GATEWAY,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing text. Conflicts carry their reason verbatim.
fn public_message(err: &DomainError, status: StatusCode) -> String {
    match err {
        DomainError::Conflict(reason) => reason.clone(),
        DomainError::InvalidOption(_) => "Invalid option".to_string(),
        DomainError::NotFound(_) => "Poll not found".to_string(),
        _ if status.is_server_error() => SERVER_ERROR.to_string(),
        other => other.to_string(),
    }
}

fn log_server_error(err: &DomainError, status: StatusCode) {
    if status.is_server_error() {
        error!(error = %err, status = status.as_u16(), "request failed");
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        log_server_error(&self.0, status);
        let body = ErrorResponse {
            error: public_message(&self.0, status),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for VoteError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        log_server_error(&self.0, status);
        let body = VoteRejected::new(public_message(&self.0, status));
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(status_of(&DomainError::InvalidPayload("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(&DomainError::InvalidOption(9)), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(&DomainError::NotFound("p".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(&DomainError::Conflict("dup".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(&DomainError::Storage("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_details_are_hidden() {
        let err = DomainError::Storage("/var/lib/polls.json: permission denied".into());
        let status = status_of(&err);
        assert_eq!(public_message(&err, status), "Server error");
    }

    #[test]
    fn conflict_reason_is_passed_through() {
        let err = DomainError::Conflict("Session already participated".into());
        let status = status_of(&err);
        assert_eq!(public_message(&err, status), "Session already participated");
    }
}
