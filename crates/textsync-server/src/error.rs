//! Error types for the textsync server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use textsync_core::OperationError;
use thiserror::Error;

/// Errors surfaced to a request's submitter.
///
/// Delivery failures to observers are not in here: they are absorbed by the
/// broadcaster and never reach the submitter.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The request body is not a valid operation.
    #[error("malformed operation: {0}")]
    Decode(#[source] serde_json::Error),

    /// The operation failed validation against the current document.
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// The accepted operation could not be encoded for broadcast.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Decode(_) => StatusCode::BAD_REQUEST,
            ServerError::Operation(e) => match e {
                OperationError::StaleEdit { .. } | OperationError::ForeignEdit => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_REQUEST,
            },
            ServerError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let decode = serde_json::from_str::<u8>("nope").unwrap_err();
        assert_eq!(ServerError::Decode(decode).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::from(OperationError::UnknownKind).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(OperationError::StaleEdit {
                staged: 1,
                current: 2
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServerError::from(OperationError::ForeignEdit).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServerError::Serialization("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServerError::from(std::io::Error::from(std::io::ErrorKind::NotFound)).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err = ServerError::from(OperationError::UnknownKind);
        assert_eq!(err.to_string(), "unrecognized operation kind");
    }
}
