use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use edms_service::ServiceError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub tag: &'static str,
    pub kind: &'static str,
    pub message: String,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        let code = match self {
            Self::Service(e) => e.status(),
            Self::AuthFailed(_) | Self::AuthorizationDenied(_) => 401,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => 500,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn body(&self) -> ErrorBody {
        let (tag, kind) = match self {
            Self::Service(e) => (e.tag(), e.kind()),
            Self::AuthFailed(_) | Self::AuthorizationDenied(_) => {
                ("#UNAUTHENTICATED", "AuthenticationError")
            }
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => ("#INTERNAL", "InternalError"),
        };
        ErrorBody {
            tag,
            kind,
            message: self.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
