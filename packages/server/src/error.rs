//! HTTP error mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use alerta_database::StoreError;
use alerta_lifecycle::LifecycleError;
use alerta_server_models::ApiError as ErrorBody;

/// Any failure a handler can return.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed identity headers.
    #[error("{message}")]
    Unauthorized { message: String },

    /// Malformed request outside the lifecycle's own validation.
    #[error("{message}")]
    BadRequest { message: String },

    /// Role not allowed for this endpoint.
    #[error("{message}")]
    Forbidden { message: String },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::BadRequest { .. } | Self::Lifecycle(LifecycleError::Validation { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Forbidden { .. } | Self::Lifecycle(LifecycleError::Forbidden { .. }) => {
                StatusCode::FORBIDDEN
            }
            Self::Lifecycle(LifecycleError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Lifecycle(LifecycleError::Conflict { .. }) => StatusCode::CONFLICT,
            Self::Lifecycle(LifecycleError::Store(_)) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        }
        HttpResponse::build(status).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
