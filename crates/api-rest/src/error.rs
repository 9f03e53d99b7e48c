use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use urc_core::SurveillanceError;
use urc_records::RecordsError;
use urc_uuid::UuidError;
use utoipa::ToSchema;

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

/// Errors returned by the REST handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request data caught before reaching the service.
    BadRequest(String),
    Surveillance(SurveillanceError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Surveillance(SurveillanceError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Surveillance(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            Self::Surveillance(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SurveillanceError> for ApiError {
    fn from(e: SurveillanceError) -> Self {
        Self::Surveillance(e)
    }
}

impl From<RecordsError> for ApiError {
    fn from(e: RecordsError) -> Self {
        Self::Surveillance(e.into())
    }
}

impl From<UuidError> for ApiError {
    fn from(e: UuidError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            Self::BadRequest(msg) => msg,
            Self::Surveillance(e) => e.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(%error, "request failed");
        }
        (status, Json(ErrorRes { error })).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;
