use crate::error::DataSweeperError;
use crate::error::ErrorKind;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Request failures, rendered as `{ "kind", "message" }`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    Pipeline(#[from] DataSweeperError),

    #[error("{0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(error) => error.status(),
            ApiError::Pipeline(error) => match error.kind() {
                ErrorKind::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ErrorKind::ParseError | ErrorKind::UnknownColumn => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::WriteError | ErrorKind::Other => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> String {
        match self {
            ApiError::BadRequest(_) | ApiError::Multipart(_) => "BadRequest".to_owned(),
            ApiError::Pipeline(error) => format!("{:?}", error.kind()),
            ApiError::Task(_) => "Other".to_owned(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        let body = Json(json!({ "kind": self.kind(), "message": self.to_string() }));
        (status, body).into_response()
    }
}
