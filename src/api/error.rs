use crate::db::RepositoryError;
use crate::ingest::IngestError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest {
        message: String,
        details: Option<Value>,
    },
    PayloadTooLarge(String),
    NotFound(String),
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn invalid_field(field: &str, message: &str) -> Self {
        Self::BadRequest {
            message: format!("Invalid {field}: {message}"),
            details: Some(json!({ "field": field, "reason": message })),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Constraint { field, message } => Self::invalid_field(&field, &message),
            RepositoryError::NotFound(entity) => Self::NotFound(format!("{entity} not found")),
            RepositoryError::Backend(error) => Self::Internal(error),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(value: IngestError) -> Self {
        match value {
            IngestError::Validation { field, message } => Self::invalid_field(&field, &message),
            IngestError::TooLarge { field, limit } => Self::PayloadTooLarge(format!(
                "Field {field} exceeds the upload limit of {limit} bytes"
            )),
            IngestError::Storage(error) => error.into(),
            IngestError::Io(error) => Self::Internal(error.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::bad_request(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::bad_request(value.body_text())
    }
}

impl From<axum::http::header::InvalidHeaderValue> for ApiError {
    fn from(value: axum::http::header::InvalidHeaderValue) -> Self {
        Self::Internal(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            ApiError::BadRequest { message, details } => (StatusCode::BAD_REQUEST, message, details),
            ApiError::PayloadTooLarge(message) => (StatusCode::PAYLOAD_TOO_LARGE, message, None),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message, None),
            ApiError::Internal(error) => {
                error!(error = %error, "API request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        (status, Json(ErrorBody { message, details })).into_response()
    }
}
