use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use common::{ErrorResponse, PredictError};

pub const NO_JSON_BODY: &str = "No JSON body provided";

pub enum AppError {
    BadRequest(String),
    Internal(String),
}

impl AppError {
    pub fn no_body() -> Self {
        AppError::BadRequest(NO_JSON_BODY.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("Failed to decode JSON object: {}", err))
    }
}
