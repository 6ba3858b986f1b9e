use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Rejected lifecycle transitions. None of these are fatal; the model is
/// left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("simulation has ended; reset before starting again")]
    Ended,

    #[error("unknown control action: {0}")]
    UnknownAction(String),
}

/// Client input that could not be understood.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("binary frames are not supported")]
    Binary,
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Ended => StatusCode::CONFLICT,
            Self::UnknownAction(_) => StatusCode::BAD_REQUEST,
        };
        let body = serde_json::json!({
            "success": false,
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}
