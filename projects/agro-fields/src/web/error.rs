use crate::engine::error::EngineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

impl EngineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::InvalidPolygon { .. } | EngineError::InvalidCoordinate { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            EngineError::UnknownSession(_) | EngineError::UnknownArea(_) => StatusCode::NOT_FOUND,
            EngineError::NotDrawing | EngineError::InvalidTransition { .. } => StatusCode::CONFLICT,
        }
    }
}

/// Errors go out as `{ "error": "<message>" }` for the dashboard's toasts
impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
