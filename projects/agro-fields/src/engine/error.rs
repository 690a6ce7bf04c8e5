use crate::engine::types::{AreaId, AreaStatus, SessionHandle};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the drawing and area lifecycle operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("need at least 3 points to close a boundary, have {points}")]
    InvalidPolygon { points: usize },
    #[error("coordinate ({lat}, {lng}) is outside the valid range")]
    InvalidCoordinate { lat: f64, lng: f64 },
    #[error("drawing session {0} is not active")]
    UnknownSession(SessionHandle),
    #[error("drawing session is not accepting points")]
    NotDrawing,
    #[error("area {0} does not exist")]
    UnknownArea(AreaId),
    #[error("area {id} is {actual}, expected {expected}")]
    InvalidTransition {
        id: AreaId,
        actual: AreaStatus,
        expected: AreaStatus,
    },
}

/// Failure reported for a single analysis request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),
    #[error("analysis backend failed: {0}")]
    Backend(String),
}
