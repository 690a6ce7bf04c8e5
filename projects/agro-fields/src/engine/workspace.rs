use crate::engine::analysis::AnalysisCompletion;
use crate::engine::drawing::{Digitizer, PointOutcome};
use crate::engine::error::Result;
use crate::engine::lifecycle::AreaLifecycleManager;
use crate::engine::types::{AreaId, Coordinate, SessionHandle};
use serde::Serialize;

/// Result of feeding a click to the workspace
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DrawingEvent {
    PointAdded { points: Vec<Coordinate> },
    AreaCreated { area_id: AreaId },
}

/// Digitizer plus the areas it feeds
pub struct FieldWorkspace {
    pub digitizer: Digitizer,
    pub areas: AreaLifecycleManager,
}

impl FieldWorkspace {
    pub fn new(digitizer: Digitizer, areas: AreaLifecycleManager) -> Self {
        Self { digitizer, areas }
    }

    pub fn start_drawing(&mut self) -> SessionHandle {
        self.digitizer.start()
    }

    pub fn add_point(&mut self, handle: SessionHandle, coord: Coordinate) -> Result<DrawingEvent> {
        match self.digitizer.add_point(handle, coord)? {
            PointOutcome::Appended(_) => Ok(DrawingEvent::PointAdded {
                points: self.digitizer.points(handle)?.to_vec(),
            }),
            PointOutcome::Closed(polygon) => {
                let area_id = self.areas.create_from_polygon(polygon.into())?;
                Ok(DrawingEvent::AreaCreated { area_id })
            }
        }
    }

    /// Close the active session and turn its ring into a pending area
    pub fn complete_drawing(&mut self, handle: SessionHandle) -> Result<AreaId> {
        let polygon = self.digitizer.complete(handle)?;
        self.areas.create_from_polygon(polygon.into())
    }

    pub fn cancel_drawing(&mut self, handle: SessionHandle) -> Result<()> {
        self.digitizer.cancel(handle)
    }

    pub fn apply_completion(&mut self, completion: AnalysisCompletion) -> bool {
        self.areas.apply_completion(completion)
    }
}
