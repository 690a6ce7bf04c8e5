// Boundary digitizing
//
// A `DrawingSession` collects clicked coordinates until the ring is closed,
// either by clicking back near the first vertex or by an explicit complete.
// The `Digitizer` owns at most one live session and hands out a handle for
// it; every operation must present the handle it was given.

use crate::engine::error::{EngineError, Result};
use crate::engine::geometry::distance_meters;
use crate::engine::types::{distinct_count, Coordinate, Polygon, SessionHandle};
use tracing::{debug, info};

/// Clicking within this distance of the first vertex closes the ring
pub const DEFAULT_CLOSE_DISTANCE_M: f64 = 20.0;

/// Distance primitive used for the closure test
pub type DistanceFn = fn(&Coordinate, &Coordinate) -> f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Drawing,
    Closed,
    Cancelled,
}

/// What happened to an incoming point
#[derive(Debug, Clone, PartialEq)]
pub enum PointOutcome {
    /// Point appended; carries the new point count
    Appended(usize),
    /// Point landed near the first vertex and closed the ring without being appended
    Closed(Polygon),
}

#[derive(Debug, Clone)]
pub struct DrawingSession {
    state: SessionState,
    points: Vec<Coordinate>,
    close_distance_m: f64,
    distance: DistanceFn,
}

impl DrawingSession {
    pub fn new(close_distance_m: f64, distance: DistanceFn) -> Self {
        Self {
            state: SessionState::Idle,
            points: Vec::new(),
            close_distance_m,
            distance,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Points placed so far, in click order
    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    /// Begin (or restart) drawing with an empty point list
    pub fn start(&mut self) {
        self.points.clear();
        self.state = SessionState::Drawing;
    }

    pub fn add_point(&mut self, coord: Coordinate) -> Result<PointOutcome> {
        if self.state != SessionState::Drawing {
            return Err(EngineError::NotDrawing);
        }
        if !coord.is_valid() {
            return Err(EngineError::InvalidCoordinate {
                lat: coord.lat,
                lng: coord.lng,
            });
        }

        // a ring with repeated vertices keeps collecting until it can close
        if distinct_count(&self.points) >= Polygon::MIN_VERTICES {
            let to_first = (self.distance)(&coord, &self.points[0]);
            if to_first < self.close_distance_m {
                debug!(
                    "Point {:.1} m from first vertex, closing ring of {} points",
                    to_first,
                    self.points.len()
                );
                return self.close().map(PointOutcome::Closed);
            }
        }

        self.points.push(coord);
        Ok(PointOutcome::Appended(self.points.len()))
    }

    /// Close the ring with the points placed so far.
    ///
    /// With fewer than three distinct points the session stays `Drawing` and
    /// `InvalidPolygon` is returned.
    pub fn complete(&mut self) -> Result<Polygon> {
        if self.state != SessionState::Drawing {
            return Err(EngineError::NotDrawing);
        }
        self.close()
    }

    pub fn cancel(&mut self) {
        self.points.clear();
        self.state = SessionState::Cancelled;
    }

    fn close(&mut self) -> Result<Polygon> {
        let polygon = Polygon::try_from(self.points.clone())?;
        self.points.clear();
        self.state = SessionState::Closed;
        Ok(polygon)
    }
}

/// Owner of the live drawing session
#[derive(Debug)]
pub struct Digitizer {
    active: Option<(SessionHandle, DrawingSession)>,
    next_handle: u64,
    close_distance_m: f64,
    distance: DistanceFn,
}

impl Default for Digitizer {
    fn default() -> Self {
        Self::new(DEFAULT_CLOSE_DISTANCE_M)
    }
}

impl Digitizer {
    pub fn new(close_distance_m: f64) -> Self {
        Self::with_distance(close_distance_m, distance_meters)
    }

    pub fn with_distance(close_distance_m: f64, distance: DistanceFn) -> Self {
        Self {
            active: None,
            next_handle: 1,
            close_distance_m,
            distance,
        }
    }

    /// Start a new session, discarding any session still in progress
    pub fn start(&mut self) -> SessionHandle {
        if let Some((old, session)) = self.active.take() {
            info!(
                "Discarding drawing session {} ({:?}) with {} points",
                old,
                session.state(),
                session.points().len()
            );
        }

        let handle = SessionHandle(self.next_handle);
        self.next_handle += 1;

        let mut session = DrawingSession::new(self.close_distance_m, self.distance);
        session.start();
        self.active = Some((handle, session));

        info!("Started drawing session {}", handle);
        handle
    }

    pub fn active_handle(&self) -> Option<SessionHandle> {
        self.active.as_ref().map(|(h, _)| *h)
    }

    pub fn points(&self, handle: SessionHandle) -> Result<&[Coordinate]> {
        match &self.active {
            Some((h, session)) if *h == handle => Ok(session.points()),
            _ => Err(EngineError::UnknownSession(handle)),
        }
    }

    pub fn add_point(&mut self, handle: SessionHandle, coord: Coordinate) -> Result<PointOutcome> {
        let outcome = self.session_mut(handle)?.add_point(coord)?;
        if let PointOutcome::Closed(polygon) = &outcome {
            info!(
                "Drawing session {} closed near first vertex with {} points",
                handle,
                polygon.len()
            );
            self.active = None;
        }
        Ok(outcome)
    }

    pub fn complete(&mut self, handle: SessionHandle) -> Result<Polygon> {
        let polygon = self.session_mut(handle)?.complete()?;
        info!(
            "Drawing session {} completed with {} points",
            handle,
            polygon.len()
        );
        self.active = None;
        Ok(polygon)
    }

    pub fn cancel(&mut self, handle: SessionHandle) -> Result<()> {
        self.session_mut(handle)?.cancel();
        self.active = None;
        info!("Drawing session {} cancelled", handle);
        Ok(())
    }

    fn session_mut(&mut self, handle: SessionHandle) -> Result<&mut DrawingSession> {
        match &mut self.active {
            Some((h, session)) if *h == handle => Ok(session),
            _ => Err(EngineError::UnknownSession(handle)),
        }
    }
}
