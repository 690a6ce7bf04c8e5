// Core value types shared by the drawing and area lifecycle code
//
// Coordinates are WGS84 degrees. Polygons are implicitly closed rings that
// always carry at least three distinct vertices.

use crate::engine::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographic position in degrees
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Latitude in [-90, 90] and longitude in [-180, 180]; NaN never passes
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

/// Latitude/longitude extent of a set of coordinates
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

/// Closed ring of vertices, winding order preserved as drawn.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "Vec<Coordinate>", into = "Vec<Coordinate>")]
pub struct Polygon {
    vertices: Vec<Coordinate>,
}

impl Polygon {
    pub const MIN_VERTICES: usize = 3;

    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }
}

impl TryFrom<Vec<Coordinate>> for Polygon {
    type Error = EngineError;

    fn try_from(vertices: Vec<Coordinate>) -> Result<Self, Self::Error> {
        if let Some(bad) = vertices.iter().find(|c| !c.is_valid()) {
            return Err(EngineError::InvalidCoordinate {
                lat: bad.lat,
                lng: bad.lng,
            });
        }

        let distinct = distinct_count(&vertices);
        if distinct < Self::MIN_VERTICES {
            return Err(EngineError::InvalidPolygon { points: distinct });
        }

        Ok(Self { vertices })
    }
}

/// Number of distinct positions in a point list
pub fn distinct_count(points: &[Coordinate]) -> usize {
    let mut distinct: Vec<&Coordinate> = Vec::with_capacity(points.len());
    for p in points {
        if !distinct.contains(&p) {
            distinct.push(p);
        }
    }
    distinct.len()
}

impl From<Polygon> for Vec<Coordinate> {
    fn from(polygon: Polygon) -> Self {
        polygon.vertices
    }
}

/// Identifier of a digitizing session, handed out by `Digitizer::start`
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SessionHandle(pub u64);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AreaId(pub u64);

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of an area
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AreaStatus {
    Pending,
    Analyzing,
    Analyzed,
    AnalysisFailed,
}

impl fmt::Display for AreaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AreaStatus::Pending => "pending",
            AreaStatus::Analyzing => "analyzing",
            AreaStatus::Analyzed => "analyzed",
            AreaStatus::AnalysisFailed => "analysis_failed",
        };
        f.write_str(s)
    }
}

/// Map-linked fields carry a user supplied name, free-drawn areas are numbered
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AreaKind {
    Field,
    CustomArea,
}
