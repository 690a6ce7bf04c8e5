use crate::engine::types::{BoundingBox, Coordinate, Polygon};
use geo::{Centroid, HaversineDistance};
use geo_types::{LineString, Point as GeoPoint, Polygon as GeoPolygon};

/// Sphere radius used by the ring area formula (WGS84 semi-major axis)
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

pub const SQUARE_METERS_TO_ACRES: f64 = 0.000247105;

/// Convert our coordinates to a geo_types Polygon (x = longitude, y = latitude)
fn to_geo_polygon(points: &[Coordinate]) -> GeoPolygon<f64> {
    let coords: Vec<(f64, f64)> = points.iter().map(|c| (c.lng, c.lat)).collect();
    let ls = LineString::from(coords);
    GeoPolygon::new(ls, vec![])
}

fn to_geo_point(c: &Coordinate) -> GeoPoint<f64> {
    GeoPoint::new(c.lng, c.lat)
}

/// Great-circle distance between two coordinates in meters
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    to_geo_point(a).haversine_distance(&to_geo_point(b))
}

/// Spherical ring area in square meters.
///
/// Sums `Δlng * (2 + sin(lat_i) + sin(lat_i+1))` over the closed ring and
/// scales by `R² / 2`. Returns `None` for fewer than three points or when the
/// sum is not finite.
fn ring_area_square_meters(points: &[Coordinate]) -> Option<f64> {
    if points.len() < Polygon::MIN_VERTICES {
        return None;
    }

    let n = points.len();
    let mut total = 0.0;
    for i in 0..n {
        let p1 = &points[i];
        let p2 = &points[(i + 1) % n];
        let d_lng = (p2.lng - p1.lng).to_radians();
        total += d_lng * (2.0 + p1.lat.to_radians().sin() + p2.lat.to_radians().sin());
    }

    let area = (total * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0).abs();
    area.is_finite().then_some(area)
}

/// Ground area of a point list in acres, rounded to two decimals.
///
/// Accepts in-progress point lists: anything that cannot form a ring, and
/// any non-finite intermediate, yields 0.
pub fn polygon_area_acres(points: &[Coordinate]) -> f64 {
    match ring_area_square_meters(points) {
        Some(m2) => (m2 * SQUARE_METERS_TO_ACRES * 100.0).round() / 100.0,
        None => 0.0,
    }
}

/// Label anchor for a polygon (planar centroid in degree space)
pub fn centroid(polygon: &Polygon) -> Option<Coordinate> {
    to_geo_polygon(polygon.vertices())
        .centroid()
        .map(|p| Coordinate::new(p.y(), p.x()))
}

pub fn bounding_box(points: &[Coordinate]) -> Option<BoundingBox> {
    if points.is_empty() {
        return None;
    }

    let mut min_lat = f64::MAX;
    let mut min_lng = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut max_lng = f64::MIN;

    for c in points {
        min_lat = min_lat.min(c.lat);
        max_lat = max_lat.max(c.lat);
        min_lng = min_lng.min(c.lng);
        max_lng = max_lng.max(c.lng);
    }

    Some(BoundingBox {
        min_lat,
        min_lng,
        max_lat,
        max_lng,
    })
}
