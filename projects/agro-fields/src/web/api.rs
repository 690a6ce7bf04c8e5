use crate::engine::analysis::NdviReport;
use crate::engine::error::Result;
use crate::engine::ndvi::{badge, classify, legend, HealthBadge, LegendEntry, NdviClass};
use crate::engine::types::{BoundingBox, Coordinate, Polygon};
use crate::satellite::{ImageryBands, NdviHistory};
use crate::web::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// GeoJSON style polygon: rings of `[lng, lat]` pairs, first ring is the exterior
#[derive(Deserialize, Debug, Clone)]
pub struct Boundary {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl Boundary {
    pub fn to_polygon(&self) -> Result<Polygon> {
        let ring = self.coordinates.first().map(Vec::as_slice).unwrap_or(&[]);
        let mut vertices: Vec<Coordinate> = ring
            .iter()
            .map(|[lng, lat]| Coordinate::new(*lat, *lng))
            .collect();

        // GeoJSON repeats the first vertex to close the ring
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        Polygon::try_from(vertices)
    }
}

#[derive(Deserialize, Debug)]
pub struct NdviRequest {
    pub boundaries: Boundary,
    pub date: NaiveDate,
}

#[derive(Deserialize, Debug)]
pub struct HistoricalQuery {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Deserialize, Debug)]
pub struct ImageryQuery {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub bands: ImageryBands,
}

#[derive(Serialize, Debug)]
pub struct ImageryResponse {
    pub image_url: String,
}

#[derive(Deserialize, Debug)]
pub struct ClassifyQuery {
    pub value: f64,
}

#[derive(Serialize, Debug)]
pub struct ClassifyResponse {
    pub value: f64,
    pub classification: NdviClass,
    pub badge: HealthBadge,
    pub badge_label: &'static str,
}

#[derive(Serialize, Debug)]
pub struct RootInfo {
    pub message: &'static str,
}

pub async fn root_handler() -> Json<RootInfo> {
    Json(RootInfo {
        message: "Agro Fields Satellite API",
    })
}

/// NDVI statistics for an ad-hoc boundary on a given date
pub async fn ndvi_handler(
    State(state): State<AppState>,
    Json(request): Json<NdviRequest>,
) -> Result<Json<NdviReport>> {
    let polygon = request.boundaries.to_polygon()?;
    debug!(
        "NDVI request for {} boundary with {} vertices on {}",
        request.boundaries.kind,
        polygon.len(),
        request.date
    );
    Ok(Json(state.satellite.ndvi_report(request.date)))
}

pub async fn historical_ndvi_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoricalQuery>,
) -> Json<NdviHistory> {
    let bbox = BoundingBox {
        min_lat: query.min_lat,
        min_lng: query.min_lon,
        max_lat: query.max_lat,
        max_lng: query.max_lon,
    };
    Json(
        state
            .satellite
            .historical_ndvi(&bbox, query.start_date, query.end_date),
    )
}

pub async fn satellite_imagery_handler(
    State(state): State<AppState>,
    Query(query): Query<ImageryQuery>,
) -> Json<ImageryResponse> {
    let bbox = BoundingBox {
        min_lat: query.min_lat,
        min_lng: query.min_lon,
        max_lat: query.max_lat,
        max_lng: query.max_lon,
    };
    Json(ImageryResponse {
        image_url: state.satellite.imagery_url(&bbox, query.date, query.bands),
    })
}

pub async fn classify_handler(Query(query): Query<ClassifyQuery>) -> Json<ClassifyResponse> {
    let health = badge(query.value);
    Json(ClassifyResponse {
        value: query.value,
        classification: classify(query.value),
        badge: health,
        badge_label: health.label(),
    })
}

pub async fn legend_handler() -> Json<Vec<LegendEntry>> {
    Json(legend())
}
