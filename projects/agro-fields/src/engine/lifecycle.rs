// Area lifecycle manager
//
// Owns every drawn area and is the only writer of status, ndvi and
// selection. Areas move Pending -> Analyzing -> Analyzed, or to
// AnalysisFailed from which they can be retried. Completions are matched by
// id; results for areas that no longer exist are dropped.

use crate::engine::analysis::{AnalysisCompletion, AnalysisDispatcher, NdviReport};
use crate::engine::error::{EngineError, Result};
use crate::engine::geometry::{bounding_box, centroid, polygon_area_acres};
use crate::engine::ndvi::{badge, classify, HealthBadge, NdviClass};
use crate::engine::types::{AreaId, AreaKind, AreaStatus, BoundingBox, Coordinate, Polygon};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct Area {
    id: AreaId,
    name: String,
    kind: AreaKind,
    polygon: Polygon,
    size_in_acres: f64,
    status: AreaStatus,
    report: Option<NdviReport>,
    failure: Option<String>,
    created_at: DateTime<Utc>,
}

impl Area {
    pub fn id(&self) -> AreaId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AreaKind {
        self.kind
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn size_in_acres(&self) -> f64 {
        self.size_in_acres
    }

    pub fn status(&self) -> AreaStatus {
        self.status
    }

    /// Mean NDVI, present only once analyzed
    pub fn ndvi(&self) -> Option<f64> {
        self.report.as_ref().map(|r| r.average_ndvi)
    }

    pub fn report(&self) -> Option<&NdviReport> {
        self.report.as_ref()
    }

    pub fn classification(&self) -> Option<NdviClass> {
        self.ndvi().map(classify)
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

/// Render-ready snapshot of an area
#[derive(Serialize, Debug, Clone)]
pub struct AreaView {
    pub id: AreaId,
    pub name: String,
    pub kind: AreaKind,
    pub status: AreaStatus,
    pub polygon: Polygon,
    pub size_in_acres: f64,
    pub ndvi: Option<f64>,
    pub is_selected: bool,
    pub classification: Option<NdviClass>,
    pub badge: Option<HealthBadge>,
    pub centroid: Option<Coordinate>,
    pub bbox: Option<BoundingBox>,
    pub report: Option<NdviReport>,
    pub failure: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct AreaLifecycleManager {
    areas: BTreeMap<AreaId, Area>,
    selected: Option<AreaId>,
    next_id: u64,
    custom_areas_created: u64,
    dispatcher: AnalysisDispatcher,
}

impl AreaLifecycleManager {
    pub fn new(dispatcher: AnalysisDispatcher) -> Self {
        Self {
            areas: BTreeMap::new(),
            selected: None,
            next_id: 1,
            custom_areas_created: 0,
            dispatcher,
        }
    }

    /// Create a free-drawn area named "Custom Area N"
    pub fn create_from_polygon(&mut self, vertices: Vec<Coordinate>) -> Result<AreaId> {
        let polygon = Polygon::try_from(vertices)?;
        self.custom_areas_created += 1;
        let name = format!("Custom Area {}", self.custom_areas_created);
        Ok(self.insert(name, AreaKind::CustomArea, polygon))
    }

    /// Create a named, map-linked field
    pub fn create_field(&mut self, name: &str, vertices: Vec<Coordinate>) -> Result<AreaId> {
        let polygon = Polygon::try_from(vertices)?;
        Ok(self.insert(name.to_string(), AreaKind::Field, polygon))
    }

    fn insert(&mut self, name: String, kind: AreaKind, polygon: Polygon) -> AreaId {
        let id = AreaId(self.next_id);
        self.next_id += 1;

        let size_in_acres = polygon_area_acres(polygon.vertices());
        if size_in_acres == 0.0 {
            warn!("Area {} ({}) has a computed size of 0 acres", id, name);
        }
        info!("Created area {} '{}' of {:.2} acres", id, name, size_in_acres);

        self.areas.insert(
            id,
            Area {
                id,
                name,
                kind,
                polygon,
                size_in_acres,
                status: AreaStatus::Pending,
                report: None,
                failure: None,
                created_at: Utc::now(),
            },
        );
        id
    }

    /// Move a pending area to Analyzing and dispatch its analysis
    pub fn commit_for_analysis(&mut self, id: AreaId) -> Result<()> {
        self.begin_analysis(id, AreaStatus::Pending)
    }

    /// Re-dispatch an area whose previous analysis failed
    pub fn retry_analysis(&mut self, id: AreaId) -> Result<()> {
        self.begin_analysis(id, AreaStatus::AnalysisFailed)
    }

    fn begin_analysis(&mut self, id: AreaId, expected: AreaStatus) -> Result<()> {
        let area = self.areas.get_mut(&id).ok_or(EngineError::UnknownArea(id))?;
        if area.status != expected {
            return Err(EngineError::InvalidTransition {
                id,
                actual: area.status,
                expected,
            });
        }

        area.status = AreaStatus::Analyzing;
        area.failure = None;
        self.dispatcher.dispatch(id, area.polygon.clone());
        Ok(())
    }

    /// Apply a finished analysis. Returns false when the result was stale.
    pub fn apply_completion(&mut self, completion: AnalysisCompletion) -> bool {
        let AnalysisCompletion { area_id, outcome } = completion;

        let Some(area) = self.areas.get_mut(&area_id) else {
            debug!("Discarding analysis result for deleted area {}", area_id);
            return false;
        };
        if area.status != AreaStatus::Analyzing {
            debug!(
                "Discarding analysis result for area {} in state {}",
                area_id, area.status
            );
            return false;
        }

        match outcome {
            Ok(report) => {
                let class = classify(report.average_ndvi);
                info!(
                    "Area {} analyzed: NDVI {:.3} ({})",
                    area_id, report.average_ndvi, class.label
                );
                area.report = Some(report);
                area.status = AreaStatus::Analyzed;
            }
            Err(e) => {
                warn!("Analysis failed for area {}: {}", area_id, e);
                area.failure = Some(e.to_string());
                area.status = AreaStatus::AnalysisFailed;
            }
        }
        true
    }

    /// Select an area; selecting the selected area clears the selection.
    /// Returns the selection after the call.
    pub fn select(&mut self, id: AreaId) -> Result<Option<AreaId>> {
        if !self.areas.contains_key(&id) {
            return Err(EngineError::UnknownArea(id));
        }
        self.selected = if self.selected == Some(id) {
            None
        } else {
            Some(id)
        };
        Ok(self.selected)
    }

    pub fn clear_selection(&mut self) {
        if let Some(id) = self.selected.take() {
            debug!("Cleared selection of area {}", id);
        }
    }

    pub fn selected(&self) -> Option<AreaId> {
        self.selected
    }

    pub fn is_selected(&self, id: AreaId) -> bool {
        self.selected == Some(id)
    }

    /// Remove an area in any state. A pending analysis result for it will be ignored.
    pub fn delete(&mut self, id: AreaId) -> Result<Area> {
        let area = self.areas.remove(&id).ok_or(EngineError::UnknownArea(id))?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        info!("Deleted area {} '{}' ({})", id, area.name, area.status);
        Ok(area)
    }

    pub fn get(&self, id: AreaId) -> Option<&Area> {
        self.areas.get(&id)
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn analyzing_count(&self) -> usize {
        self.areas
            .values()
            .filter(|a| a.status == AreaStatus::Analyzing)
            .count()
    }

    pub fn view(&self, id: AreaId) -> Option<AreaView> {
        self.areas.get(&id).map(|a| self.to_view(a))
    }

    pub fn views(&self) -> Vec<AreaView> {
        self.areas.values().map(|a| self.to_view(a)).collect()
    }

    fn to_view(&self, area: &Area) -> AreaView {
        let polygon = area.polygon();
        AreaView {
            id: area.id(),
            name: area.name().to_string(),
            kind: area.kind(),
            status: area.status(),
            polygon: polygon.clone(),
            size_in_acres: area.size_in_acres(),
            ndvi: area.ndvi(),
            is_selected: self.is_selected(area.id()),
            classification: area.classification(),
            badge: area.ndvi().map(badge),
            centroid: centroid(polygon),
            bbox: bounding_box(polygon.vertices()),
            report: area.report().cloned(),
            failure: area.failure().map(str::to_string),
            created_at: area.created_at,
        }
    }
}
