use crate::engine::error::{EngineError, Result};
use crate::engine::geometry::bounding_box;
use crate::engine::lifecycle::AreaView;
use crate::engine::types::{AreaId, Coordinate, SessionHandle};
use crate::engine::workspace::{DrawingEvent, FieldWorkspace};
use crate::satellite::NdviHistory;
use crate::web::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize, Debug)]
pub struct DrawingView {
    pub handle: SessionHandle,
    pub points: Vec<Coordinate>,
}

#[derive(Deserialize, Debug)]
pub struct CreateAreaRequest {
    /// Present for map-linked fields; free-drawn areas are numbered
    #[serde(default)]
    pub name: Option<String>,
    pub vertices: Vec<Coordinate>,
}

#[derive(Serialize, Debug)]
pub struct SelectionResponse {
    pub selected: Option<AreaId>,
}

#[derive(Deserialize, Debug)]
pub struct HistoryQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn area_view(ws: &FieldWorkspace, id: AreaId) -> Result<AreaView> {
    ws.areas.view(id).ok_or(EngineError::UnknownArea(id))
}

// Drawing sessions

/// Start a drawing session, replacing any session in progress
pub async fn start_drawing_handler(State(state): State<AppState>) -> Json<DrawingView> {
    let mut ws = state.workspace();
    if let Some(previous) = ws.digitizer.active_handle() {
        debug!("Drawing session {} replaced", previous);
    }
    let handle = ws.start_drawing();
    Json(DrawingView {
        handle,
        points: Vec::new(),
    })
}

pub async fn get_drawing_handler(
    State(state): State<AppState>,
    Path(handle): Path<SessionHandle>,
) -> Result<Json<DrawingView>> {
    let ws = state.workspace();
    let points = ws.digitizer.points(handle)?.to_vec();
    Ok(Json(DrawingView { handle, points }))
}

pub async fn add_point_handler(
    State(state): State<AppState>,
    Path(handle): Path<SessionHandle>,
    Json(point): Json<Coordinate>,
) -> Result<Json<DrawingEvent>> {
    let event = state.workspace().add_point(handle, point)?;
    Ok(Json(event))
}

pub async fn complete_drawing_handler(
    State(state): State<AppState>,
    Path(handle): Path<SessionHandle>,
) -> Result<(StatusCode, Json<AreaView>)> {
    let mut ws = state.workspace();
    let id = ws.complete_drawing(handle)?;
    let view = area_view(&ws, id)?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn cancel_drawing_handler(
    State(state): State<AppState>,
    Path(handle): Path<SessionHandle>,
) -> Result<StatusCode> {
    state.workspace().cancel_drawing(handle)?;
    Ok(StatusCode::NO_CONTENT)
}

// Areas

pub async fn list_areas_handler(State(state): State<AppState>) -> Json<Vec<AreaView>> {
    let ws = state.workspace();
    if ws.areas.is_empty() {
        debug!("No areas drawn yet");
    } else {
        debug!(
            "Listing {} areas, {} analyzing, selected {:?}",
            ws.areas.len(),
            ws.areas.analyzing_count(),
            ws.areas.selected()
        );
    }
    Json(ws.areas.views())
}

pub async fn create_area_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateAreaRequest>,
) -> Result<(StatusCode, Json<AreaView>)> {
    let mut ws = state.workspace();
    let id = match request.name.as_deref() {
        Some(name) => ws.areas.create_field(name, request.vertices)?,
        None => ws.areas.create_from_polygon(request.vertices)?,
    };
    let view = area_view(&ws, id)?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_area_handler(
    State(state): State<AppState>,
    Path(id): Path<AreaId>,
) -> Result<Json<AreaView>> {
    let view = area_view(&state.workspace(), id)?;
    Ok(Json(view))
}

pub async fn delete_area_handler(
    State(state): State<AppState>,
    Path(id): Path<AreaId>,
) -> Result<StatusCode> {
    state.workspace().areas.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Commit a pending area; the analysis runs in the background
pub async fn commit_analysis_handler(
    State(state): State<AppState>,
    Path(id): Path<AreaId>,
) -> Result<(StatusCode, Json<AreaView>)> {
    let mut ws = state.workspace();
    ws.areas.commit_for_analysis(id)?;
    let view = area_view(&ws, id)?;
    Ok((StatusCode::ACCEPTED, Json(view)))
}

pub async fn retry_analysis_handler(
    State(state): State<AppState>,
    Path(id): Path<AreaId>,
) -> Result<(StatusCode, Json<AreaView>)> {
    let mut ws = state.workspace();
    ws.areas.retry_analysis(id)?;
    let view = area_view(&ws, id)?;
    Ok((StatusCode::ACCEPTED, Json(view)))
}

pub async fn select_area_handler(
    State(state): State<AppState>,
    Path(id): Path<AreaId>,
) -> Result<Json<SelectionResponse>> {
    let selected = state.workspace().areas.select(id)?;
    Ok(Json(SelectionResponse { selected }))
}

pub async fn clear_selection_handler(State(state): State<AppState>) -> StatusCode {
    state.workspace().areas.clear_selection();
    StatusCode::NO_CONTENT
}

/// NDVI history over the area's bounding box
pub async fn area_history_handler(
    State(state): State<AppState>,
    Path(id): Path<AreaId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<NdviHistory>> {
    let bbox = {
        let ws = state.workspace();
        let area = ws.areas.get(id).ok_or(EngineError::UnknownArea(id))?;
        bounding_box(area.polygon().vertices()).ok_or(EngineError::UnknownArea(id))?
    };
    Ok(Json(state.satellite.historical_ndvi(
        &bbox,
        query.start_date,
        query.end_date,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::engine::types::{AreaKind, AreaStatus};
    use clap::Parser;
    use std::time::Duration;

    fn state(delay_ms: &str, extra: &[&str]) -> AppState {
        let mut argv = vec!["agro-fields", "--seed", "3", "--analysis-delay-ms", delay_ms];
        argv.extend_from_slice(extra);
        let (state, completions) = AppState::new(&Args::try_parse_from(argv).unwrap());
        state.spawn_completion_loop(completions);
        state
    }

    fn triangle() -> Vec<Coordinate> {
        vec![
            Coordinate::new(17.0, 78.0),
            Coordinate::new(17.001, 78.0),
            Coordinate::new(17.0, 78.001),
        ]
    }

    async fn wait_for_status(state: &AppState, id: AreaId, status: AreaStatus) -> AreaView {
        for _ in 0..200 {
            let view = area_view(&state.workspace(), id).unwrap();
            if view.status == status {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("area {} never reached {}", id, status);
    }

    #[tokio::test]
    async fn test_draw_commit_and_analyze() {
        let state = state("5", &[]);

        let Json(drawing) = start_drawing_handler(State(state.clone())).await;
        for c in triangle() {
            add_point_handler(State(state.clone()), Path(drawing.handle), Json(c))
                .await
                .unwrap();
        }
        let Json(live) = get_drawing_handler(State(state.clone()), Path(drawing.handle))
            .await
            .unwrap();
        assert_eq!(live.points, triangle());

        let (status, Json(area)) =
            complete_drawing_handler(State(state.clone()), Path(drawing.handle))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(area.status, AreaStatus::Pending);
        assert_eq!(area.name, "Custom Area 1");

        let (status, Json(area)) = commit_analysis_handler(State(state.clone()), Path(area.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(area.status, AreaStatus::Analyzing);

        let analyzed = wait_for_status(&state, area.id, AreaStatus::Analyzed).await;
        assert!(analyzed.ndvi.is_some());
        assert!(analyzed.classification.is_some());
        assert!(analyzed.report.is_some());
    }

    #[tokio::test]
    async fn test_complete_with_two_points_is_rejected() {
        let state = state("5", &[]);
        let Json(drawing) = start_drawing_handler(State(state.clone())).await;
        for c in &triangle()[..2] {
            add_point_handler(State(state.clone()), Path(drawing.handle), Json(*c))
                .await
                .unwrap();
        }

        let err = complete_drawing_handler(State(state.clone()), Path(drawing.handle))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidPolygon { points: 2 });

        // the session is still open
        let Json(live) = get_drawing_handler(State(state.clone()), Path(drawing.handle))
            .await
            .unwrap();
        assert_eq!(live.points.len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_marks_area_failed() {
        let state = state("5000", &["--analysis-timeout-secs", "0"]);
        let (_, Json(area)) = create_area_handler(
            State(state.clone()),
            Json(CreateAreaRequest {
                name: Some("River field".to_string()),
                vertices: triangle(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(area.kind, AreaKind::Field);

        commit_analysis_handler(State(state.clone()), Path(area.id))
            .await
            .unwrap();
        let failed = wait_for_status(&state, area.id, AreaStatus::AnalysisFailed).await;
        assert!(failed.failure.is_some());
        assert_eq!(failed.ndvi, None);

        let (_, Json(retried)) = retry_analysis_handler(State(state.clone()), Path(area.id))
            .await
            .unwrap();
        assert_eq!(retried.status, AreaStatus::Analyzing);
    }

    #[tokio::test]
    async fn test_select_delete_and_history() {
        let state = state("5", &[]);
        let mut ids = Vec::new();
        for _ in 0..2 {
            let (_, Json(area)) = create_area_handler(
                State(state.clone()),
                Json(CreateAreaRequest {
                    name: None,
                    vertices: triangle(),
                }),
            )
            .await
            .unwrap();
            ids.push(area.id);
        }

        select_area_handler(State(state.clone()), Path(ids[0]))
            .await
            .unwrap();
        let Json(selection) = select_area_handler(State(state.clone()), Path(ids[1]))
            .await
            .unwrap();
        assert_eq!(selection.selected, Some(ids[1]));

        clear_selection_handler(State(state.clone())).await;
        assert_eq!(state.workspace().areas.selected(), None);
        select_area_handler(State(state.clone()), Path(ids[1]))
            .await
            .unwrap();

        let Json(areas) = list_areas_handler(State(state.clone())).await;
        assert_eq!(areas.iter().filter(|a| a.is_selected).count(), 1);

        let Json(history) = area_history_handler(
            State(state.clone()),
            Path(ids[0]),
            Query(HistoryQuery {
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(history.dates.len(), 2);

        let status = delete_area_handler(State(state.clone()), Path(ids[1]))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(state.workspace().areas.selected(), None);
        assert_eq!(
            get_area_handler(State(state.clone()), Path(ids[1]))
                .await
                .unwrap_err(),
            EngineError::UnknownArea(ids[1])
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_created_area_view_survives_concurrent_delete() {
        let state = state("5", &[]);
        let sweeper = {
            let state = state.clone();
            tokio::spawn(async move {
                loop {
                    let ids: Vec<AreaId> =
                        state.workspace().areas.views().iter().map(|v| v.id).collect();
                    for id in ids {
                        let _ = state.workspace().areas.delete(id);
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..200 {
            let (status, Json(area)) = create_area_handler(
                State(state.clone()),
                Json(CreateAreaRequest {
                    name: None,
                    vertices: triangle(),
                }),
            )
            .await
            .unwrap();
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(area.status, AreaStatus::Pending);
        }
        sweeper.abort();
    }
}
