use crate::cli::Args;
use crate::web::api::{
    classify_handler, historical_ndvi_handler, legend_handler, ndvi_handler, root_handler,
    satellite_imagery_handler,
};
use crate::web::areas::{
    add_point_handler, area_history_handler, cancel_drawing_handler, clear_selection_handler,
    commit_analysis_handler, complete_drawing_handler, create_area_handler, delete_area_handler,
    get_area_handler, get_drawing_handler, list_areas_handler, retry_analysis_handler,
    select_area_handler, start_drawing_handler,
};
use crate::web::AppState;
use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::{SocketAddr, TcpListener};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/ndvi", post(ndvi_handler))
        .route("/api/ndvi/classify", get(classify_handler))
        .route("/api/ndvi/legend", get(legend_handler))
        .route("/api/historical-ndvi", get(historical_ndvi_handler))
        .route("/api/satellite-imagery", get(satellite_imagery_handler))
        .route("/api/drawings", post(start_drawing_handler))
        .route(
            "/api/drawings/:handle",
            get(get_drawing_handler).delete(cancel_drawing_handler),
        )
        .route("/api/drawings/:handle/points", post(add_point_handler))
        .route("/api/drawings/:handle/complete", post(complete_drawing_handler))
        .route("/api/areas", get(list_areas_handler).post(create_area_handler))
        .route(
            "/api/areas/:id",
            get(get_area_handler).delete(delete_area_handler),
        )
        .route("/api/areas/:id/analysis", post(commit_analysis_handler))
        .route("/api/areas/:id/retry", post(retry_analysis_handler))
        .route("/api/areas/:id/select", post(select_area_handler))
        .route("/api/areas/:id/history", get(area_history_handler))
        .route("/api/selection", delete(clear_selection_handler))
        .layer(TraceLayer::new_for_http())
        // Browser map clients are served from other origins
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(args: Args) -> Result<()> {
    let mut current_port = args.port;
    let listener = loop {
        let addr = SocketAddr::new(args.host, current_port);
        match TcpListener::bind(addr) {
            Ok(listener) => {
                // Tokio requires a non-blocking socket
                listener.set_nonblocking(true)?;
                info!("Successfully bound to {}", addr);
                break listener;
            }
            Err(e) => {
                warn!("Failed to bind to {}: {}. Trying next port...", addr, e);
                current_port = current_port
                    .checked_add(1)
                    .ok_or_else(|| anyhow::anyhow!("No available ports found"))?;
            }
        }
    };

    let (state, completions) = AppState::new(&args);
    state.spawn_completion_loop(completions);
    info!(
        "Analysis delay {:?}, timeout {:?}, close distance {} m",
        args.analysis_delay(),
        args.analysis_timeout(),
        args.close_distance_m
    );

    let app = router(state);

    let tokio_listener = tokio::net::TcpListener::from_std(listener)?;
    info!(
        "Agro Fields server started on http://{:?}",
        tokio_listener.local_addr()?
    );

    axum::serve(tokio_listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_router_builds_with_state() {
        let args = Args::try_parse_from(["agro-fields", "--seed", "5"]).unwrap();
        let (state, _completions) = AppState::new(&args);
        let _app: Router = router(state);
    }
}
