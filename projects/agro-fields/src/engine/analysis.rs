// Analysis dispatch
//
// The NDVI source is an external port. Dispatching never blocks the caller:
// each request runs on its own tokio task and reports back through the
// completion channel, tagged with the area id it belongs to.

use crate::engine::error::AnalysisError;
use crate::engine::types::{AreaId, Polygon};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// One histogram bin of the sampled NDVI distribution
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NdviZone {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub count: usize,
    pub percentage: f64,
}

/// NDVI statistics for a polygon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NdviReport {
    pub average_ndvi: f64,
    pub min_ndvi: f64,
    pub max_ndvi: f64,
    pub ndvi_values: Vec<f64>,
    pub ndvi_image_url: String,
    pub zones: Vec<NdviZone>,
}

impl NdviReport {
    /// Report carrying a single value
    #[cfg(test)]
    pub fn from_value(ndvi: f64) -> Self {
        Self {
            average_ndvi: ndvi,
            min_ndvi: ndvi,
            max_ndvi: ndvi,
            ndvi_values: vec![ndvi],
            ndvi_image_url: String::new(),
            zones: Vec::new(),
        }
    }
}

/// Source of NDVI values for drawn polygons
pub trait AnalysisRequestPort: Send + Sync {
    fn request_analysis(&self, polygon: Polygon) -> BoxFuture<'static, Result<NdviReport, AnalysisError>>;
}

/// Outcome of one dispatched analysis
#[derive(Debug, Clone)]
pub struct AnalysisCompletion {
    pub area_id: AreaId,
    pub outcome: Result<NdviReport, AnalysisError>,
}

#[derive(Clone)]
pub struct AnalysisDispatcher {
    port: Arc<dyn AnalysisRequestPort>,
    completions: mpsc::UnboundedSender<AnalysisCompletion>,
    timeout: Duration,
}

impl AnalysisDispatcher {
    pub fn new(
        port: Arc<dyn AnalysisRequestPort>,
        timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<AnalysisCompletion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                port,
                completions: tx,
                timeout,
            },
            rx,
        )
    }

    /// Fire the request and return immediately. Must be called inside a tokio runtime.
    ///
    /// A request that panics completes as a backend failure.
    pub fn dispatch(&self, area_id: AreaId, polygon: Polygon) {
        let request = self.port.request_analysis(polygon);
        let tx = self.completions.clone();
        let timeout = self.timeout;

        info!("Dispatching NDVI analysis for area {}", area_id);
        tokio::spawn(async move {
            let task = tokio::spawn(request);
            let abort = task.abort_handle();
            let outcome = match tokio::time::timeout(timeout, task).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => Err(AnalysisError::Backend(e.to_string())),
                Err(_) => {
                    abort.abort();
                    Err(AnalysisError::Timeout(timeout))
                }
            };
            if tx.send(AnalysisCompletion { area_id, outcome }).is_err() {
                debug!("Completion receiver gone, dropping result for area {}", area_id);
            }
        });
    }
}
