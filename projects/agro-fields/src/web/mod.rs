pub mod api;
pub mod areas;
pub mod error;
pub mod server;

use crate::cli::Args;
use crate::engine::analysis::{AnalysisCompletion, AnalysisDispatcher};
use crate::engine::drawing::Digitizer;
use crate::engine::lifecycle::AreaLifecycleManager;
use crate::engine::workspace::FieldWorkspace;
use crate::satellite::SimulatedSatellite;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::info;

/// Shared handler state. The workspace lock is never held across an await.
#[derive(Clone)]
pub struct AppState {
    workspace: Arc<Mutex<FieldWorkspace>>,
    pub satellite: Arc<SimulatedSatellite>,
}

impl AppState {
    pub fn new(args: &Args) -> (Self, UnboundedReceiver<AnalysisCompletion>) {
        let satellite = Arc::new(SimulatedSatellite::new(
            args.analysis_delay(),
            &args.imagery_base_url,
            args.seed,
        ));
        let (dispatcher, completions) =
            AnalysisDispatcher::new(satellite.clone(), args.analysis_timeout());
        let workspace = FieldWorkspace::new(
            Digitizer::new(args.close_distance_m),
            AreaLifecycleManager::new(dispatcher),
        );

        (
            Self {
                workspace: Arc::new(Mutex::new(workspace)),
                satellite,
            },
            completions,
        )
    }

    pub fn workspace(&self) -> MutexGuard<'_, FieldWorkspace> {
        self.workspace.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply analysis completions to the workspace as they arrive
    pub fn spawn_completion_loop(
        &self,
        mut completions: UnboundedReceiver<AnalysisCompletion>,
    ) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            while let Some(completion) = completions.recv().await {
                state.workspace().apply_completion(completion);
            }
            info!("Analysis completion loop finished");
        })
    }
}
