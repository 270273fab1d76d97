use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use common::{ModelBundle, PredictError};
use sysinfo::System;
use tracing::{error, info};

/// Outcome of loading the bundle at startup.
pub enum ModelState {
    Ready(Arc<ModelBundle>),
    /// Load failed; the reason is reported by every prediction.
    Unavailable(String),
}

impl ModelState {
    pub fn bundle(&self) -> Result<&ModelBundle, PredictError> {
        match self {
            ModelState::Ready(bundle) => Ok(bundle.as_ref()),
            ModelState::Unavailable(reason) => Err(PredictError::ModelUnavailable(reason.clone())),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }
}

pub struct AppState {
    pub model: ModelState,
    pub model_load_time_ms: f64,
    pub total_requests: AtomicU64,
    pub system: tokio::sync::Mutex<System>,
}

impl AppState {
    pub fn new(model: ModelState, model_load_time_ms: f64) -> Self {
        Self {
            model,
            model_load_time_ms,
            total_requests: AtomicU64::new(0),
            system: tokio::sync::Mutex::new(System::new()),
        }
    }

    /// Loads the bundle at `path`. A failed load is logged and leaves the
    /// service running without a model.
    pub fn bootstrap(path: &Path) -> Self {
        info!("Loading model bundle: {}", path.display());
        let start_time = Instant::now();

        let model = match ModelBundle::load(path) {
            Ok(bundle) => {
                info!("✓ Model and encoders loaded ({})", bundle.regressor().kind());
                info!("  Features: {:?}", bundle.feature_names());
                info!("  Encoded columns: {:?}", bundle.encoded_columns());
                ModelState::Ready(Arc::new(bundle))
            }
            Err(err) => {
                error!("✗ Error loading model: {}", err);
                ModelState::Unavailable(err.to_string())
            }
        };

        let model_load_time_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        if model.is_loaded() {
            info!("✓ Model loaded in {:.2}ms", model_load_time_ms);
        }

        Self::new(model, model_load_time_ms)
    }
}
