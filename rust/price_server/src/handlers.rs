use std::sync::{atomic::Ordering, Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    response::Json,
    routing::{get, post},
    Router,
};
use common::{
    HealthResponse, InfoResponse, PredictError, PredictResponse, PredictionRequest,
    StatusResponse,
};
use rand::Rng;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Bounds of the `confidence` value attached to every prediction.
pub const CONFIDENCE_MIN: u32 = 70;
pub const CONFIDENCE_MAX: u32 = 90;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/info", get(info_handler))
        .route("/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running".to_string(),
        message: "ML API is live on Render".to_string(),
    })
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let model_loaded = state.model.is_loaded();
    let status = if model_loaded { "healthy" } else { "degraded" };
    Json(HealthResponse {
        status: status.to_string(),
        model_loaded,
    })
}

async fn info_handler(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    let (memory_rss_mb, cpu_percent) = {
        let mut system = state.system.lock().await;
        system.refresh_all();

        sysinfo::get_current_pid()
            .ok()
            .and_then(|pid| system.process(pid))
            .map(|process| (process.memory() as f64 / 1024.0 / 1024.0, process.cpu_usage()))
            .unwrap_or((0.0, 0.0))
    };

    let cpu_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    let bundle = state.model.bundle().ok();

    Json(InfoResponse {
        framework: "axum".to_string(),
        model_kind: bundle.map(|b| b.regressor().kind().to_string()),
        feature_names: bundle.map(|b| b.feature_names()).unwrap_or_default(),
        encoded_columns: bundle.map(|b| b.encoded_columns()).unwrap_or_default(),
        model_load_time_ms: state.model_load_time_ms,
        total_requests: state.total_requests.load(Ordering::Relaxed),
        cpu_count,
        memory_rss_mb,
        cpu_percent,
    })
}

async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PredictResponse>, AppError> {
    let payload = read_json_body(&headers, &body)?.ok_or_else(AppError::no_body)?;

    let response = run_prediction(&state, &payload).map_err(|err| {
        warn!("Prediction failed: {}", err);
        AppError::from(err)
    })?;

    state.total_requests.fetch_add(1, Ordering::Relaxed);

    Ok(Json(response))
}

/// `Ok(None)` when there is no JSON body: wrong or missing content type,
/// empty body, or an empty JSON value other than `{}`.
fn read_json_body(headers: &HeaderMap, body: &Bytes) -> Result<Option<Value>, AppError> {
    if !is_json_content_type(headers) || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value = serde_json::from_slice::<Value>(body)?;
    if is_empty_value(&value) {
        return Ok(None);
    }
    Ok(Some(value))
}

/// `null`, `false`, zero, `""` and `[]`. An empty object still counts as a body.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(_) => false,
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE) else {
        return false;
    };
    let Ok(content_type) = content_type.to_str() else {
        return false;
    };
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json") || mime.to_ascii_lowercase().ends_with("+json")
}

fn run_prediction(state: &AppState, payload: &Value) -> Result<PredictResponse, PredictError> {
    let bundle = state.model.bundle()?;

    let request = PredictionRequest::from_json(payload)?;
    let record = bundle.encode(&request)?;
    for column in &record.fallbacks {
        debug!("Unseen category for '{}', using code 0", column.name());
    }

    let price = bundle.predict(&record)?;

    Ok(PredictResponse {
        price,
        confidence: draw_confidence(&mut rand::thread_rng()),
    })
}

/// Placeholder score, independent of the input and of the model.
fn draw_confidence<R: Rng>(rng: &mut R) -> f64 {
    rng.gen_range(CONFIDENCE_MIN..=CONFIDENCE_MAX) as f64
}
