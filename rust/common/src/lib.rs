pub mod bundle;
pub mod config;
pub mod encoder;
pub mod error;
pub mod http;
pub mod record;
pub mod regressor;
pub mod stats;

pub use bundle::{ModelBundle, MODEL_FILE_NAME};
pub use config::{BenchmarkConfig, ScenarioConfig, ServerConfig, WarmupConfig};
pub use encoder::LabelEncoder;
pub use error::{BundleError, PredictError};
pub use http::{
    ErrorResponse, HealthResponse, InfoResponse, PredictRequest, PredictResponse, StatusResponse,
};
pub use record::{Column, EncodedRecord, PredictionRequest};
pub use regressor::Regressor;
pub use stats::Statistics;
