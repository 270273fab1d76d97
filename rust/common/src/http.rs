use serde::{Deserialize, Serialize};

/// Typed `/predict` body, used by clients. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "Size (sqm)", default, skip_serializing_if = "Option::is_none")]
    pub size_sqm: Option<f64>,
    #[serde(
        rename = "Distance to City Center (km)",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub distance_km: Option<f64>,
    #[serde(rename = "Location", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "Nearby Amenities", default, skip_serializing_if = "Option::is_none")]
    pub nearby_amenities: Option<String>,
    #[serde(rename = "Zoning_LandType", default, skip_serializing_if = "Option::is_none")]
    pub zoning_land_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub price: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub framework: String,
    pub model_kind: Option<String>,
    pub feature_names: Vec<String>,
    pub encoded_columns: Vec<String>,
    pub model_load_time_ms: f64,
    pub total_requests: u64,
    pub cpu_count: usize,
    pub memory_rss_mb: f64,
    pub cpu_percent: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_predict_request_uses_column_names() {
        let request = PredictRequest {
            size_sqm: Some(80.0),
            zoning_land_type: Some("Residential".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "Size (sqm)": 80.0, "Zoning_LandType": "Residential" })
        );
    }
}
