//! Request columns and the fixed-width record fed to the regressor.

use serde_json::{Map, Value};

use crate::error::PredictError;

/// One of the five input columns a prediction request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    SizeSqm,
    DistanceKm,
    Location,
    NearbyAmenities,
    ZoningLandType,
}

impl Column {
    pub const ALL: [Column; 5] = [
        Column::SizeSqm,
        Column::DistanceKm,
        Column::Location,
        Column::NearbyAmenities,
        Column::ZoningLandType,
    ];

    pub const CATEGORICAL: [Column; 3] = [
        Column::Location,
        Column::NearbyAmenities,
        Column::ZoningLandType,
    ];

    /// Key used in request bodies and in the bundle's feature list.
    pub fn name(self) -> &'static str {
        match self {
            Column::SizeSqm => "Size (sqm)",
            Column::DistanceKm => "Distance to City Center (km)",
            Column::Location => "Location",
            Column::NearbyAmenities => "Nearby Amenities",
            Column::ZoningLandType => "Zoning_LandType",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Column::ALL.into_iter().find(|column| column.name() == name)
    }

    pub fn is_categorical(self) -> bool {
        Column::CATEGORICAL.contains(&self)
    }
}

/// A request after numeric coercion and categorical stringification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionRequest {
    pub size_sqm: f64,
    pub distance_km: f64,
    pub location: String,
    pub nearby_amenities: String,
    pub zoning_land_type: String,
}

impl PredictionRequest {
    /// Reads the five known keys from a JSON object.
    ///
    /// Absent numeric keys become `0.0` and absent string keys become `""`.
    /// Unknown keys are ignored.
    pub fn from_json(body: &Value) -> Result<Self, PredictError> {
        let object = body
            .as_object()
            .ok_or_else(|| PredictError::NotAnObject(json_kind(body)))?;

        Ok(Self {
            size_sqm: coerce_float(object, Column::SizeSqm)?,
            distance_km: coerce_float(object, Column::DistanceKm)?,
            location: stringify(object, Column::Location),
            nearby_amenities: stringify(object, Column::NearbyAmenities),
            zoning_land_type: stringify(object, Column::ZoningLandType),
        })
    }

    /// Raw string value of a categorical column.
    pub fn category(&self, column: Column) -> Option<&str> {
        match column {
            Column::Location => Some(&self.location),
            Column::NearbyAmenities => Some(&self.nearby_amenities),
            Column::ZoningLandType => Some(&self.zoning_land_type),
            Column::SizeSqm | Column::DistanceKm => None,
        }
    }
}

/// A request with every categorical column replaced by its integer code.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRecord {
    pub size_sqm: f64,
    pub distance_km: f64,
    pub location: i64,
    pub nearby_amenities: i64,
    pub zoning_land_type: i64,
    /// Columns whose category was unseen and fell back to code 0.
    pub fallbacks: Vec<Column>,
}

impl EncodedRecord {
    pub fn value(&self, column: Column) -> f64 {
        match column {
            Column::SizeSqm => self.size_sqm,
            Column::DistanceKm => self.distance_km,
            Column::Location => self.location as f64,
            Column::NearbyAmenities => self.nearby_amenities as f64,
            Column::ZoningLandType => self.zoning_land_type as f64,
        }
    }
}

fn coerce_float(object: &Map<String, Value>, column: Column) -> Result<f64, PredictError> {
    match object.get(column.name()) {
        None => Ok(0.0),
        Some(Value::Null) => Ok(f64::NAN),
        Some(Value::Bool(flag)) => Ok(if *flag { 1.0 } else { 0.0 }),
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| PredictError::NotNumeric(number.to_string())),
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| PredictError::NotNumeric(text.clone())),
        Some(other) => Err(PredictError::NonScalar {
            column: column.name(),
            kind: json_kind(other),
        }),
    }
}

fn stringify(object: &Map<String, Value>, column: Column) -> String {
    match object.get(column.name()) {
        None => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) => "None".to_string(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(other) => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_names_round_trip() {
        for column in Column::ALL {
            assert_eq!(Column::from_name(column.name()), Some(column));
        }
        assert_eq!(Column::from_name("Price"), None);
        assert!(Column::Location.is_categorical());
        assert!(!Column::SizeSqm.is_categorical());
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let request = PredictionRequest::from_json(&json!({})).unwrap();
        assert_eq!(request, PredictionRequest::default());
    }

    #[test]
    fn test_full_request() {
        let request = PredictionRequest::from_json(&json!({
            "Size (sqm)": 120,
            "Distance to City Center (km)": 4.5,
            "Location": "Suburb",
            "Nearby Amenities": "School",
            "Zoning_LandType": "Residential",
            "Unrelated": [1, 2, 3]
        }))
        .unwrap();

        assert_eq!(request.size_sqm, 120.0);
        assert_eq!(request.distance_km, 4.5);
        assert_eq!(request.location, "Suburb");
        assert_eq!(request.category(Column::NearbyAmenities), Some("School"));
        assert_eq!(request.category(Column::SizeSqm), None);
    }

    #[test]
    fn test_numeric_coercion() {
        let request = PredictionRequest::from_json(&json!({
            "Size (sqm)": " 85.5 ",
            "Distance to City Center (km)": true
        }))
        .unwrap();
        assert_eq!(request.size_sqm, 85.5);
        assert_eq!(request.distance_km, 1.0);

        let request = PredictionRequest::from_json(&json!({ "Size (sqm)": null })).unwrap();
        assert!(request.size_sqm.is_nan());
    }

    #[test]
    fn test_non_numeric_string_is_rejected() {
        let err = PredictionRequest::from_json(&json!({ "Size (sqm)": "big" })).unwrap_err();
        assert_eq!(err.to_string(), "could not convert string to float: 'big'");

        let err = PredictionRequest::from_json(&json!({ "Size (sqm)": [1] })).unwrap_err();
        assert!(matches!(err, PredictError::NonScalar { kind: "array", .. }));
    }

    #[test]
    fn test_categorical_stringification() {
        let request = PredictionRequest::from_json(&json!({
            "Location": 7,
            "Nearby Amenities": false,
            "Zoning_LandType": null
        }))
        .unwrap();
        assert_eq!(request.location, "7");
        assert_eq!(request.nearby_amenities, "False");
        assert_eq!(request.zoning_land_type, "None");
    }

    #[test]
    fn test_body_must_be_object() {
        let err = PredictionRequest::from_json(&json!([1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "expected a JSON object, got array");
    }

    #[test]
    fn test_encoded_record_values() {
        let record = EncodedRecord {
            size_sqm: 50.0,
            distance_km: 2.0,
            location: 3,
            nearby_amenities: 0,
            zoning_land_type: 1,
            fallbacks: vec![Column::NearbyAmenities],
        };
        let row: Vec<f64> = Column::ALL.iter().map(|c| record.value(*c)).collect();
        assert_eq!(row, vec![50.0, 2.0, 3.0, 0.0, 1.0]);
    }
}
