use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::encoder::{EncoderSchema, LabelEncoder};
use crate::error::{BundleError, PredictError};
use crate::record::{Column, EncodedRecord, PredictionRequest};
use crate::regressor::Regressor;

/// File name the server looks for next to its executable.
pub const MODEL_FILE_NAME: &str = "best_model.json";

/// On-disk layout of a bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleSchema {
    pub model: Regressor,
    #[serde(default)]
    pub label_encoders: BTreeMap<String, EncoderSchema>,
    pub feature_names: Vec<String>,
}

/// Regressor together with the encoders and column order it was trained with.
///
/// Immutable once loaded.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    regressor: Regressor,
    encoders: HashMap<Column, LabelEncoder>,
    feature_order: Vec<Column>,
}

impl ModelBundle {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BundleError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::decode(&bytes, &path.display().to_string())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, BundleError> {
        Self::decode(bytes, "<memory>")
    }

    fn decode(bytes: &[u8], origin: &str) -> Result<Self, BundleError> {
        let schema: BundleSchema =
            serde_json::from_slice(bytes).map_err(|source| BundleError::Parse {
                origin: origin.to_string(),
                source,
            })?;
        Self::from_schema(schema)
    }

    /// Validates a decoded bundle.
    ///
    /// Encoders for columns the service does not know about are dropped.
    pub fn from_schema(schema: BundleSchema) -> Result<Self, BundleError> {
        let mut feature_order = Vec::with_capacity(schema.feature_names.len());
        for name in &schema.feature_names {
            let column =
                Column::from_name(name).ok_or_else(|| BundleError::UnknownFeature(name.clone()))?;
            if feature_order.contains(&column) {
                return Err(BundleError::DuplicateFeature(name.clone()));
            }
            feature_order.push(column);
        }

        schema.model.validate(feature_order.len())?;

        let mut encoders = HashMap::new();
        for (name, encoder) in schema.label_encoders {
            if let Some(column) = Column::from_name(&name) {
                encoders.insert(column, LabelEncoder::new(&name, encoder.classes)?);
            }
        }

        Ok(Self {
            regressor: schema.model,
            encoders,
            feature_order,
        })
    }

    pub fn to_schema(&self) -> BundleSchema {
        BundleSchema {
            model: self.regressor.clone(),
            label_encoders: self
                .encoders
                .iter()
                .map(|(column, encoder)| (column.name().to_string(), encoder.to_schema()))
                .collect(),
            feature_names: self.feature_names(),
        }
    }

    pub fn regressor(&self) -> &Regressor {
        &self.regressor
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.feature_order.iter().map(|c| c.name().to_string()).collect()
    }

    /// Names of the categorical columns that have an encoder, in request order.
    pub fn encoded_columns(&self) -> Vec<String> {
        Column::CATEGORICAL
            .into_iter()
            .filter(|column| self.encoders.contains_key(column))
            .map(|column| column.name().to_string())
            .collect()
    }

    /// Replaces categorical values with their codes.
    ///
    /// Categories an encoder has never seen get code 0 and are recorded in
    /// [`EncodedRecord::fallbacks`].
    pub fn encode(&self, request: &PredictionRequest) -> Result<EncodedRecord, PredictError> {
        let mut fallbacks = Vec::new();
        let mut code = |column: Column| -> Result<i64, PredictError> {
            let encoder = self
                .encoders
                .get(&column)
                .ok_or(PredictError::MissingEncoder(column.name()))?;
            let value = request.category(column).unwrap_or_default();
            Ok(encoder.transform(value).unwrap_or_else(|| {
                fallbacks.push(column);
                0
            }))
        };

        let location = code(Column::Location)?;
        let nearby_amenities = code(Column::NearbyAmenities)?;
        let zoning_land_type = code(Column::ZoningLandType)?;

        Ok(EncodedRecord {
            size_sqm: request.size_sqm,
            distance_km: request.distance_km,
            location,
            nearby_amenities,
            zoning_land_type,
            fallbacks,
        })
    }

    /// Runs the regressor on a single record laid out in feature order.
    ///
    /// A NaN or infinite output is an error rather than a price.
    pub fn predict(&self, record: &EncodedRecord) -> Result<f64, PredictError> {
        let row: Vec<f64> = self.feature_order.iter().map(|c| record.value(*c)).collect();
        let rows = Array2::from_shape_vec((1, row.len()), row).map_err(|_| PredictError::Shape {
            expected: self.feature_order.len(),
            actual: 0,
        })?;
        let output = self.regressor.predict(rows.view())?;
        let price = output.first().copied().ok_or(PredictError::EmptyOutput)?;
        if !price.is_finite() {
            return Err(PredictError::NonFinite(price));
        }
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn schema_json() -> serde_json::Value {
        json!({
            "model": {
                "type": "linear",
                "intercept": 1000.0,
                "coefficients": [100.0, -50.0, 10.0, 5.0, 1.0]
            },
            "label_encoders": {
                "Location": { "classes": ["Downtown", "Suburb", "Rural"] },
                "Nearby Amenities": { "classes": ["Park", "School"] },
                "Zoning_LandType": { "classes": ["Residential", "Commercial"] }
            },
            "feature_names": [
                "Size (sqm)",
                "Distance to City Center (km)",
                "Location",
                "Nearby Amenities",
                "Zoning_LandType"
            ]
        })
    }

    fn bundle() -> ModelBundle {
        ModelBundle::from_slice(schema_json().to_string().as_bytes()).unwrap()
    }

    fn request(location: &str) -> PredictionRequest {
        PredictionRequest {
            size_sqm: 120.0,
            distance_km: 5.0,
            location: location.to_string(),
            nearby_amenities: "School".to_string(),
            zoning_land_type: "Commercial".to_string(),
        }
    }

    #[test]
    fn test_encode_and_predict() {
        let bundle = bundle();
        let record = bundle.encode(&request("Suburb")).unwrap();
        assert_eq!((record.location, record.nearby_amenities, record.zoning_land_type), (1, 1, 1));
        assert!(record.fallbacks.is_empty());

        // 1000 + 120*100 - 5*50 + 1*10 + 1*5 + 1*1
        assert_eq!(bundle.predict(&record).unwrap(), 12766.0);
    }

    #[test]
    fn test_unseen_category_falls_back_to_zero() {
        let bundle = bundle();
        let record = bundle.encode(&request("Atlantis")).unwrap();
        assert_eq!(record.location, 0);
        assert_eq!(record.fallbacks, vec![Column::Location]);
        assert_eq!(bundle.predict(&record).unwrap(), 12756.0);
    }

    #[test]
    fn test_non_finite_prediction_is_rejected() {
        let bundle = bundle();
        let mut record = bundle.encode(&request("Suburb")).unwrap();
        record.size_sqm = f64::NAN;

        let err = bundle.predict(&record).unwrap_err();
        assert!(matches!(err, PredictError::NonFinite(value) if value.is_nan()));
    }

    #[test]
    fn test_feature_order_is_respected() {
        let mut schema = schema_json();
        schema["feature_names"] = json!(["Location", "Size (sqm)"]);
        schema["model"]["coefficients"] = json!([1000.0, 1.0]);
        let bundle = ModelBundle::from_slice(schema.to_string().as_bytes()).unwrap();

        let record = bundle.encode(&request("Rural")).unwrap();
        assert_eq!(bundle.predict(&record).unwrap(), 1000.0 + 2000.0 + 120.0);
        assert_eq!(bundle.feature_names(), vec!["Location", "Size (sqm)"]);
    }

    #[test]
    fn test_missing_encoder_fails() {
        let mut schema = schema_json();
        schema["label_encoders"]
            .as_object_mut()
            .unwrap()
            .remove("Zoning_LandType");
        let bundle = ModelBundle::from_slice(schema.to_string().as_bytes()).unwrap();
        assert_eq!(bundle.encoded_columns(), vec!["Location", "Nearby Amenities"]);

        let err = bundle.encode(&request("Suburb")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no encoder for categorical column 'Zoning_LandType'"
        );
    }

    #[test]
    fn test_invalid_bundles_rejected() {
        let mut unknown = schema_json();
        unknown["feature_names"][0] = json!("Price");
        let err = ModelBundle::from_slice(unknown.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, BundleError::UnknownFeature(ref name) if name == "Price"));

        let mut duplicate = schema_json();
        duplicate["feature_names"][1] = json!("Size (sqm)");
        let err = ModelBundle::from_slice(duplicate.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, BundleError::DuplicateFeature(_)));

        let mut short = schema_json();
        short["model"]["coefficients"] = json!([1.0]);
        let err = ModelBundle::from_slice(short.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, BundleError::InvalidModel(_)));

        let err = ModelBundle::from_slice(b"not json").unwrap_err();
        assert!(err.to_string().starts_with("failed to parse model bundle <memory>"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(schema_json().to_string().as_bytes()).unwrap();

        let bundle = ModelBundle::load(file.path()).unwrap();
        assert_eq!(bundle.regressor().kind(), "linear");

        let reloaded = ModelBundle::from_schema(bundle.to_schema()).unwrap();
        assert_eq!(reloaded.feature_names(), bundle.feature_names());

        let err = ModelBundle::load("/definitely/not/here/best_model.json").unwrap_err();
        assert!(matches!(err, BundleError::Io { .. }));
    }
}
