use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::BundleError;

/// Serialized form of a fitted encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSchema {
    pub classes: Vec<String>,
}

/// Fitted string-to-integer mapping for one categorical column.
///
/// The code of a category is its position in the class list it was fitted with.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
    codes: HashMap<String, i64>,
}

impl LabelEncoder {
    pub fn new(column: &str, classes: Vec<String>) -> Result<Self, BundleError> {
        let mut codes = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            if codes.insert(class.clone(), code as i64).is_some() {
                return Err(BundleError::DuplicateClass {
                    column: column.to_string(),
                    class: class.clone(),
                });
            }
        }
        Ok(Self { classes, codes })
    }

    /// Code for `value`, or `None` if the encoder never saw it.
    pub fn transform(&self, value: &str) -> Option<i64> {
        self.codes.get(value).copied()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn to_schema(&self) -> EncoderSchema {
        EncoderSchema {
            classes: self.classes.clone(),
        }
    }
}
