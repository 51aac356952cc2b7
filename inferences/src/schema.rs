//! Training-time feature schema and alignment of raw builder output to it.

use std::collections::HashSet;
use std::path::Path;

use log::debug;

use crate::error::{InferenceError, Result};
use crate::types::{FeatureResult, FeatureRow};

/// Ordered feature column names the classifier was trained on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(InferenceError::Schema("no columns".to_string()));
        }
        {
            let mut seen = HashSet::with_capacity(columns.len());
            if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
                return Err(InferenceError::Schema(format!("duplicate column {dup:?}")));
            }
        }
        Ok(Self { columns })
    }

    /// Load a JSON list of column names, e.g. `feature_columns.json`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let columns: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
            InferenceError::artifact(path, format!("expected a JSON list of strings: {e}"))
        })?;
        Self::new(columns).map_err(|e| InferenceError::artifact(path, e.to_string()))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Produce a row in schema order.
    ///
    /// Named results are looked up column by column with 0 for absent names;
    /// extra names are dropped. Positional results must have exactly one value
    /// per column.
    pub fn align(&self, raw: FeatureResult) -> Result<FeatureRow<'_>> {
        match raw {
            FeatureResult::Named(map) => {
                let values = self
                    .columns
                    .iter()
                    .map(|c| map.get(c).copied().unwrap_or(0.0))
                    .collect();
                if log::log_enabled!(log::Level::Debug) {
                    let extra: Vec<&str> = map
                        .keys()
                        .filter(|k| !self.columns.contains(k))
                        .map(String::as_str)
                        .collect();
                    if !extra.is_empty() {
                        debug!("ignoring features not in schema: {:?}", extra);
                    }
                }
                Ok(FeatureRow::new(&self.columns, values))
            }
            FeatureResult::Positional(values) => {
                if values.len() != self.columns.len() {
                    return Err(InferenceError::LengthMismatch {
                        expected: self.columns.len(),
                        got: values.len(),
                    });
                }
                Ok(FeatureRow::new(&self.columns, values))
            }
        }
    }
}
