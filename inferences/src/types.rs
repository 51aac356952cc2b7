use std::collections::HashMap;

use serde_json::Value;

use crate::error::{InferenceError, Result};

/// Raw output of a feature builder, before alignment to the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureResult {
    /// Feature name to value. Missing schema columns become 0.
    Named(HashMap<String, f64>),
    /// Values already in schema order; the length must match exactly.
    Positional(Vec<f64>),
}

impl FeatureResult {
    /// Interprets builder JSON output: objects are named, arrays positional.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(name, v)| -> Result<(String, f64)> {
                    let n = feature_value(&v).ok_or_else(|| {
                        InferenceError::FeatureBuilder(format!(
                            "feature {name:?} is not numeric: {v}"
                        ))
                    })?;
                    Ok((name, n))
                })
                .collect::<Result<HashMap<_, _>>>()
                .map(FeatureResult::Named),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    feature_value(v).ok_or_else(|| {
                        InferenceError::FeatureBuilder(format!(
                            "feature at position {i} is not numeric: {v}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(FeatureResult::Positional),
            other => Err(InferenceError::FeatureBuilder(format!(
                "expected a JSON object or array, got {other}"
            ))),
        }
    }
}

fn feature_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// A single aligned row: one value per schema column, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow<'s> {
    columns: &'s [String],
    values: Vec<f64>,
}

impl<'s> FeatureRow<'s> {
    pub(crate) fn new(columns: &'s [String], values: Vec<f64>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &'s [String] {
        self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values narrowed to `f32`, the input type of the exported models.
    ///
    /// Fails on values that are not finite once narrowed.
    pub fn to_f32(&self) -> Result<Vec<f32>> {
        self.values
            .iter()
            .zip(self.columns)
            .map(|(v, name)| -> Result<f32> {
                let narrowed = *v as f32;
                if narrowed.is_finite() {
                    Ok(narrowed)
                } else {
                    Err(InferenceError::Inference(format!(
                        "feature {name:?} value {v} is out of f32 range"
                    )))
                }
            })
            .collect()
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}
