//! Classifier seam and the two artifact formats it can be loaded from.

use std::path::Path;

use serde::Deserialize;
use tract_onnx::prelude::*;

use crate::error::{InferenceError, Result};
use crate::schema::FeatureSchema;
use crate::types::FeatureRow;

/// Anything that maps one aligned row to a class index.
pub trait Classifier: Send + Sync {
    fn predict(&self, row: &FeatureRow<'_>) -> Result<i64>;
}

/// Pick a backend from the artifact extension: `.onnx` or `.json`.
pub fn load_classifier<P: AsRef<Path>>(
    path: P,
    schema: &FeatureSchema,
) -> Result<Box<dyn Classifier>> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("onnx") => {
            let model = OnnxClassifier::load(path, schema.len())
                .map_err(|e| InferenceError::artifact(path, format!("{e:#}")))?;
            Ok(Box::new(model))
        }
        Some("json") => Ok(Box::new(LinearClassifier::from_file(path, schema)?)),
        _ => Err(InferenceError::artifact(
            path,
            "unsupported model format (expected .onnx or .json)",
        )),
    }
}

/// ONNX export of the trained model, run with tract.
///
/// Tree-ensemble exports must be produced without a ZipMap node; the first
/// output is read as the predicted class.
pub struct OnnxClassifier {
    model: TypedRunnableModel<TypedModel>,
    inputs: usize,
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(model_path: P, inputs: usize) -> TractResult<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, inputs)),
            )?
            .into_optimized()?
            .into_runnable()?;

        Ok(Self { model, inputs })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, row: &FeatureRow<'_>) -> Result<i64> {
        if row.len() != self.inputs {
            return Err(InferenceError::LengthMismatch {
                expected: self.inputs,
                got: row.len(),
            });
        }
        let values = row.to_f32()?;
        let input =
            Tensor::from_shape(&[1, self.inputs], values.as_slice()).map_err(tract_error)?;
        let outputs = self.model.run(tvec!(input.into())).map_err(tract_error)?;
        let first = outputs
            .first()
            .ok_or_else(|| InferenceError::Inference("model produced no outputs".to_string()))?;
        class_index(first)
    }
}

fn tract_error(e: TractError) -> InferenceError {
    InferenceError::Inference(format!("{e:#}"))
}

/// Labels come back as integers; score tensors are reduced with argmax.
fn class_index(output: &Tensor) -> Result<i64> {
    let class = match output.datum_type() {
        DatumType::I64 => output
            .as_slice::<i64>()
            .map_err(tract_error)?
            .first()
            .copied(),
        DatumType::I32 => output
            .as_slice::<i32>()
            .map_err(tract_error)?
            .first()
            .map(|c| i64::from(*c)),
        DatumType::F32 => {
            let scores: Vec<f64> = output
                .as_slice::<f32>()
                .map_err(tract_error)?
                .iter()
                .map(|s| f64::from(*s))
                .collect();
            score_class(&scores)?
        }
        DatumType::F64 => score_class(output.as_slice::<f64>().map_err(tract_error)?)?,
        other => {
            return Err(InferenceError::Inference(format!(
                "unsupported model output type {other:?}"
            )))
        }
    };
    class.ok_or_else(|| InferenceError::Inference("model output is empty".to_string()))
}

/// A lone value is a class number and is truncated; several are class scores.
fn score_class(scores: &[f64]) -> Result<Option<i64>> {
    if let Some(s) = scores.iter().find(|s| !s.is_finite()) {
        return Err(InferenceError::Inference(format!(
            "model produced non-finite output {s}"
        )));
    }
    match scores {
        [] => Ok(None),
        [single] => {
            let class = single.trunc();
            // i64::MAX as f64 rounds up to 2^63
            if class < i64::MIN as f64 || class >= i64::MAX as f64 {
                return Err(InferenceError::Inference(format!(
                    "model output {single} is not a class index"
                )));
            }
            Ok(Some(class as i64))
        }
        _ => Ok(argmax(scores).map(|i| i as i64)),
    }
}

fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}

/// Multinomial linear model stored as JSON.
///
/// ```json
/// {"model_version": "1", "feature_names": ["len_url", "has_ip"],
///  "classes": [0, 1], "weights": [[0.1, 2.0], [-0.1, -2.0]], "bias": [0.0, 0.5]}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LinearClassifier {
    #[serde(default)]
    pub model_version: String,
    /// Must equal the schema when present.
    #[serde(default)]
    pub feature_names: Vec<String>,
    /// Class index per weight row; defaults to `0..weights.len()`.
    #[serde(default)]
    pub classes: Vec<i64>,
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl LinearClassifier {
    pub fn from_json(json: &str, schema: &FeatureSchema) -> Result<Self> {
        let mut model: Self = serde_json::from_str(json)?;
        if model.classes.is_empty() {
            model.classes = (0..model.weights.len() as i64).collect();
        }
        model.validate(schema)?;
        Ok(model)
    }

    pub fn from_file<P: AsRef<Path>>(path: P, schema: &FeatureSchema) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw, schema).map_err(|e| InferenceError::artifact(path, e.to_string()))
    }

    pub fn validate(&self, schema: &FeatureSchema) -> Result<()> {
        let invalid = |reason: String| -> Result<()> { Err(InferenceError::Inference(reason)) };

        if self.weights.is_empty() {
            return invalid("model has no classes".to_string());
        }
        if self.bias.len() != self.weights.len() || self.classes.len() != self.weights.len() {
            return invalid(format!(
                "{} weight rows, {} biases and {} classes",
                self.weights.len(),
                self.bias.len(),
                self.classes.len()
            ));
        }
        for (i, row) in self.weights.iter().enumerate() {
            if row.len() != schema.len() {
                return invalid(format!(
                    "weight row {i} has {} values, schema has {}",
                    row.len(),
                    schema.len()
                ));
            }
            if let Some(w) = row.iter().find(|w| !w.is_finite()) {
                return invalid(format!("weight row {i} has non-finite value {w}"));
            }
        }
        if let Some(b) = self.bias.iter().find(|b| !b.is_finite()) {
            return invalid(format!("non-finite bias {b}"));
        }
        if !self.feature_names.is_empty() && self.feature_names != schema.columns() {
            return invalid("feature_names do not match the feature schema".to_string());
        }
        Ok(())
    }

    fn scores(&self, values: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| w.iter().zip(values).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }
}

impl Classifier for LinearClassifier {
    fn predict(&self, row: &FeatureRow<'_>) -> Result<i64> {
        let expected = self.weights.first().map_or(0, Vec::len);
        if row.len() != expected {
            return Err(InferenceError::LengthMismatch {
                expected,
                got: row.len(),
            });
        }
        let scores = self.scores(row.values());
        if let Some(s) = scores.iter().find(|s| !s.is_finite()) {
            return Err(InferenceError::Inference(format!(
                "model produced non-finite score {s}"
            )));
        }
        let best = argmax(&scores)
            .ok_or_else(|| InferenceError::Inference("model has no classes".to_string()))?;
        Ok(self.classes[best])
    }
}
