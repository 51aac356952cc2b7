use std::path::PathBuf;

/// Errors raised while loading artifacts or serving a single classification.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// A positional feature result does not have one value per schema column.
    #[error("Feature length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// The external feature builder failed or produced unusable output.
    #[error("feature builder: {0}")]
    FeatureBuilder(String),

    /// The classifier rejected the row or produced no usable class.
    #[error("inference: {0}")]
    Inference(String),

    #[error("invalid feature schema: {0}")]
    Schema(String),

    /// An artifact on disk is present but structurally invalid.
    #[error("invalid artifact {}: {reason}", path.display())]
    Artifact { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl InferenceError {
    pub(crate) fn artifact(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        InferenceError::Artifact {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InferenceError>;
