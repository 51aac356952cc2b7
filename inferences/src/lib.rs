//! Core of the URL threat classifier: aligns raw features to the training
//! schema, runs the pretrained model and maps its class to a label.

pub mod artifacts;
pub mod error;
pub mod features;
pub mod inference;
pub mod labels;
pub mod scanner;
pub mod schema;
pub mod types;

pub use artifacts::{ArtifactPaths, Artifacts};
pub use error::{InferenceError, Result};
pub use features::{CommandFeatureBuilder, FeatureBuilder};
pub use inference::{load_classifier, Classifier, LinearClassifier, OnnxClassifier};
pub use labels::{Label, LabelMap};
pub use scanner::UrlScanner;
pub use schema::FeatureSchema;
pub use types::{FeatureResult, FeatureRow};
