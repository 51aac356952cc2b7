//! Read-only state loaded once at startup.

use std::path::PathBuf;

use log::info;

use crate::error::Result;
use crate::inference::{load_classifier, Classifier};
use crate::labels::{Label, LabelMap};
use crate::schema::FeatureSchema;
use crate::types::FeatureRow;

/// On-disk locations of the artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub feature_columns: PathBuf,
    pub label_map: Option<PathBuf>,
}

/// Feature schema, classifier and label map. Never mutated after load.
pub struct Artifacts {
    schema: FeatureSchema,
    classifier: Box<dyn Classifier>,
    labels: LabelMap,
}

impl Artifacts {
    pub fn new(schema: FeatureSchema, classifier: Box<dyn Classifier>, labels: LabelMap) -> Self {
        Self {
            schema,
            classifier,
            labels,
        }
    }

    /// The schema is read first since the classifier is pinned to its width.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let schema = FeatureSchema::from_file(&paths.feature_columns)?;
        info!(
            "loaded {} feature columns from {}",
            schema.len(),
            paths.feature_columns.display()
        );

        let classifier = load_classifier(&paths.model, &schema)?;
        info!("loaded classifier from {}", paths.model.display());

        let labels = match &paths.label_map {
            Some(path) => {
                let labels = LabelMap::from_file(path)?;
                info!("loaded {} labels from {}", labels.len(), path.display());
                labels
            }
            None => LabelMap::default(),
        };

        Ok(Self::new(schema, classifier, labels))
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Predict on an aligned row and map the class through the label map.
    pub fn classify(&self, row: &FeatureRow<'_>) -> Result<Label> {
        let class = self.classifier.predict(row)?;
        Ok(self.labels.resolve(class))
    }
}
