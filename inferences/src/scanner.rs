use crate::artifacts::Artifacts;
use crate::error::Result;
use crate::features::FeatureBuilder;
use crate::labels::Label;
use crate::types::FeatureRow;

/// Per-request pipeline: build features, align, classify.
///
/// Holds only immutable state, so one instance is shared by every worker.
pub struct UrlScanner {
    artifacts: Artifacts,
    builder: Box<dyn FeatureBuilder>,
}

impl UrlScanner {
    pub fn new(artifacts: Artifacts, builder: Box<dyn FeatureBuilder>) -> Self {
        Self { artifacts, builder }
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    /// Builder output for `url`, aligned to the schema.
    pub fn features(&self, url: &str) -> Result<FeatureRow<'_>> {
        let raw = self.builder.build(url)?;
        self.artifacts.schema().align(raw)
    }

    pub fn predict(&self, url: &str) -> Result<Label> {
        let row = self.features(url)?;
        self.artifacts.classify(&row)
    }
}
