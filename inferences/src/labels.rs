use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{InferenceError, Result};

/// Class ordering produced by an alphabetical label encoder over
/// benign/defacement/malware/phishing.
const DEFAULT_LABELS: [(i64, &str); 4] = [
    (0, "SAFE"),
    (1, "DEFACEMENT"),
    (2, "MALWARE"),
    (3, "PHISHING"),
];

/// Resolved prediction. Unmapped class indices are reported as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Label {
    Named(String),
    Raw(i64),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Named(name) => f.write_str(name),
            Label::Raw(index) => write!(f, "{index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    names: BTreeMap<i64, String>,
}

impl Default for LabelMap {
    fn default() -> Self {
        Self {
            names: DEFAULT_LABELS
                .iter()
                .map(|(i, name)| (*i, name.to_string()))
                .collect(),
        }
    }
}

impl LabelMap {
    pub fn new(names: BTreeMap<i64, String>) -> Self {
        Self { names }
    }

    /// Load an override such as `{"0": "SAFE", "1": "DEFACEMENT"}`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let names: BTreeMap<i64, String> = serde_json::from_str(&raw).map_err(|e| {
            InferenceError::artifact(
                path,
                format!("expected an object of class index to label: {e}"),
            )
        })?;
        if names.is_empty() {
            return Err(InferenceError::artifact(path, "label map is empty"));
        }
        Ok(Self { names })
    }

    pub fn resolve(&self, class: i64) -> Label {
        match self.names.get(&class) {
            Some(name) => Label::Named(name.clone()),
            None => Label::Raw(class),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
