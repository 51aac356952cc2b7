//! Environment-driven server configuration.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use urlscan_inference::ArtifactPaths;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8010;
const DEFAULT_MODEL: &str = "model.onnx";
const DEFAULT_FEATURE_COLUMNS: &str = "feature_columns.json";
const DEFAULT_FEATURE_BUILDER: &str = "python3 features.py";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub artifacts: ArtifactPaths,
    pub feature_builder: String,
    /// Directory relative artifact paths and the feature builder resolve against.
    pub base_dir: PathBuf,
}

impl Config {
    /// Read `URLSCAN_*` variables; defaults sit next to the executable.
    pub fn from_env() -> Result<Self> {
        let exe = std::env::current_exe().context("cannot locate the running executable")?;
        let base_dir = exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_lookup(base_dir, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(base_dir: PathBuf, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("URLSCAN_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var("URLSCAN_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("URLSCAN_PORT is not a valid port: {raw:?}"))?,
            None => DEFAULT_PORT,
        };
        let workers = var("URLSCAN_WORKERS")
            .and_then(|w| w.trim().parse().ok())
            .filter(|w| *w > 0)
            .unwrap_or_else(num_cpus::get);

        let resolve = |key: &str, default: &str| {
            let path = PathBuf::from(var(key).unwrap_or_else(|| default.to_string()));
            if path.is_relative() {
                base_dir.join(path)
            } else {
                path
            }
        };
        let artifacts = ArtifactPaths {
            model: resolve("URLSCAN_MODEL", DEFAULT_MODEL),
            feature_columns: resolve("URLSCAN_FEATURE_COLUMNS", DEFAULT_FEATURE_COLUMNS),
            label_map: var("URLSCAN_LABEL_MAP").map(|_| resolve("URLSCAN_LABEL_MAP", "")),
        };

        let feature_builder = match lookup("URLSCAN_FEATURE_BUILDER") {
            Some(cmd) if cmd.trim().is_empty() => bail!("URLSCAN_FEATURE_BUILDER is empty"),
            Some(cmd) => cmd,
            None => DEFAULT_FEATURE_BUILDER.to_string(),
        };

        Ok(Config {
            host,
            port,
            workers,
            artifacts,
            feature_builder,
            base_dir,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
