//! Seam to the external routine that turns a URL into raw features.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;

use crate::error::{InferenceError, Result};
use crate::types::FeatureResult;

pub trait FeatureBuilder: Send + Sync {
    fn build(&self, url: &str) -> Result<FeatureResult>;
}

impl<F> FeatureBuilder for F
where
    F: Fn(&str) -> Result<FeatureResult> + Send + Sync,
{
    fn build(&self, url: &str) -> Result<FeatureResult> {
        self(url)
    }
}

/// Runs `program args... <url>` and reads a JSON object or array from stdout.
#[derive(Debug, Clone)]
pub struct CommandFeatureBuilder {
    program: PathBuf,
    args: Vec<String>,
    dir: Option<PathBuf>,
}

impl CommandFeatureBuilder {
    pub fn new<P, I, S>(program: P, args: I) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
        }
    }

    /// Split a whitespace-separated command line such as `python3 features.py`.
    pub fn parse(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            InferenceError::FeatureBuilder("feature builder command is empty".to_string())
        })?;
        Ok(Self::new(program, parts))
    }

    /// Working directory for the child, so relative script paths resolve.
    pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl FeatureBuilder for CommandFeatureBuilder {
    fn build(&self, url: &str) -> Result<FeatureResult> {
        // the url is the last argument and must not read as an option
        if url.starts_with('-') {
            return Err(InferenceError::FeatureBuilder(format!(
                "refusing url {url:?}: must not start with '-'"
            )));
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }

        debug!("running feature builder {} for {}", self.program.display(), url);
        let output = cmd.output().map_err(|e| {
            InferenceError::FeatureBuilder(format!(
                "failed to run {}: {e}",
                self.program.display()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InferenceError::FeatureBuilder(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let value: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            InferenceError::FeatureBuilder(format!("output is not valid JSON: {e}"))
        })?;
        FeatureResult::from_json(value)
    }
}
