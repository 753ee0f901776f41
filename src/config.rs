use std::path::{Path, PathBuf};

use crate::{contour_scanner::EdgeSettings, retry::RetryPolicy, Error, Result};

/// Everything a batch run needs, built once up front.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub edges: EdgeSettings,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: None,
            edges: EdgeSettings::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_edges(mut self, edges: EdgeSettings) -> Self {
        self.edges = edges;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_dir.is_dir() {
            Ok(())
        } else {
            Err(Error::InvalidInputDir(self.input_dir.clone()))
        }
    }
}
