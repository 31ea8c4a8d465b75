//! Configuration types for the cloudpipe crate.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported object storage providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudProvider {
    Aws,
    Gcp,
}

impl FromStr for CloudProvider {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws" => Ok(Self::Aws),
            "gcp" => Ok(Self::Gcp),
            other => Err(PipelineError::config(format!(
                "Unknown cloud provider: {other}"
            ))),
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aws => write!(f, "aws"),
            Self::Gcp => write!(f, "gcp"),
        }
    }
}

/// Construction parameters for a pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Object storage provider backing the pipeline.
    pub provider: CloudProvider,
    /// Bucket name (S3 bucket or GCS bucket).
    pub bucket_name: String,
    /// Cloud region.
    #[serde(default = "default_region")]
    pub region: String,
}

impl PipelineConfig {
    pub fn new(provider: CloudProvider, bucket_name: impl Into<String>) -> Self {
        Self {
            provider,
            bucket_name: bucket_name.into(),
            region: default_region(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}
