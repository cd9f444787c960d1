//! Versioned model artifacts on disk
//!
//! One JSON file per training run, named `price_model_v{version}.json`. The
//! version is the training time formatted `YYYYMMDDHHMM` (UTC), so versions
//! sort chronologically as plain strings. Files are written once and never
//! replaced.

use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::pipeline::PricePipeline;

pub const ARTIFACT_PREFIX: &str = "price_model_v";
pub const ARTIFACT_EXTENSION: &str = "json";

const VERSION_FORMAT: &str = "%Y%m%d%H%M";

/// Artifact file name for a version token
pub fn artifact_file_name(version: &str) -> String {
    format!("{}{}.{}", ARTIFACT_PREFIX, version, ARTIFACT_EXTENSION)
}

/// Minute-granular version token for a training time
pub fn version_for(trained_at: DateTime<Utc>) -> String {
    trained_at.format(VERSION_FORMAT).to_string()
}

/// SHA-256 of the serialized pipeline, hex encoded
pub fn pipeline_checksum(pipeline: &PricePipeline) -> Result<String, EngineError> {
    let bytes = serde_json::to_vec(pipeline)
        .map_err(|e| EngineError::ModelLoad(format!("Failed to serialize pipeline: {}", e)))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
    pub checksum: String,
    pub pipeline: PricePipeline,
}

impl ModelArtifact {
    pub fn new(
        pipeline: PricePipeline,
        trained_at: DateTime<Utc>,
        training_rows: usize,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            version: version_for(trained_at),
            trained_at,
            training_rows,
            checksum: pipeline_checksum(&pipeline)?,
            pipeline,
        })
    }

    /// File name this artifact is stored under
    pub fn file_name(&self) -> String {
        artifact_file_name(&self.version)
    }

    /// Recompute the pipeline checksum and compare with the recorded one
    pub fn verify(&self) -> Result<(), EngineError> {
        let actual = pipeline_checksum(&self.pipeline)?;
        if actual != self.checksum {
            return Err(EngineError::ModelLoad(format!(
                "checksum mismatch for version {}",
                self.version
            )));
        }
        Ok(())
    }

    /// Write into `dir` with create-new semantics.
    ///
    /// Fails with `ArtifactExists` if this version is already on disk.
    pub fn write_new(&self, dir: &Path) -> Result<PathBuf, EngineError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());

        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| EngineError::Training(format!("Failed to serialize artifact: {}", e)))?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(EngineError::ArtifactExists(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&bytes)?;
        file.sync_all()?;

        Ok(path)
    }

    /// Read and verify an artifact file
    pub fn read(path: &Path) -> Result<Self, EngineError> {
        let bytes = std::fs::read(path).map_err(|e| {
            EngineError::ModelLoad(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let artifact: Self = serde_json::from_slice(&bytes).map_err(|e| {
            EngineError::ModelLoad(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        artifact.verify()?;
        Ok(artifact)
    }
}
