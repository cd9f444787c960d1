//! Model registry
//!
//! Selection of the newest artifact is split in two: an `ArtifactStore` lists
//! the version tokens it holds, and `select_latest` picks one with a pure
//! ordering over tokens. The serving process resolves once at startup.

use regex::Regex;
use sdk::errors::EngineError;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

use super::artifact::{artifact_file_name, ModelArtifact};

/// Version token of an artifact.
///
/// All-digit tokens rank above every other token and compare numerically
/// among themselves, so a longer timestamp format still sorts after a shorter
/// one. Other tokens compare in plain string order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelVersion(String);

impl ModelVersion {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for ModelVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_numeric(), other.is_numeric()) {
            (true, true) => {
                let a = self.0.trim_start_matches('0');
                let b = other.0.trim_start_matches('0');
                a.len()
                    .cmp(&b.len())
                    .then_with(|| a.cmp(b))
                    .then_with(|| self.0.len().cmp(&other.0.len()))
            }
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ModelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Greatest version, or `None` when there are none
pub fn select_latest<I>(versions: I) -> Option<ModelVersion>
where
    I: IntoIterator<Item = ModelVersion>,
{
    versions.into_iter().max()
}

/// Storage that holds versioned artifacts
pub trait ArtifactStore: Send + Sync {
    /// Human-readable location, used in errors
    fn location(&self) -> PathBuf;

    /// Every version currently present, in no particular order
    fn list_versions(&self) -> Result<Vec<ModelVersion>, EngineError>;

    /// Load and verify one version
    fn load(&self, version: &ModelVersion) -> Result<ModelArtifact, EngineError>;
}

/// Artifacts stored as files in one directory
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

fn artifact_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^price_model_v([0-9A-Za-z_-]+)\.json$").expect("Invalid artifact name pattern")
    })
}

/// Version token of an artifact file name, if it matches the naming pattern
pub fn parse_artifact_file_name(name: &str) -> Option<ModelVersion> {
    artifact_name_pattern()
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| ModelVersion::new(m.as_str()))
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, version: &ModelVersion) -> PathBuf {
        self.dir.join(artifact_file_name(version.as_str()))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn location(&self) -> PathBuf {
        self.dir.clone()
    }

    fn list_versions(&self) -> Result<Vec<ModelVersion>, EngineError> {
        if !self.dir.exists() {
            debug!("Artifact directory {} does not exist", self.dir.display());
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(version) = entry.file_name().to_str().and_then(parse_artifact_file_name) {
                versions.push(version);
            }
        }
        Ok(versions)
    }

    fn load(&self, version: &ModelVersion) -> Result<ModelArtifact, EngineError> {
        let artifact = ModelArtifact::read(&self.path_for(version))?;
        if artifact.version != version.as_str() {
            return Err(EngineError::ModelLoad(format!(
                "file for version {} records version {}",
                version, artifact.version
            )));
        }
        Ok(artifact)
    }
}

/// Load the newest artifact in `store`.
///
/// Fails with `ModelNotFound` when the store is empty.
pub fn resolve_latest(store: &dyn ArtifactStore) -> Result<ModelArtifact, EngineError> {
    let versions = store.list_versions()?;
    let count = versions.len();
    let latest =
        select_latest(versions).ok_or_else(|| EngineError::ModelNotFound(store.location()))?;

    info!(
        "Selected model version {} out of {} artifact(s) in {}",
        latest,
        count,
        store.location().display()
    );
    store.load(&latest)
}
