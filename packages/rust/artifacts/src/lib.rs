//! Run-scoped artifact store.
//!
//! Each processing run owns a directory named by its [`RunId`]; inside it the
//! three output files carry fixed names. Writes are atomic (temp file, then
//! rename) so a large write can never leave a torn artifact behind, and a
//! re-run of the same slot is last-writer-wins.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use contextfunnel_shared::{FunnelError, Result, RunId};

/// Full raw extracted text.
pub const UNCOMPRESSED_NAME: &str = "uncompressed_output.txt";
/// Normalized text.
pub const COMPRESSED_NAME: &str = "compressed_output.txt";
/// Newline-joined crawl URL list; present only for webpage runs.
pub const PROCESSED_URLS_NAME: &str = "processed_urls.txt";

/// The fixed artifact names a run may contain.
pub const ARTIFACT_NAMES: [&str; 3] = [UNCOMPRESSED_NAME, COMPRESSED_NAME, PROCESSED_URLS_NAME];

/// Metadata for a single written artifact.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ArtifactMeta {
    pub name: String,
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Filesystem-backed store rooted at the configured data directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| FunnelError::io(&root, e))?;
        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one run's artifacts.
    pub fn run_dir(&self, run: RunId) -> PathBuf {
        self.root.join(run.to_string())
    }

    /// Write one artifact atomically, overwriting any previous content under
    /// the same name.
    #[instrument(skip(self, bytes), fields(run = %run, name, size = bytes.len()))]
    pub fn put(&self, run: RunId, name: &str, bytes: &[u8]) -> Result<ArtifactMeta> {
        validate_name(name)?;

        let dir = self.run_dir(run);
        std::fs::create_dir_all(&dir).map_err(|e| FunnelError::io(&dir, e))?;

        let target = dir.join(name);
        let temp = dir.join(format!(".{name}.tmp"));

        std::fs::write(&temp, bytes).map_err(|e| FunnelError::io(&temp, e))?;
        std::fs::rename(&temp, &target).map_err(|e| FunnelError::io(&target, e))?;

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let hash = format!("{:x}", hasher.finalize());

        debug!(path = %target.display(), "wrote artifact");

        Ok(ArtifactMeta {
            name: name.to_string(),
            path: target,
            sha256: hash,
            size_bytes: bytes.len(),
        })
    }

    /// Read one artifact's bytes. A missing run or name is
    /// [`FunnelError::ArtifactNotFound`].
    pub fn get(&self, run: RunId, name: &str) -> Result<Vec<u8>> {
        validate_name(name)?;

        let path = self.run_dir(run).join(name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FunnelError::not_found(format!("{run}/{name}")))
            }
            Err(e) => Err(FunnelError::io(&path, e)),
        }
    }

    /// Whether a run has written any artifact yet.
    pub fn run_exists(&self, run: RunId) -> bool {
        self.run_dir(run).is_dir()
    }

    /// Delete a run's directory and everything in it. Missing runs are fine.
    #[instrument(skip(self), fields(run = %run))]
    pub fn remove_run(&self, run: RunId) -> Result<()> {
        let dir = self.run_dir(run);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FunnelError::io(&dir, e)),
        }
    }
}

/// Reject names outside the fixed trio before any filesystem access, so a
/// request-supplied name can never address another path.
fn validate_name(name: &str) -> Result<()> {
    if ARTIFACT_NAMES.contains(&name) {
        Ok(())
    } else {
        Err(FunnelError::validation(format!(
            "unknown artifact name: {name}"
        )))
    }
}
