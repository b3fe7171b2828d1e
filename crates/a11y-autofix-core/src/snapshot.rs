//! Snapshot Stager.
//!
//! Makes sure a compressed copy of the working source tree is available in
//! the object store and returns its [`SnapshotReference`]. Archives live
//! under [`SNAPSHOT_PREFIX`] at a key derived from the tree fingerprint, so
//! an unchanged tree is never uploaded twice.
//!
//! Staging is split in two: [`SnapshotStager::prepare`] only reads the tree
//! and can run alongside resolution; [`SnapshotStager::stage_prepared`]
//! touches the store and runs once there is something to send.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use a11y_autofix_gateway::{ArchiveBuilder, ObjectStore, SnapshotReference};
use tracing::{debug, info};

use crate::error::{AutofixError, Result};

/// Object-key prefix of every source snapshot.
pub const SNAPSHOT_PREFIX: &str = "tmp/codefix/source/";

/// Fingerprint characters kept in the object key.
const KEY_FINGERPRINT_LEN: usize = 16;

/// Archives listed when a pinned archive is missing.
const LISTED_ARCHIVES: usize = 10;

/// Where the snapshot for a run comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SnapshotSource {
    /// Reuse the archive for the current tree, uploading it if absent.
    #[default]
    Auto,
    /// Always build and upload, even if the key already exists.
    ForceUpload,
    /// Use an existing archive by file name (or full key); never build.
    Pinned(String),
}

/// A fingerprinted tree, ready to stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPlan {
    pub repo_path: PathBuf,
    pub fingerprint: String,
    pub object_key: String,
}

pub struct SnapshotStager {
    store: Arc<dyn ObjectStore>,
    builder: Arc<dyn ArchiveBuilder>,
}

impl SnapshotStager {
    pub fn new(store: Arc<dyn ObjectStore>, builder: Arc<dyn ArchiveBuilder>) -> Self {
        Self { store, builder }
    }

    /// Stage the tree at `repo_path` according to `source`.
    pub async fn stage(&self, repo_path: &Path, source: &SnapshotSource) -> Result<SnapshotReference> {
        match source {
            SnapshotSource::Pinned(name) => self.pinned(name).await,
            SnapshotSource::Auto => {
                let plan = self.prepare(repo_path).await?;
                self.stage_prepared(&plan, false).await
            }
            SnapshotSource::ForceUpload => {
                let plan = self.prepare(repo_path).await?;
                self.stage_prepared(&plan, true).await
            }
        }
    }

    /// Fingerprint the tree and derive its object key. Read-only.
    pub async fn prepare(&self, repo_path: &Path) -> Result<SnapshotPlan> {
        if !repo_path.is_dir() {
            return Err(AutofixError::ArchiveBuildFailed(format!(
                "repository path is not a directory: {}",
                repo_path.display()
            )));
        }
        let repo_name = repo_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AutofixError::ArchiveBuildFailed(format!(
                    "repository path has no directory name: {}",
                    repo_path.display()
                ))
            })?;

        let builder = Arc::clone(&self.builder);
        let root = repo_path.to_path_buf();
        let fingerprint = tokio::task::spawn_blocking(move || builder.fingerprint(&root))
            .await
            .map_err(|e| AutofixError::ArchiveBuildFailed(e.to_string()))?
            .map_err(|e| AutofixError::ArchiveBuildFailed(e.to_string()))?;

        let short: String = fingerprint.chars().take(KEY_FINGERPRINT_LEN).collect();
        let object_key = format!(
            "{SNAPSHOT_PREFIX}{repo_name}-{short}.{}",
            self.builder.extension()
        );
        debug!(object_key = %object_key, "fingerprinted repository");

        Ok(SnapshotPlan {
            repo_path: repo_path.to_path_buf(),
            fingerprint,
            object_key,
        })
    }

    /// Reuse or upload the archive for a prepared tree.
    pub async fn stage_prepared(&self, plan: &SnapshotPlan, force: bool) -> Result<SnapshotReference> {
        if !force {
            let existing = self
                .store
                .size_of(&plan.object_key)
                .await
                .map_err(|e| AutofixError::UploadFailed(e.to_string()))?;
            if let Some(size_bytes) = existing {
                info!(object_key = %plan.object_key, "reusing existing snapshot");
                return Ok(self.reference(&plan.object_key, size_bytes, true));
            }
        }

        let builder = Arc::clone(&self.builder);
        let root = plan.repo_path.clone();
        let archive = tokio::task::spawn_blocking(move || builder.build(&root))
            .await
            .map_err(|e| AutofixError::ArchiveBuildFailed(e.to_string()))?
            .map_err(|e| AutofixError::ArchiveBuildFailed(e.to_string()))?;
        let size_bytes = archive.size_bytes();

        info!(object_key = %plan.object_key, size_bytes, "uploading snapshot");
        self.store
            .put(&plan.object_key, archive.bytes)
            .await
            .map_err(|e| AutofixError::UploadFailed(e.to_string()))?;

        Ok(self.reference(&plan.object_key, size_bytes, false))
    }

    /// Reference an archive that must already exist.
    pub async fn pinned(&self, name: &str) -> Result<SnapshotReference> {
        let object_key = if name.starts_with(SNAPSHOT_PREFIX) {
            name.to_string()
        } else {
            format!("{SNAPSHOT_PREFIX}{name}")
        };

        let existing = self
            .store
            .size_of(&object_key)
            .await
            .map_err(|e| AutofixError::UploadFailed(e.to_string()))?;
        match existing {
            Some(size_bytes) => Ok(self.reference(&object_key, size_bytes, true)),
            None => {
                let available = self
                    .store
                    .list(SNAPSHOT_PREFIX)
                    .await
                    .unwrap_or_default()
                    .into_iter()
                    .take(LISTED_ARCHIVES)
                    .collect();
                Err(AutofixError::ArchiveNotFound {
                    key: object_key,
                    available,
                })
            }
        }
    }

    fn reference(&self, object_key: &str, size_bytes: u64, already_existed: bool) -> SnapshotReference {
        SnapshotReference {
            bucket: self.store.bucket().to_string(),
            object_key: object_key.to_string(),
            size_bytes,
            already_existed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a11y_autofix_gateway::fakes::{FakeArchiveBuilder, MemoryObjectStore};

    fn repo() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("site-repo");
        std::fs::create_dir_all(&root).unwrap();
        (dir, root)
    }

    #[tokio::test]
    async fn test_key_uses_repo_name_and_short_fingerprint() {
        let (_dir, root) = repo();
        let store = Arc::new(MemoryObjectStore::new("bucket"));
        let builder = Arc::new(FakeArchiveBuilder::new("0123456789abcdef0123", b"tgz"));
        let plan = SnapshotStager::new(store, builder).prepare(&root).await.unwrap();
        assert_eq!(
            plan.object_key,
            "tmp/codefix/source/site-repo-0123456789abcdef.tar.gz"
        );
    }

    #[tokio::test]
    async fn test_missing_repo_fails_before_store_access() {
        let store = Arc::new(MemoryObjectStore::new("bucket"));
        let builder = Arc::new(FakeArchiveBuilder::new("fp", b"tgz"));
        let stager = SnapshotStager::new(store.clone(), builder.clone());
        let err = stager
            .stage(Path::new("/definitely/not/here"), &SnapshotSource::Auto)
            .await
            .unwrap_err();
        assert!(matches!(err, AutofixError::ArchiveBuildFailed(_)));
        assert_eq!(store.puts(), 0);
        assert_eq!(builder.builds(), 0);
    }

    #[tokio::test]
    async fn test_pinned_accepts_full_key() {
        let store = Arc::new(
            MemoryObjectStore::new("bucket").with_object("tmp/codefix/source/a.tar.gz", b"abc"),
        );
        let builder = Arc::new(FakeArchiveBuilder::new("fp", b"tgz"));
        let stager = SnapshotStager::new(store, builder.clone());
        let reference = stager.pinned("tmp/codefix/source/a.tar.gz").await.unwrap();
        assert_eq!(reference.size_bytes, 3);
        assert!(reference.already_existed);
        assert_eq!(builder.builds(), 0);
    }
}
