//! Source-tree snapshots as gzip-compressed tarballs.
//!
//! Entries are rooted at the repository directory name and owned by
//! `root:root` (uid/gid 0), which is what the remediation worker unpacks.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use tar::{Builder, Header};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::GatewayError;
use crate::traits::{Archive, ArchiveBuilder};
use crate::Result;

/// [`ArchiveBuilder`] producing `.tar.gz` archives.
#[derive(Debug, Default, Clone)]
pub struct TarGzArchiveBuilder;

impl TarGzArchiveBuilder {
    pub fn new() -> Self {
        Self
    }
}

/// Entries below `root`, sorted by path, root itself excluded.
fn tree_entries(root: &Path) -> Result<Vec<DirEntry>> {
    if !root.is_dir() {
        return Err(GatewayError::Archive(format!(
            "not a directory: {}",
            root.display()
        )));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1)
    {
        entries.push(entry?);
    }
    Ok(entries)
}

fn relative_name(root: &Path, entry: &DirEntry) -> Result<String> {
    let rel = entry
        .path()
        .strip_prefix(root)
        .map_err(|e| GatewayError::Archive(e.to_string()))?;
    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/"))
}

fn root_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repo".to_string())
}

impl ArchiveBuilder for TarGzArchiveBuilder {
    fn fingerprint(&self, root: &Path) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(root_name(root).as_bytes());
        hasher.update(b"\0");

        for entry in tree_entries(root)? {
            let name = relative_name(root, &entry)?;
            let file_type = entry.file_type();

            if file_type.is_dir() {
                hasher.update(b"d\0");
                hasher.update(name.as_bytes());
                hasher.update(b"\0");
            } else if file_type.is_symlink() {
                let target = fs::read_link(entry.path())?;
                hasher.update(b"l\0");
                hasher.update(name.as_bytes());
                hasher.update(b"\0");
                hasher.update(target.to_string_lossy().as_bytes());
                hasher.update(b"\0");
            } else {
                let content = fs::read(entry.path())?;
                hasher.update(b"f\0");
                hasher.update(name.as_bytes());
                hasher.update(b"\0");
                hasher.update((content.len() as u64).to_le_bytes());
                hasher.update(&content);
            }
        }

        Ok(hex::encode(hasher.finalize()))
    }

    fn build(&self, root: &Path) -> Result<Archive> {
        let prefix = PathBuf::from(root_name(root));
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut tar = Builder::new(encoder);
        let mut count = 0usize;

        for entry in tree_entries(root)? {
            let name = prefix.join(relative_name(root, &entry)?);
            let metadata = entry.metadata()?;

            let mut header = Header::new_gnu();
            header.set_metadata(&metadata);
            header.set_uid(0);
            header.set_gid(0);
            header.set_username("root")?;
            header.set_groupname("root")?;

            let file_type = entry.file_type();
            if file_type.is_dir() {
                header.set_size(0);
                tar.append_data(&mut header, &name, std::io::empty())?;
            } else if file_type.is_symlink() {
                header.set_size(0);
                let target = fs::read_link(entry.path())?;
                tar.append_link(&mut header, &name, target)?;
            } else {
                let file = File::open(entry.path())?;
                tar.append_data(&mut header, &name, file)?;
            }
            count += 1;
        }

        let bytes = tar.into_inner()?.finish()?;
        debug!(root = %root.display(), entries = count, size = bytes.len(), "archive built");
        Ok(Archive { bytes })
    }

    fn extension(&self) -> &str {
        "tar.gz"
    }
}
