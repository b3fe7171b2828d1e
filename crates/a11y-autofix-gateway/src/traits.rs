//! Collaborator contracts used by the remediation engine.
//!
//! - `Directory`: read-only site / opportunity / suggestion catalog
//! - `ObjectStore`: blob storage for source snapshots
//! - `WorkQueue`: at-least-once channel to the remediation worker
//! - `ArchiveBuilder`: turns a source tree into a compressed blob
//!
//! The network-facing traits are async and backend-agnostic; in-memory fakes
//! live in the `fakes` module.

use std::path::Path;

use async_trait::async_trait;

use crate::payload::OutboundMessage;
use crate::records::{Opportunity, Site, Suggestion};
use crate::Result;

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Read-only catalog of sites, opportunities and suggestions.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Every site visible to the caller.
    async fn list_sites(&self) -> Result<Vec<Site>>;

    /// Opportunities of one site, in catalog order.
    async fn list_opportunities(&self, site_id: &str) -> Result<Vec<Opportunity>>;

    /// Suggestions of one opportunity, normalized, in catalog order.
    async fn list_suggestions(&self, opportunity: &Opportunity) -> Result<Vec<Suggestion>>;
}

// ---------------------------------------------------------------------------
// ObjectStore
// ---------------------------------------------------------------------------

/// Blob storage keyed by object key.
///
/// `put` overwrites; writing identical bytes twice under one key is not an
/// error.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket (or equivalent namespace) that keys refer to.
    fn bucket(&self) -> &str;

    /// Size of the object under `key`, or `None` when absent.
    async fn size_of(&self, key: &str) -> Result<Option<u64>>;

    /// Store `bytes` under `key`.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Keys starting with `prefix`, newest first where the backend knows.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// WorkQueue
// ---------------------------------------------------------------------------

/// At-least-once delivery channel to the remediation worker.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Publish one payload, returning the queue-assigned message id.
    async fn publish(&self, message: &OutboundMessage) -> Result<String>;
}

// ---------------------------------------------------------------------------
// ArchiveBuilder
// ---------------------------------------------------------------------------

/// A built archive ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub bytes: Vec<u8>,
}

impl Archive {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Compresses a directory tree. Blocking; callers run it off the async
/// executor.
pub trait ArchiveBuilder: Send + Sync {
    /// Stable content fingerprint of the tree: identical trees, identical
    /// fingerprints. Must not build the archive.
    fn fingerprint(&self, root: &Path) -> Result<String>;

    /// Build the compressed archive of the tree.
    fn build(&self, root: &Path) -> Result<Archive>;

    /// File extension of produced archives (without the leading dot).
    fn extension(&self) -> &str;
}
