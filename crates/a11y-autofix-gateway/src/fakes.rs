//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides `MemoryDirectory`, `MemoryObjectStore`, `MemoryWorkQueue` and
//! `FakeArchiveBuilder`. Each one counts the calls it receives so tests can
//! assert on side effects ("no upload", "zero publishes").

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::payload::OutboundMessage;
use crate::records::{Opportunity, Site, Suggestion};
use crate::traits::*;
use crate::Result;

// ---------------------------------------------------------------------------
// MemoryDirectory
// ---------------------------------------------------------------------------

/// Catalog backed by plain collections.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    sites: Vec<Site>,
    opportunities: HashMap<String, Vec<Opportunity>>,
    suggestions: HashMap<String, Vec<Suggestion>>,
    calls: AtomicUsize,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(mut self, site: Site) -> Self {
        self.sites.push(site);
        self
    }

    pub fn with_opportunity(mut self, opportunity: Opportunity) -> Self {
        self.opportunities
            .entry(opportunity.site_id.clone())
            .or_default()
            .push(opportunity);
        self
    }

    pub fn with_suggestions(mut self, opportunity_id: &str, suggestions: Vec<Suggestion>) -> Self {
        self.suggestions
            .entry(opportunity_id.to_string())
            .or_default()
            .extend(suggestions);
        self
    }

    /// Number of catalog calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn list_sites(&self) -> Result<Vec<Site>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.sites.clone())
    }

    async fn list_opportunities(&self, site_id: &str) -> Result<Vec<Opportunity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.opportunities.get(site_id).cloned().unwrap_or_default())
    }

    async fn list_suggestions(&self, opportunity: &Opportunity) -> Result<Vec<Suggestion>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .suggestions
            .get(&opportunity.id)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MemoryObjectStore
// ---------------------------------------------------------------------------

/// Object store backed by a `BTreeMap<key, bytes>`.
#[derive(Debug)]
pub struct MemoryObjectStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    puts: AtomicUsize,
    put_failure: Option<String>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory-bucket")
    }
}

impl MemoryObjectStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: Mutex::new(BTreeMap::new()),
            puts: AtomicUsize::new(0),
            put_failure: None,
        }
    }

    pub fn with_object(self, key: &str, bytes: &[u8]) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        self
    }

    /// Every `put` fails with this message.
    pub fn failing_puts(mut self, message: &str) -> Self {
        self.put_failure = Some(message.to_string());
        self
    }

    /// Number of `put` calls received (including failed ones).
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn size_of(&self, key: &str) -> Result<Option<u64>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects.get(key).map(|bytes| bytes.len() as u64))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.put_failure {
            return Err(GatewayError::ObjectStore(message.clone()));
        }
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryWorkQueue
// ---------------------------------------------------------------------------

/// Work queue that records published payloads.
#[derive(Debug, Default)]
pub struct MemoryWorkQueue {
    published: Mutex<Vec<(String, OutboundMessage)>>,
    attempts: AtomicUsize,
    fail_attempts: HashSet<usize>,
}

impl MemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the publish attempt with this zero-based index.
    pub fn failing_attempt(mut self, index: usize) -> Self {
        self.fail_attempts.insert(index);
        self
    }

    /// Number of `publish` calls received (including failed ones).
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Successfully published `(message_id, payload)` pairs, in order.
    pub fn published(&self) -> Vec<(String, OutboundMessage)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn publish(&self, message: &OutboundMessage) -> Result<String> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_attempts.contains(&attempt) {
            return Err(GatewayError::Queue(format!(
                "simulated failure on attempt {attempt}"
            )));
        }
        let message_id = format!("msg-{attempt}");
        self.published
            .lock()
            .unwrap()
            .push((message_id.clone(), message.clone()));
        Ok(message_id)
    }
}

// ---------------------------------------------------------------------------
// FakeArchiveBuilder
// ---------------------------------------------------------------------------

/// Archive builder with a fixed fingerprint and payload.
#[derive(Debug)]
pub struct FakeArchiveBuilder {
    fingerprint: String,
    bytes: Vec<u8>,
    builds: AtomicUsize,
    fail: bool,
}

impl FakeArchiveBuilder {
    pub fn new(fingerprint: &str, bytes: &[u8]) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            bytes: bytes.to_vec(),
            builds: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// Every `build` fails.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of `build` calls received.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ArchiveBuilder for FakeArchiveBuilder {
    fn fingerprint(&self, _root: &Path) -> Result<String> {
        Ok(self.fingerprint.clone())
    }

    fn build(&self, root: &Path) -> Result<Archive> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GatewayError::Archive(format!(
                "simulated failure archiving {}",
                root.display()
            )));
        }
        Ok(Archive {
            bytes: self.bytes.clone(),
        })
    }

    fn extension(&self) -> &str {
        "tar.gz"
    }
}
