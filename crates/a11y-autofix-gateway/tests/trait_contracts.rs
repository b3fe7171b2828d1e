//! Trait contract tests for Directory, ObjectStore, WorkQueue and
//! ArchiveBuilder.
//!
//! These tests pin the behavioral contracts using the in-memory fakes. Any
//! conforming implementation must pass them.

use a11y_autofix_gateway::fakes::{
    FakeArchiveBuilder, MemoryDirectory, MemoryObjectStore, MemoryWorkQueue,
};
use a11y_autofix_gateway::traits::*;
use a11y_autofix_gateway::{
    GatewayError, OutboundMessage, Opportunity, Site, SnapshotReference, Suggestion,
    TarGzArchiveBuilder, REMEDIATION_MESSAGE_TYPE,
};

fn message(id: &str) -> OutboundMessage {
    OutboundMessage {
        kind: REMEDIATION_MESSAGE_TYPE.to_string(),
        site_id: "site".into(),
        opportunity_id: "opp".into(),
        audit_id: "audit".into(),
        aggregation_key: "u|t|s".into(),
        url: "u".into(),
        time: "2026-01-01T00:00:00+00:00".into(),
        suggestion_ids: vec![id.to_string()],
        snapshot: SnapshotReference {
            bucket: "b".into(),
            object_key: "k".into(),
            size_bytes: 1,
            already_existed: false,
        },
        issues: vec![],
    }
}

// ===========================================================================
// Directory contract tests
// ===========================================================================

#[tokio::test]
async fn directory_scopes_opportunities_by_site() {
    let directory = MemoryDirectory::new()
        .with_site(Site::new("s1", "https://one.test"))
        .with_site(Site::new("s2", "https://two.test"))
        .with_opportunity(Opportunity::new("o1", "s1", "accessibility", Some("a1")))
        .with_opportunity(Opportunity::new("o2", "s2", "accessibility", Some("a2")));

    let opportunities = directory.list_opportunities("s1").await.unwrap();
    assert_eq!(opportunities.len(), 1);
    assert_eq!(opportunities[0].id, "o1");
    assert!(directory.list_opportunities("missing").await.unwrap().is_empty());
}

#[tokio::test]
async fn directory_preserves_suggestion_order() {
    let opportunity = Opportunity::new("o1", "s1", "accessibility", None);
    let directory = MemoryDirectory::new().with_suggestions(
        "o1",
        vec![
            Suggestion::new("b", "o1", "u|t|x"),
            Suggestion::new("a", "o1", "u|t|y"),
        ],
    );

    let ids: Vec<String> = directory
        .list_suggestions(&opportunity)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(directory.calls(), 1);
}

// ===========================================================================
// ObjectStore contract tests
// ===========================================================================

#[tokio::test]
async fn object_store_size_is_known_after_put() {
    let store = MemoryObjectStore::new("bucket");
    assert_eq!(store.size_of("k").await.unwrap(), None);
    store.put("k", b"abc".to_vec()).await.unwrap();
    assert_eq!(store.size_of("k").await.unwrap(), Some(3));
}

#[tokio::test]
async fn object_store_identical_overwrite_is_not_an_error() {
    let store = MemoryObjectStore::new("bucket");
    store.put("k", b"same".to_vec()).await.unwrap();
    store.put("k", b"same".to_vec()).await.unwrap();
    assert_eq!(store.puts(), 2);
    assert_eq!(store.keys(), vec!["k".to_string()]);
}

#[tokio::test]
async fn object_store_lists_by_prefix() {
    let store = MemoryObjectStore::new("bucket")
        .with_object("tmp/codefix/source/a.tar.gz", b"a")
        .with_object("tmp/other/b.tar.gz", b"b");
    let keys = store.list("tmp/codefix/source/").await.unwrap();
    assert_eq!(keys, vec!["tmp/codefix/source/a.tar.gz".to_string()]);
}

#[tokio::test]
async fn object_store_failure_surfaces_message_verbatim() {
    let store = MemoryObjectStore::new("bucket").failing_puts("ExpiredToken: token expired");
    let err = store.put("k", vec![1]).await.unwrap_err();
    assert!(matches!(err, GatewayError::ObjectStore(_)));
    assert!(err.to_string().contains("ExpiredToken: token expired"));
}

// ===========================================================================
// WorkQueue contract tests
// ===========================================================================

#[tokio::test]
async fn work_queue_returns_distinct_message_ids() {
    let queue = MemoryWorkQueue::new();
    let a = queue.publish(&message("x")).await.unwrap();
    let b = queue.publish(&message("y")).await.unwrap();
    assert_ne!(a, b);
    assert_eq!(queue.published().len(), 2);
}

#[tokio::test]
async fn work_queue_failure_does_not_record_message() {
    let queue = MemoryWorkQueue::new().failing_attempt(0);
    assert!(queue.publish(&message("x")).await.is_err());
    queue.publish(&message("y")).await.unwrap();
    assert_eq!(queue.attempts(), 2);
    let published = queue.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].1.suggestion_ids, vec!["y".to_string()]);
}

// ===========================================================================
// ArchiveBuilder contract tests
// ===========================================================================

#[test]
fn archive_fingerprint_does_not_build() {
    let builder = FakeArchiveBuilder::new("fp", b"bytes");
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(builder.fingerprint(dir.path()).unwrap(), "fp");
    assert_eq!(builder.builds(), 0);
    builder.build(dir.path()).unwrap();
    assert_eq!(builder.builds(), 1);
}

#[test]
fn tar_gz_identical_trees_share_fingerprint() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    for root in [a.path().join("repo"), b.path().join("repo")] {
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/index.html"), b"<main></main>").unwrap();
    }

    let builder = TarGzArchiveBuilder::new();
    assert_eq!(
        builder.fingerprint(&a.path().join("repo")).unwrap(),
        builder.fingerprint(&b.path().join("repo")).unwrap()
    );
    assert_eq!(builder.extension(), "tar.gz");
}
