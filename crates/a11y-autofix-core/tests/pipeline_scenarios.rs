//! End-to-end runs of the remediation pipeline against in-memory
//! collaborators.

use std::path::PathBuf;
use std::sync::Arc;

use a11y_autofix_core::{
    validate_selection, AutofixError, Collaborators, DispatchState, PublishOutcome,
    RemediationPipeline, ScriptedPrompter, SelectorFlags,
};
use a11y_autofix_gateway::fakes::{
    FakeArchiveBuilder, MemoryDirectory, MemoryObjectStore, MemoryWorkQueue,
};
use a11y_autofix_gateway::{Opportunity, Site, Suggestion, REMEDIATION_MESSAGE_TYPE};

struct Harness {
    directory: Arc<MemoryDirectory>,
    store: Arc<MemoryObjectStore>,
    queue: Arc<MemoryWorkQueue>,
    archiver: Arc<FakeArchiveBuilder>,
    prompter: Arc<ScriptedPrompter>,
    _repo: tempfile::TempDir,
    repo_path: PathBuf,
}

impl Harness {
    fn new(directory: MemoryDirectory, prompter: ScriptedPrompter) -> Self {
        Self::with(
            directory,
            MemoryObjectStore::new("assets"),
            MemoryWorkQueue::new(),
            FakeArchiveBuilder::new("feedfacecafebeef0011", b"archive-bytes"),
            prompter,
        )
    }

    fn with(
        directory: MemoryDirectory,
        store: MemoryObjectStore,
        queue: MemoryWorkQueue,
        archiver: FakeArchiveBuilder,
        prompter: ScriptedPrompter,
    ) -> Self {
        let repo = tempfile::tempdir().unwrap();
        let repo_path = repo.path().join("customer-site");
        std::fs::create_dir_all(&repo_path).unwrap();
        Self {
            directory: Arc::new(directory),
            store: Arc::new(store),
            queue: Arc::new(queue),
            archiver: Arc::new(archiver),
            prompter: Arc::new(prompter),
            _repo: repo,
            repo_path,
        }
    }

    fn pipeline(&self) -> RemediationPipeline {
        RemediationPipeline::new(Collaborators {
            directory: self.directory.clone(),
            store: self.store.clone(),
            queue: self.queue.clone(),
            archiver: self.archiver.clone(),
            prompter: self.prompter.clone(),
        })
    }
}

fn explicit_set_directory() -> MemoryDirectory {
    MemoryDirectory::new()
        .with_site(Site::new("S", "https://www.sunstargum.com"))
        .with_opportunity(Opportunity::new("O", "S", "accessibility", Some("audit-7")))
        .with_suggestions(
            "O",
            vec![
                Suggestion::new("X", "O", "https://www.sunstargum.com/|aria-roles|nav"),
                Suggestion::new("Y", "O", "https://www.sunstargum.com/|aria-roles|nav")
                    .with_change_type("CONTENT_UPDATE"),
                Suggestion::new("Z", "O", "https://www.sunstargum.com/|aria-roles|nav"),
            ],
        )
}

fn explicit_set_flags() -> SelectorFlags {
    SelectorFlags {
        site_id: Some("S".into()),
        opportunity_id: Some("O".into()),
        suggestion_ids: Some(vec!["X,Y".into(), "Z".into()]),
        ..Default::default()
    }
}

fn sunstargum_directory() -> MemoryDirectory {
    let url = "https://www.sunstargum.com/";
    MemoryDirectory::new()
        .with_site(Site::new("S", "https://www.sunstargum.com"))
        .with_site(Site::new("other", "https://example.org"))
        .with_opportunity(Opportunity::new("O", "S", "accessibility", Some("audit-1")))
        .with_suggestions(
            "O",
            vec![
                Suggestion::new("a1", "O", format!("{url}|aria-roles|k1")),
                Suggestion::new("c1", "O", format!("{url}|color-contrast|k3")),
                Suggestion::new("a2", "O", format!("{url}|aria-roles|k1")),
                Suggestion::new("a3", "O", format!("{url}|aria-roles|k2")),
                Suggestion::new("c2", "O", format!("{url}|color-contrast|k3")),
            ],
        )
}

#[tokio::test]
async fn explicit_set_sends_one_message_per_found_id() {
    let harness = Harness::new(
        explicit_set_directory(),
        ScriptedPrompter::new().with_confirmation(true),
    );
    let selection = validate_selection(&explicit_set_flags(), None).unwrap();

    let report = harness
        .pipeline()
        .run(&selection, &harness.repo_path)
        .await
        .unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains('Y'));
    assert_eq!(report.dispatch.state, DispatchState::Finished);
    assert_eq!(report.dispatch.sent(), 2);
    assert_eq!(report.exit_code(), 0);

    let published = harness.queue.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].1.suggestion_ids, vec!["X"]);
    assert_eq!(published[1].1.suggestion_ids, vec!["Z"]);
    assert_ne!(published[0].0, published[1].0);
    for (_, message) in &published {
        assert_eq!(message.kind, REMEDIATION_MESSAGE_TYPE);
        assert_eq!(message.audit_id, "audit-7");
        assert_eq!(message.site_id, "S");
    }
    let ids: Vec<String> = report
        .dispatch
        .records
        .iter()
        .map(|r| match &r.outcome {
            PublishOutcome::Sent { message_id } => message_id.clone(),
            PublishOutcome::Failed { error } => panic!("unexpected failure: {error}"),
        })
        .collect();
    assert_eq!(ids, vec!["msg-0", "msg-1"]);
}

#[tokio::test]
async fn by_issue_type_sends_one_message_per_aggregation_key() {
    // aria-roles has 3 members, so it is listed first.
    let harness = Harness::new(
        sunstargum_directory(),
        ScriptedPrompter::new()
            .with_selection(0)
            .with_confirmation(true),
    );
    let flags = SelectorFlags {
        name: Some("sunstargum".into()),
        send_by_issue_type: true,
        ..Default::default()
    };
    let selection = validate_selection(&flags, None).unwrap();

    let report = harness
        .pipeline()
        .run(&selection, &harness.repo_path)
        .await
        .unwrap();

    assert_eq!(report.site_id, "S");
    let published = harness.queue.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].1.aggregation_key, "https://www.sunstargum.com/|aria-roles|k1");
    assert_eq!(published[0].1.suggestion_ids, vec!["a1", "a2"]);
    assert_eq!(published[1].1.suggestion_ids, vec!["a3"]);
    assert_eq!(published[0].1.issues.len(), 2);
}

#[tokio::test]
async fn declining_publishes_nothing_and_exits_cleanly() {
    let harness = Harness::new(
        explicit_set_directory(),
        ScriptedPrompter::new().with_confirmation(false),
    );
    let selection = validate_selection(&explicit_set_flags(), None).unwrap();

    let report = harness
        .pipeline()
        .run(&selection, &harness.repo_path)
        .await
        .unwrap();

    assert!(report.dispatch.is_aborted());
    assert!(report.dispatch.records.is_empty());
    assert_eq!(harness.queue.attempts(), 0);
    assert_eq!(report.exit_code(), 0);
    assert!(harness.prompter.shown().iter().any(|s| s.contains("Message 1/2")));
}

#[tokio::test]
async fn failed_publish_does_not_stop_the_batch() {
    let harness = Harness::with(
        explicit_set_directory(),
        MemoryObjectStore::new("assets"),
        MemoryWorkQueue::new().failing_attempt(0),
        FakeArchiveBuilder::new("fp", b"tgz"),
        ScriptedPrompter::new().with_confirmation(true),
    );
    let selection = validate_selection(&explicit_set_flags(), None).unwrap();

    let report = harness
        .pipeline()
        .run(&selection, &harness.repo_path)
        .await
        .unwrap();

    assert_eq!(harness.queue.attempts(), 2);
    assert_eq!(report.dispatch.sent(), 1);
    assert_eq!(report.dispatch.failed(), 1);
    assert!(matches!(
        report.dispatch.records[0].outcome,
        PublishOutcome::Failed { .. }
    ));
    assert_ne!(report.exit_code(), 0);
}

#[tokio::test]
async fn second_run_reuses_the_snapshot() {
    let harness = Harness::new(
        explicit_set_directory(),
        ScriptedPrompter::new()
            .with_confirmation(true)
            .with_confirmation(true),
    );
    let selection = validate_selection(&explicit_set_flags(), None).unwrap();
    let pipeline = harness.pipeline();

    let first = pipeline.run(&selection, &harness.repo_path).await.unwrap();
    let second = pipeline.run(&selection, &harness.repo_path).await.unwrap();

    assert!(!first.snapshot.already_existed);
    assert!(second.snapshot.already_existed);
    assert_eq!(first.snapshot.object_key, second.snapshot.object_key);
    assert_eq!(
        first.snapshot.object_key,
        "tmp/codefix/source/customer-site-feedfacecafebeef.tar.gz"
    );
    assert_eq!(harness.store.puts(), 1);
    assert_eq!(harness.archiver.builds(), 1);
    assert_ne!(first.invocation_id, second.invocation_id);
}

#[tokio::test]
async fn resolution_failure_leaves_store_untouched() {
    let harness = Harness::new(
        explicit_set_directory(),
        ScriptedPrompter::new().with_confirmation(true),
    );
    let flags = SelectorFlags {
        site_id: Some("S".into()),
        opportunity_id: Some("O".into()),
        suggestion_ids: Some(vec!["nope".into()]),
        ..Default::default()
    };
    let selection = validate_selection(&flags, None).unwrap();

    let err = harness
        .pipeline()
        .run(&selection, &harness.repo_path)
        .await
        .unwrap_err();

    assert!(matches!(err, AutofixError::NoEligibleSuggestions { .. }));
    assert_eq!(harness.store.puts(), 0);
    assert_eq!(harness.archiver.builds(), 0);
    assert_eq!(harness.queue.attempts(), 0);
}

#[tokio::test]
async fn staging_failure_builds_no_messages() {
    let harness = Harness::with(
        explicit_set_directory(),
        MemoryObjectStore::new("assets").failing_puts("ExpiredToken: The provided token has expired."),
        MemoryWorkQueue::new(),
        FakeArchiveBuilder::new("fp", b"tgz"),
        ScriptedPrompter::new().with_confirmation(true),
    );
    let selection = validate_selection(&explicit_set_flags(), None).unwrap();

    let err = harness
        .pipeline()
        .run(&selection, &harness.repo_path)
        .await
        .unwrap_err();

    assert!(matches!(err, AutofixError::UploadFailed(_)));
    assert!(err.to_string().contains("ExpiredToken: The provided token has expired."));
    assert!(!harness.prompter.shown().iter().any(|s| s.contains("Message")));
    assert_eq!(harness.queue.attempts(), 0);
}

#[tokio::test]
async fn missing_pinned_archive_lists_available_ones() {
    let harness = Harness::with(
        explicit_set_directory(),
        MemoryObjectStore::new("assets").with_object("tmp/codefix/source/older.tar.gz", b"old"),
        MemoryWorkQueue::new(),
        FakeArchiveBuilder::new("fp", b"tgz"),
        ScriptedPrompter::new().with_confirmation(true),
    );
    let mut flags = explicit_set_flags();
    flags.archive = Some("missing.tar.gz".into());
    let selection = validate_selection(&flags, None).unwrap();

    let err = harness
        .pipeline()
        .run(&selection, &harness.repo_path)
        .await
        .unwrap_err();

    match err {
        AutofixError::ArchiveNotFound { key, available } => {
            assert_eq!(key, "tmp/codefix/source/missing.tar.gz");
            assert_eq!(available, vec!["tmp/codefix/source/older.tar.gz"]);
        }
        other => panic!("expected ArchiveNotFound, got {other:?}"),
    }
    assert_eq!(harness.archiver.builds(), 0);
}

#[tokio::test]
async fn ambiguous_name_without_terminal_fails() {
    let directory = sunstargum_directory().with_site(Site::new("S2", "https://shop.sunstargum.com"));
    let harness = Harness::new(directory, ScriptedPrompter::non_interactive());
    let flags = SelectorFlags {
        name: Some("SunstarGum".into()),
        ..Default::default()
    };
    let selection = validate_selection(&flags, None).unwrap();

    let err = harness
        .pipeline()
        .run(&selection, &harness.repo_path)
        .await
        .unwrap_err();

    match err {
        AutofixError::AmbiguousSiteName { candidates, .. } => assert_eq!(candidates.len(), 2),
        other => panic!("expected AmbiguousSiteName, got {other:?}"),
    }
    assert_eq!(harness.store.puts(), 0);
}

#[tokio::test]
async fn out_of_range_issue_type_pick_cancels_the_run() {
    let url = "https://www.sunstargum.com/";
    let directory = MemoryDirectory::new()
        .with_site(Site::new("S", "https://www.sunstargum.com"))
        .with_opportunity(Opportunity::new("O", "S", "accessibility", Some("audit-1")))
        .with_suggestions(
            "O",
            vec![
                Suggestion::new("a1", "O", format!("{url}|aria-roles|k1")).with_status("FIXED"),
                Suggestion::new("c1", "O", format!("{url}|color-contrast|k3")),
            ],
        );
    // Only color-contrast is listed, and an out-of-range pick cancels.
    let harness = Harness::new(directory, ScriptedPrompter::new().with_selection(3));
    let flags = SelectorFlags {
        site_id: Some("S".into()),
        send_by_issue_type: true,
        ..Default::default()
    };
    let selection = validate_selection(&flags, None).unwrap();

    let err = harness
        .pipeline()
        .run(&selection, &harness.repo_path)
        .await
        .unwrap_err();

    assert!(matches!(err, AutofixError::SelectionCancelled(_)));
    assert_eq!(harness.queue.attempts(), 0);
}

#[tokio::test]
async fn send_all_issues_for_explicit_suggestion_merges_its_key() {
    let harness = Harness::new(
        explicit_set_directory(),
        ScriptedPrompter::new().with_confirmation(true),
    );
    let flags = SelectorFlags {
        site_id: Some("S".into()),
        opportunity_id: Some("O".into()),
        suggestion_id: Some("Z".into()),
        send_all_issues: true,
        ..Default::default()
    };
    let selection = validate_selection(&flags, None).unwrap();

    harness
        .pipeline()
        .run(&selection, &harness.repo_path)
        .await
        .unwrap();

    let published = harness.queue.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].1.suggestion_ids, vec!["X", "Z"]);
}
