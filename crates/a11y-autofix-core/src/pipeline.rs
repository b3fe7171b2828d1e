//! End-to-end run: resolve, pick, group, stage, build, confirm, send.
//!
//! Side effects are ordered so that a failure in one stage leaves nothing
//! behind from later ones: no upload happens before resolution and grouping
//! succeed, and no message exists before the snapshot is staged. The tree is
//! fingerprinted while the catalog is queried since that step only reads.

use std::path::Path;
use std::sync::Arc;

use a11y_autofix_gateway::{ArchiveBuilder, Directory, ObjectStore, SnapshotReference, WorkQueue};
use chrono::Utc;
use serde::Serialize;
use tracing::{warn, Instrument};

use crate::dispatch::{DispatchConfirmer, DispatchReport};
use crate::error::{AutofixError, Result};
use crate::grouping::{group, BatchPolicy};
use crate::message::MessageBuilder;
use crate::obs::{self, InvocationSpan};
use crate::picker::plan_grouping;
use crate::prompt::Prompter;
use crate::resolver::SuggestionResolver;
use crate::selector::Selection;
use crate::snapshot::{SnapshotSource, SnapshotStager};

/// Everything a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn Directory>,
    pub store: Arc<dyn ObjectStore>,
    pub queue: Arc<dyn WorkQueue>,
    pub archiver: Arc<dyn ArchiveBuilder>,
    pub prompter: Arc<dyn Prompter>,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub invocation_id: String,
    pub site_id: String,
    pub site_url: String,
    pub warnings: Vec<String>,
    pub snapshot: SnapshotReference,
    pub dispatch: DispatchReport,
}

impl RunReport {
    /// Process exit code: zero unless a publish failed.
    pub fn exit_code(&self) -> i32 {
        if self.dispatch.is_success() {
            0
        } else {
            1
        }
    }
}

pub struct RemediationPipeline {
    collaborators: Collaborators,
}

impl RemediationPipeline {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    pub async fn run(&self, selection: &Selection, repo_path: &Path) -> Result<RunReport> {
        let invocation = InvocationSpan::new();
        self.run_inner(selection, repo_path, invocation.invocation_id())
            .instrument(invocation.span())
            .await
    }

    async fn run_inner(
        &self,
        selection: &Selection,
        repo_path: &Path,
        invocation_id: &str,
    ) -> Result<RunReport> {
        let Collaborators {
            directory,
            store,
            queue,
            archiver,
            prompter,
        } = &self.collaborators;

        obs::emit_selection_validated(selection.selector.kind(), selection.mode.as_str());

        let resolver = SuggestionResolver::new(directory.as_ref(), prompter.as_ref());
        let stager = SnapshotStager::new(Arc::clone(store), Arc::clone(archiver));
        let fingerprint = async {
            match selection.snapshot {
                SnapshotSource::Pinned(_) => Ok(None),
                _ => stager.prepare(repo_path).await.map(Some),
            }
        };
        let (resolution, prepared) =
            tokio::join!(resolver.resolve(&selection.selector), fingerprint);
        let resolution = resolution?;

        for warning in &resolution.warnings {
            warn!(event = "resolution.warning", warning = %warning);
            prompter.show(&format!("warning: {warning}"));
        }
        obs::emit_resolution_finished(
            &resolution.site.id,
            resolution.pool.len(),
            resolution.warnings.len(),
        );

        let plan = plan_grouping(&resolution, selection, prompter.as_ref())?;
        let groups = group(&plan.input, &plan.policy);
        if groups.is_empty() {
            return Err(AutofixError::NoEligibleSuggestions {
                context: describe_empty(&plan.policy),
            });
        }
        obs::emit_grouping_finished(
            groups.len(),
            groups.iter().map(|g| g.suggestions.len()).sum(),
        );

        let snapshot = match prepared? {
            Some(plan) => {
                let force = selection.snapshot == SnapshotSource::ForceUpload;
                stager.stage_prepared(&plan, force).await?
            }
            None => stager.stage(repo_path, &selection.snapshot).await?,
        };
        obs::emit_snapshot_staged(
            &snapshot.object_key,
            snapshot.size_bytes,
            snapshot.already_existed,
        );

        let messages = MessageBuilder::new(Utc::now()).build_all(&groups, &snapshot)?;
        let dispatch = DispatchConfirmer::new(queue.as_ref(), prompter.as_ref())
            .confirm_and_send(&messages)
            .await;

        Ok(RunReport {
            invocation_id: invocation_id.to_string(),
            site_id: resolution.site.id,
            site_url: resolution.site.base_url,
            warnings: resolution.warnings.iter().map(ToString::to_string).collect(),
            snapshot,
            dispatch,
        })
    }
}

fn describe_empty(policy: &BatchPolicy) -> String {
    match policy {
        BatchPolicy::SingleSuggestion { chosen } | BatchPolicy::AllIssuesForSuggestion { chosen } => {
            format!("suggestion {chosen} is not in the eligible pool")
        }
        BatchPolicy::ByIssueType { issue_type } => {
            format!("no eligible suggestion has issue type {issue_type}")
        }
        BatchPolicy::ExplicitIdSet { ids } => {
            format!("none of {} is in the eligible pool", ids.join(", "))
        }
    }
}
