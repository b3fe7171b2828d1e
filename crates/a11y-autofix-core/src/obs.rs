//! Structured lifecycle events for one autofix invocation.
//!
//! Every run is instrumented with an [`InvocationSpan`] so all of its log lines
//! carry the same `invocation_id`. The `emit_*` functions log one named
//! event each (`event = "..."`), which keeps the lines greppable in both
//! text and JSON output.

use tracing::{info, warn};
use uuid::Uuid;

/// Invocation-scoped span. Attach it to the run future with
/// [`tracing::Instrument`] so the id follows the run across await points.
#[derive(Debug, Clone)]
pub struct InvocationSpan {
    invocation_id: String,
    span: tracing::Span,
}

impl InvocationSpan {
    /// A span tagged with a fresh random invocation id.
    pub fn new() -> Self {
        Self::with_id(&Uuid::new_v4().to_string())
    }

    pub fn with_id(invocation_id: &str) -> Self {
        let span = tracing::info_span!("a11y_autofix.invocation", invocation_id = %invocation_id);
        Self {
            invocation_id: invocation_id.to_string(),
            span,
        }
    }

    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    pub fn span(&self) -> tracing::Span {
        self.span.clone()
    }
}

impl Default for InvocationSpan {
    fn default() -> Self {
        Self::new()
    }
}

pub fn emit_selection_validated(selector: &str, mode: &str) {
    info!(event = "selection.validated", selector = %selector, mode = %mode);
}

/// Resolution finished: the chosen site, the eligible pool size and the
/// number of non-fatal warnings.
pub fn emit_resolution_finished(site_id: &str, eligible: usize, warnings: usize) {
    info!(
        event = "resolution.finished",
        site_id = %site_id,
        eligible = eligible,
        warnings = warnings,
    );
}

pub fn emit_grouping_finished(groups: usize, suggestions: usize) {
    info!(event = "grouping.finished", groups = groups, suggestions = suggestions);
}

pub fn emit_snapshot_staged(object_key: &str, size_bytes: u64, already_existed: bool) {
    info!(
        event = "snapshot.staged",
        object_key = %object_key,
        size_bytes = size_bytes,
        already_existed = already_existed,
    );
}

pub fn emit_message_published(aggregation_key: &str, message_id: &str) {
    info!(
        event = "message.published",
        aggregation_key = %aggregation_key,
        message_id = %message_id,
    );
}

/// Publish failure (warning level). The run continues with the next message.
pub fn emit_message_publish_failed(aggregation_key: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "message.publish_failed",
        aggregation_key = %aggregation_key,
        error = %error,
    );
}

pub fn emit_dispatch_aborted(messages: usize) {
    info!(event = "dispatch.aborted", messages = messages);
}

pub fn emit_dispatch_finished(sent: usize, failed: usize) {
    info!(event = "dispatch.finished", sent = sent, failed = failed);
}
