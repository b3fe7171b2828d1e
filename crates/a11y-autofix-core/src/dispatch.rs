//! Dispatch Confirmer.
//!
//! Shows every built payload, asks the operator once, then publishes the
//! messages one after another. A declined confirmation publishes nothing.
//! A failed publish is recorded and the remaining messages are still sent.
//!
//! ```text
//! Built -> AwaitingConfirmation -> Sending -> Finished
//!                               \-> Aborted
//! ```

use a11y_autofix_gateway::{OutboundMessage, WorkQueue};
use serde::Serialize;
use tracing::debug;

use crate::obs;
use crate::prompt::Prompter;

/// Dispatch lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Built,
    AwaitingConfirmation,
    Sending,
    Finished,
    Aborted,
}

impl DispatchState {
    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: DispatchState) -> bool {
        matches!(
            (self, next),
            (DispatchState::Built, DispatchState::AwaitingConfirmation)
                | (DispatchState::AwaitingConfirmation, DispatchState::Sending)
                | (DispatchState::AwaitingConfirmation, DispatchState::Aborted)
                | (DispatchState::Sending, DispatchState::Finished)
        )
    }
}

/// Outcome of publishing one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishOutcome {
    Sent { message_id: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRecord {
    pub aggregation_key: String,
    pub suggestion_ids: Vec<String>,
    pub outcome: PublishOutcome,
}

/// Per-message tally of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub state: DispatchState,
    pub records: Vec<DispatchRecord>,
}

impl DispatchReport {
    pub fn sent(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, PublishOutcome::Sent { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.sent()
    }

    pub fn is_aborted(&self) -> bool {
        self.state == DispatchState::Aborted
    }

    /// Finished with every message published, or aborted by the operator.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

pub struct DispatchConfirmer<'a> {
    queue: &'a dyn WorkQueue,
    prompter: &'a dyn Prompter,
}

impl<'a> DispatchConfirmer<'a> {
    pub fn new(queue: &'a dyn WorkQueue, prompter: &'a dyn Prompter) -> Self {
        Self { queue, prompter }
    }

    pub async fn confirm_and_send(&self, messages: &[OutboundMessage]) -> DispatchReport {
        let mut state = DispatchState::Built;
        advance(&mut state, DispatchState::AwaitingConfirmation);

        self.prompter.show(&preview(messages));
        let prompt = if messages.len() == 1 {
            "Send this message?".to_string()
        } else {
            format!("Send these {} messages?", messages.len())
        };
        if !self.prompter.confirm(&prompt) {
            advance(&mut state, DispatchState::Aborted);
            obs::emit_dispatch_aborted(messages.len());
            return DispatchReport {
                state,
                records: Vec::new(),
            };
        }

        advance(&mut state, DispatchState::Sending);
        let mut records = Vec::with_capacity(messages.len());
        for message in messages {
            let outcome = match self.queue.publish(message).await {
                Ok(message_id) => {
                    obs::emit_message_published(&message.aggregation_key, &message_id);
                    PublishOutcome::Sent { message_id }
                }
                Err(e) => {
                    obs::emit_message_publish_failed(&message.aggregation_key, &e);
                    PublishOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            records.push(DispatchRecord {
                aggregation_key: message.aggregation_key.clone(),
                suggestion_ids: message.suggestion_ids.clone(),
                outcome,
            });
        }
        advance(&mut state, DispatchState::Finished);

        let report = DispatchReport { state, records };
        obs::emit_dispatch_finished(report.sent(), report.failed());
        report
    }
}

fn advance(state: &mut DispatchState, next: DispatchState) {
    debug_assert!(state.can_transition_to(next), "{state:?} -> {next:?}");
    debug!(from = ?state, to = ?next, "dispatch state");
    *state = next;
}

/// Pretty-printed payloads, numbered when there is more than one.
pub fn preview(messages: &[OutboundMessage]) -> String {
    let render = |m: &OutboundMessage| {
        serde_json::to_string_pretty(m).unwrap_or_else(|e| format!("<unrenderable payload: {e}>"))
    };
    match messages {
        [single] => format!("Message to be sent:\n{}", render(single)),
        _ => messages
            .iter()
            .enumerate()
            .map(|(i, m)| format!("Message {}/{}:\n{}", i + 1, messages.len(), render(m)))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}
