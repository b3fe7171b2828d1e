//! Message Builder: one [`OutboundMessage`] per [`MessageGroup`].

use a11y_autofix_gateway::{IssueEntry, OutboundMessage, SnapshotReference, REMEDIATION_MESSAGE_TYPE};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{AutofixError, Result};
use crate::grouping::MessageGroup;

pub struct MessageBuilder {
    issued_at: DateTime<Utc>,
}

impl MessageBuilder {
    /// Builder stamping every message with `issued_at`.
    pub fn new(issued_at: DateTime<Utc>) -> Self {
        Self { issued_at }
    }

    /// Build the payload for `group`. Pure; a missing identifier is a
    /// [`AutofixError::MissingField`].
    pub fn build(&self, group: &MessageGroup, snapshot: &SnapshotReference) -> Result<OutboundMessage> {
        let first = group
            .suggestions
            .first()
            .ok_or(AutofixError::MissingField("suggestionIds"))?;
        let site_id = non_empty(&group.opportunity.site_id).ok_or(AutofixError::MissingField("siteId"))?;
        let opportunity_id =
            non_empty(&group.opportunity.id).ok_or(AutofixError::MissingField("opportunityId"))?;
        let audit_id = group
            .opportunity
            .audit_id
            .as_deref()
            .and_then(non_empty)
            .ok_or(AutofixError::MissingField("auditId"))?;
        let aggregation_key =
            non_empty(&group.aggregation_key).ok_or(AutofixError::MissingField("aggregationKey"))?;

        let issues = group
            .suggestions
            .iter()
            .map(|s| IssueEntry {
                suggestion_id: s.id.clone(),
                issue_name: s.issue_type.clone(),
                issue_description: if s.issue_description.trim().is_empty() {
                    format!("Accessibility issue: {}", s.issue_type)
                } else {
                    s.issue_description.clone()
                },
                target_selector: s.target_selector.clone(),
                faulty_line: s.faulty_line.clone(),
                url: s.url.clone(),
            })
            .collect();

        Ok(OutboundMessage {
            kind: REMEDIATION_MESSAGE_TYPE.to_string(),
            site_id: site_id.to_string(),
            opportunity_id: opportunity_id.to_string(),
            audit_id: audit_id.to_string(),
            aggregation_key: aggregation_key.to_string(),
            url: first.url.clone(),
            time: self.issued_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            suggestion_ids: group.suggestion_ids(),
            snapshot: snapshot.clone(),
            issues,
        })
    }

    pub fn build_all(
        &self,
        groups: &[MessageGroup],
        snapshot: &SnapshotReference,
    ) -> Result<Vec<OutboundMessage>> {
        groups.iter().map(|g| self.build(g, snapshot)).collect()
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
