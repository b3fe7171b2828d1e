//! Outbound work-item payload consumed by the remediation worker.
//!
//! Field names and the `type` literal are a compatibility contract with the
//! worker; they serialize in camelCase exactly as declared here.

use serde::{Deserialize, Serialize};

/// Literal `type` value of every outbound work item.
pub const REMEDIATION_MESSAGE_TYPE: &str = "guidance:accessibility-remediation";

/// Where the source snapshot for a run lives in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotReference {
    pub bucket: String,
    pub object_key: String,
    pub size_bytes: u64,
    pub already_existed: bool,
}

/// One issue the worker should attempt under the message's aggregation key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueEntry {
    pub suggestion_id: String,
    pub issue_name: String,
    pub issue_description: String,
    pub target_selector: String,
    pub faulty_line: String,
    pub url: String,
}

/// A single work item: one message group, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub site_id: String,
    pub opportunity_id: String,
    pub audit_id: String,
    pub aggregation_key: String,
    pub url: String,
    pub time: String,
    pub suggestion_ids: Vec<String>,
    pub snapshot: SnapshotReference,
    pub issues: Vec<IssueEntry>,
}

impl OutboundMessage {
    /// Wire body as published to the queue.
    pub fn to_body(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutboundMessage {
        OutboundMessage {
            kind: REMEDIATION_MESSAGE_TYPE.to_string(),
            site_id: "site-1".into(),
            opportunity_id: "opp-1".into(),
            audit_id: "audit-1".into(),
            aggregation_key: "u|aria-roles|nav".into(),
            url: "https://x.test/".into(),
            time: "2026-01-01T00:00:00+00:00".into(),
            suggestion_ids: vec!["s-1".into()],
            snapshot: SnapshotReference {
                bucket: "bucket".into(),
                object_key: "tmp/codefix/source/repo-abc.tar.gz".into(),
                size_bytes: 42,
                already_existed: true,
            },
            issues: vec![IssueEntry {
                suggestion_id: "s-1".into(),
                issue_name: "aria-roles".into(),
                issue_description: "desc".into(),
                target_selector: "nav".into(),
                faulty_line: "<nav>".into(),
                url: "https://x.test/".into(),
            }],
        }
    }

    #[test]
    fn test_wire_field_names_are_stable() {
        let value: serde_json::Value = serde_json::from_str(&sample().to_body().unwrap()).unwrap();
        assert_eq!(value["type"], REMEDIATION_MESSAGE_TYPE);
        for field in [
            "siteId",
            "opportunityId",
            "auditId",
            "aggregationKey",
            "suggestionIds",
            "snapshot",
            "issues",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(value["snapshot"]["objectKey"], "tmp/codefix/source/repo-abc.tar.gz");
        assert_eq!(value["snapshot"]["sizeBytes"], 42);
        assert_eq!(value["snapshot"]["alreadyExisted"], true);
        assert_eq!(value["issues"][0]["targetSelector"], "nav");
        assert_eq!(value["issues"][0]["faultyLine"], "<nav>");
    }
}
