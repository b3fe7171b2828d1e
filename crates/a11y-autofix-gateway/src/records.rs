//! Catalog records: sites, opportunities and suggestions.
//!
//! `Site` and `Opportunity` deserialize straight from the catalog's JSON.
//! Suggestions arrive as a loosely-shaped [`SuggestionRecord`] and are
//! normalized into [`Suggestion`] so the engine never has to care where a
//! selector or faulty line was found in the payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opportunity type handled by the remediation worker.
pub const ACCESSIBILITY_OPPORTUNITY: &str = "accessibility";

/// A customer site in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    #[serde(rename = "baseURL", default)]
    pub base_url: String,
}

impl Site {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
        }
    }
}

/// An audit finding container; suggestions hang off it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    #[serde(default)]
    pub site_id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub audit_id: Option<String>,
}

impl Opportunity {
    pub fn new(
        id: impl Into<String>,
        site_id: impl Into<String>,
        kind: impl Into<String>,
        audit_id: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            site_id: site_id.into(),
            kind: kind.into(),
            audit_id: audit_id.map(str::to_string),
        }
    }

    /// Whether the remediation worker can act on this opportunity.
    pub fn is_accessibility(&self) -> bool {
        self.kind.eq_ignore_ascii_case(ACCESSIBILITY_OPPORTUNITY)
    }
}

/// Why a suggestion cannot be sent to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    NotCodeChange,
    NotNew,
    MissingAggregationKey,
}

impl std::fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ineligibility::NotCodeChange => write!(f, "change type is not {}", Suggestion::CODE_CHANGE),
            Ineligibility::NotNew => write!(f, "status is not {}", Suggestion::STATUS_NEW),
            Ineligibility::MissingAggregationKey => write!(f, "aggregation key is empty"),
        }
    }
}

/// A normalized remediation suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub opportunity_id: String,
    pub issue_type: String,
    pub aggregation_key: String,
    pub status: String,
    pub change_type: String,
    pub target_selector: String,
    pub faulty_line: String,
    pub url: String,
    pub issue_description: String,
}

impl Suggestion {
    pub const CODE_CHANGE: &'static str = "CODE_CHANGE";
    pub const STATUS_NEW: &'static str = "NEW";

    /// An eligible `CODE_CHANGE`/`NEW` suggestion whose issue type and
    /// selector are derived from `aggregation_key` (`url|issue_type|selector`).
    pub fn new(
        id: impl Into<String>,
        opportunity_id: impl Into<String>,
        aggregation_key: impl Into<String>,
    ) -> Self {
        let aggregation_key = aggregation_key.into();
        Self {
            id: id.into(),
            opportunity_id: opportunity_id.into(),
            issue_type: issue_type_of(&aggregation_key),
            target_selector: key_segment(&aggregation_key, 2).unwrap_or_default().to_string(),
            url: key_segment(&aggregation_key, 0).unwrap_or_default().to_string(),
            aggregation_key,
            status: Self::STATUS_NEW.to_string(),
            change_type: Self::CODE_CHANGE.to_string(),
            faulty_line: String::new(),
            issue_description: String::new(),
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn with_change_type(mut self, change_type: &str) -> Self {
        self.change_type = change_type.to_string();
        self
    }

    pub fn with_faulty_line(mut self, faulty_line: &str) -> Self {
        self.faulty_line = faulty_line.to_string();
        self
    }

    /// First reason this suggestion is ineligible, if any.
    pub fn ineligibility(&self) -> Option<Ineligibility> {
        if self.change_type != Self::CODE_CHANGE {
            Some(Ineligibility::NotCodeChange)
        } else if self.status != Self::STATUS_NEW {
            Some(Ineligibility::NotNew)
        } else if self.aggregation_key.trim().is_empty() {
            Some(Ineligibility::MissingAggregationKey)
        } else {
            None
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.ineligibility().is_none()
    }
}

/// Issue type encoded in an aggregation key, or `"unknown"`.
pub fn issue_type_of(aggregation_key: &str) -> String {
    key_segment(aggregation_key, 1)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn key_segment(aggregation_key: &str, index: usize) -> Option<&str> {
    // A key without any `|` is opaque: no url, type or selector in it.
    let parts: Vec<&str> = aggregation_key.split('|').collect();
    if parts.len() <= index.max(1) {
        return None;
    }
    parts.get(index).copied()
}

/// Raw suggestion as served by the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRecord {
    pub id: String,
    #[serde(default)]
    pub opportunity_id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: Value,
}

impl SuggestionRecord {
    /// Normalize into a [`Suggestion`] belonging to `opportunity_id`.
    pub fn normalize(self, opportunity_id: &str) -> Suggestion {
        let data = &self.data;
        let aggregation_key = str_field(data, &["aggregationKey", "aggregation_key"]);

        let mut target_selector = str_field(data, &["targetSelector", "target_selector"]);
        let mut faulty_line = str_field(data, &["faultyLine", "faulty_line"]);

        if target_selector.is_empty() || faulty_line.is_empty() {
            let first_html = data
                .get("issues")
                .and_then(|v| v.get(0))
                .and_then(|v| v.get("htmlWithIssues"))
                .and_then(|v| v.get(0));
            if let Some(html) = first_html {
                if target_selector.is_empty() {
                    target_selector = str_field(html, &["target_selector", "targetSelector"]);
                }
                if faulty_line.is_empty() {
                    faulty_line = str_field(html, &["update_from", "updateFrom"]);
                }
            }
        }

        if target_selector.is_empty() {
            target_selector = key_segment(&aggregation_key, 2)
                .unwrap_or_default()
                .to_string();
        }

        Suggestion {
            opportunity_id: self
                .opportunity_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| opportunity_id.to_string()),
            issue_type: issue_type_of(&aggregation_key),
            url: str_field(data, &["url"]),
            issue_description: str_field(data, &["issueDescription", "issue_description"]),
            id: self.id,
            aggregation_key,
            status: self.status,
            change_type: self.kind,
            target_selector,
            faulty_line,
        }
    }
}

fn str_field(value: &Value, names: &[&str]) -> String {
    names
        .iter()
        .filter_map(|name| value.get(*name).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}
