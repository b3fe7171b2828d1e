//! Error taxonomy for the remediation engine.
//!
//! Usage and resolution errors abort before any side effect; staging errors
//! abort before any message exists. Per-message publish failures are not
//! errors here: they are outcomes recorded by the dispatch report.

use a11y_autofix_gateway::Site;

use crate::resolver::MAX_SITE_CANDIDATES;
use crate::selector::FlagViolation;

/// Engine errors.
#[derive(Debug, thiserror::Error)]
pub enum AutofixError {
    #[error("invalid selector combination:\n{}", render_violations(.0))]
    InvalidSelectorCombination(Vec<FlagViolation>),

    #[error("missing configuration: {}", .0.join(", "))]
    Configuration(Vec<String>),

    #[error("no site matches '{query}'")]
    SiteNotFound { query: String },

    #[error("'{query}' matches {} sites:\n{}", .candidates.len(), render_sites(.candidates))]
    AmbiguousSiteName { query: String, candidates: Vec<Site> },

    #[error("opportunity {opportunity_id} not found on site {site_id}: {reason}")]
    OpportunityNotFound {
        site_id: String,
        opportunity_id: String,
        reason: String,
    },

    #[error("no eligible suggestions: {context}")]
    NoEligibleSuggestions { context: String },

    #[error("selection cancelled: {0}")]
    SelectionCancelled(String),

    #[error("catalog request failed: {0}")]
    Directory(String),

    #[error("archive build failed: {0}")]
    ArchiveBuildFailed(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("archive not found: {key}{}", render_available(.available))]
    ArchiveNotFound { key: String, available: Vec<String> },

    #[error("message is missing required field: {0}")]
    MissingField(&'static str),
}

impl AutofixError {
    /// Whether the error was raised before any network call.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            AutofixError::InvalidSelectorCombination(_) | AutofixError::Configuration(_)
        )
    }
}

fn render_violations(violations: &[FlagViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_sites(sites: &[Site]) -> String {
    let mut lines: Vec<String> = sites
        .iter()
        .take(MAX_SITE_CANDIDATES)
        .map(|s| format!("  - {} ({})", s.base_url, s.id))
        .collect();
    if sites.len() > MAX_SITE_CANDIDATES {
        lines.push(format!(
            "  ... and {} more; refine the name",
            sites.len() - MAX_SITE_CANDIDATES
        ));
    }
    lines.join("\n")
}

fn render_available(keys: &[String]) -> String {
    if keys.is_empty() {
        return String::new();
    }
    let listed = keys
        .iter()
        .map(|k| format!("  - {k}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\navailable archives:\n{listed}")
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, AutofixError>;
