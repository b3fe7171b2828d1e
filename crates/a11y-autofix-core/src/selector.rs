//! Selector validation.
//!
//! Checks the raw command-line selector flags against the [`COMPATIBILITY`]
//! rule table and turns an accepted combination into a [`Selection`]: one of
//! five selector shapes, a batch mode, and a snapshot source. Every violated
//! rule is collected so the operator sees the whole problem at once.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::{AutofixError, Result};
use crate::snapshot::SnapshotSource;

/// A selector flag as it appears on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flag {
    Name,
    SiteId,
    OpportunityId,
    SuggestionId,
    SuggestionIds,
    SendAllIssues,
    SendByIssueType,
    SendByAggregationKey,
    Archive,
    ForceUpload,
}

impl Flag {
    pub fn as_arg(&self) -> &'static str {
        match self {
            Flag::Name => "--name",
            Flag::SiteId => "--site-id",
            Flag::OpportunityId => "--opportunity-id",
            Flag::SuggestionId => "--suggestion-id",
            Flag::SuggestionIds => "--suggestion-ids",
            Flag::SendAllIssues => "--send-all-issues",
            Flag::SendByIssueType => "--send-by-issue-type",
            Flag::SendByAggregationKey => "--send-by-aggregation-key",
            Flag::Archive => "--archive",
            Flag::ForceUpload => "--force-upload",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// One rule of the flag compatibility table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagRule {
    /// The two flags cannot be given together.
    Excludes(Flag, Flag),
    /// The first flag needs the second.
    Requires(Flag, Flag),
    /// At least one of these flags must be given.
    AnyOf(&'static [Flag]),
    /// When given, the flag must carry a non-blank value.
    NonEmpty(Flag),
}

/// The flag compatibility table.
pub const COMPATIBILITY: &[FlagRule] = &[
    FlagRule::AnyOf(&[Flag::Name, Flag::SiteId]),
    FlagRule::Excludes(Flag::Name, Flag::SiteId),
    FlagRule::Excludes(Flag::Name, Flag::OpportunityId),
    FlagRule::Requires(Flag::OpportunityId, Flag::SiteId),
    FlagRule::Requires(Flag::SuggestionId, Flag::SiteId),
    FlagRule::Requires(Flag::SuggestionId, Flag::OpportunityId),
    FlagRule::Requires(Flag::SuggestionIds, Flag::SiteId),
    FlagRule::Requires(Flag::SuggestionIds, Flag::OpportunityId),
    FlagRule::Excludes(Flag::SuggestionId, Flag::SuggestionIds),
    FlagRule::Excludes(Flag::SuggestionId, Flag::SendByIssueType),
    FlagRule::Excludes(Flag::SuggestionIds, Flag::SendAllIssues),
    FlagRule::Excludes(Flag::SuggestionIds, Flag::SendByIssueType),
    FlagRule::Excludes(Flag::SendByIssueType, Flag::SendAllIssues),
    FlagRule::Excludes(Flag::SendByAggregationKey, Flag::SendAllIssues),
    FlagRule::Excludes(Flag::SendByAggregationKey, Flag::SendByIssueType),
    FlagRule::Excludes(Flag::SendByAggregationKey, Flag::SuggestionId),
    FlagRule::Excludes(Flag::SendByAggregationKey, Flag::SuggestionIds),
    FlagRule::Excludes(Flag::Archive, Flag::ForceUpload),
    FlagRule::NonEmpty(Flag::Name),
    FlagRule::NonEmpty(Flag::SiteId),
    FlagRule::NonEmpty(Flag::OpportunityId),
    FlagRule::NonEmpty(Flag::SuggestionId),
    FlagRule::NonEmpty(Flag::SuggestionIds),
    FlagRule::NonEmpty(Flag::Archive),
];

/// Raw selector flags, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorFlags {
    pub name: Option<String>,
    pub site_id: Option<String>,
    pub opportunity_id: Option<String>,
    pub suggestion_id: Option<String>,
    /// Raw `--suggestion-ids` tokens; each may hold several comma-separated ids.
    pub suggestion_ids: Option<Vec<String>>,
    pub send_all_issues: bool,
    pub send_by_issue_type: bool,
    pub send_by_aggregation_key: bool,
    pub archive: Option<String>,
    pub force_upload: bool,
}

impl SelectorFlags {
    /// Whether the flag was given at all, blank or not.
    pub fn is_set(&self, flag: Flag) -> bool {
        match flag {
            Flag::Name => self.name.is_some(),
            Flag::SiteId => self.site_id.is_some(),
            Flag::OpportunityId => self.opportunity_id.is_some(),
            Flag::SuggestionId => self.suggestion_id.is_some(),
            Flag::SuggestionIds => self.suggestion_ids.is_some(),
            Flag::SendAllIssues => self.send_all_issues,
            Flag::SendByIssueType => self.send_by_issue_type,
            Flag::SendByAggregationKey => self.send_by_aggregation_key,
            Flag::Archive => self.archive.is_some(),
            Flag::ForceUpload => self.force_upload,
        }
    }

    fn has_value(&self, flag: Flag) -> bool {
        let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
        match flag {
            Flag::Name => !blank(&self.name),
            Flag::SiteId => !blank(&self.site_id),
            Flag::OpportunityId => !blank(&self.opportunity_id),
            Flag::SuggestionId => !blank(&self.suggestion_id),
            Flag::SuggestionIds => match &self.suggestion_ids {
                Some(tokens) => !parse_suggestion_ids(tokens).is_empty(),
                None => true,
            },
            Flag::Archive => !blank(&self.archive),
            _ => true,
        }
    }

    /// Flags that were given, in table order.
    pub fn given(&self) -> Vec<Flag> {
        [
            Flag::Name,
            Flag::SiteId,
            Flag::OpportunityId,
            Flag::SuggestionId,
            Flag::SuggestionIds,
            Flag::SendAllIssues,
            Flag::SendByIssueType,
            Flag::SendByAggregationKey,
            Flag::Archive,
            Flag::ForceUpload,
        ]
        .into_iter()
        .filter(|f| self.is_set(*f))
        .collect()
    }
}

/// A single violated compatibility rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagViolation {
    pub rule: FlagRule,
    pub reason: String,
}

impl FlagViolation {
    pub fn new(rule: FlagRule, reason: impl Into<String>) -> Self {
        Self {
            rule,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FlagViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Which suggestions a run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    ByName(String),
    BySiteId(String),
    BySiteAndOpportunity {
        site_id: String,
        opportunity_id: String,
    },
    ExplicitSuggestion {
        site_id: String,
        opportunity_id: String,
        suggestion_id: String,
    },
    ExplicitSuggestionSet {
        site_id: String,
        opportunity_id: String,
        suggestion_ids: Vec<String>,
    },
}

impl Selector {
    pub fn kind(&self) -> &'static str {
        match self {
            Selector::ByName(_) => "by_name",
            Selector::BySiteId(_) => "by_site_id",
            Selector::BySiteAndOpportunity { .. } => "by_site_and_opportunity",
            Selector::ExplicitSuggestion { .. } => "explicit_suggestion",
            Selector::ExplicitSuggestionSet { .. } => "explicit_suggestion_set",
        }
    }

    /// Explicitly requested suggestion ids, in request order.
    pub fn requested_ids(&self) -> Option<Vec<String>> {
        match self {
            Selector::ExplicitSuggestion { suggestion_id, .. } => {
                Some(vec![suggestion_id.clone()])
            }
            Selector::ExplicitSuggestionSet { suggestion_ids, .. } => Some(suggestion_ids.clone()),
            _ => None,
        }
    }
}

/// How chosen suggestions are batched into messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    SingleSuggestion,
    AllIssuesForSuggestion,
    ByIssueType,
    ExplicitIdSet,
}

impl BatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchMode::SingleSuggestion => "single_suggestion",
            BatchMode::AllIssuesForSuggestion => "all_issues_for_suggestion",
            BatchMode::ByIssueType => "by_issue_type",
            BatchMode::ExplicitIdSet => "explicit_id_set",
        }
    }
}

/// What the operator picks interactively when no suggestion id was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickBy {
    Suggestion,
    IssueType,
    AggregationKey,
}

/// A validated selector with its batching and snapshot choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub selector: Selector,
    pub mode: BatchMode,
    pub pick_by: Option<PickBy>,
    pub snapshot: SnapshotSource,
}

/// Split `--suggestion-ids` tokens on commas and whitespace, dropping blanks
/// and repeated ids while keeping first-seen order.
pub fn parse_suggestion_ids(tokens: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .iter()
        .flat_map(|t| t.split(|c: char| c == ',' || c.is_whitespace()))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

/// Check `flags` against `rules`, returning every violation.
pub fn check_flags(flags: &SelectorFlags, rules: &[FlagRule]) -> Vec<FlagViolation> {
    rules
        .iter()
        .filter_map(|rule| check_rule(rule, flags))
        .collect()
}

fn check_rule(rule: &FlagRule, flags: &SelectorFlags) -> Option<FlagViolation> {
    match *rule {
        FlagRule::Excludes(a, b) if flags.is_set(a) && flags.is_set(b) => Some(
            FlagViolation::new(*rule, format!("{a} cannot be combined with {b}")),
        ),
        FlagRule::Requires(a, b) if flags.is_set(a) && !flags.is_set(b) => {
            Some(FlagViolation::new(*rule, format!("{a} requires {b}")))
        }
        FlagRule::AnyOf(options) if !options.iter().any(|f| flags.is_set(*f)) => {
            let names: Vec<&str> = options.iter().map(Flag::as_arg).collect();
            Some(FlagViolation::new(
                *rule,
                format!("one of {} is required", names.join(" or ")),
            ))
        }
        FlagRule::NonEmpty(flag) if flags.is_set(flag) && !flags.has_value(flag) => Some(
            FlagViolation::new(*rule, format!("{flag} must not be empty")),
        ),
        _ => None,
    }
}

/// Validate the raw flags and build the [`Selection`] they describe.
///
/// `archive_override` is the configured default archive name; an explicit
/// `--archive` takes precedence and `--force-upload` ignores it.
pub fn validate_selection(
    flags: &SelectorFlags,
    archive_override: Option<&str>,
) -> Result<Selection> {
    let violations = check_flags(flags, COMPATIBILITY);
    if !violations.is_empty() {
        return Err(AutofixError::InvalidSelectorCombination(violations));
    }

    let text = |v: &Option<String>| v.as_deref().map(|s| s.trim().to_string());
    let ids = flags.suggestion_ids.as_deref().map(parse_suggestion_ids);

    let selector = match (
        text(&flags.name),
        text(&flags.site_id),
        text(&flags.opportunity_id),
        text(&flags.suggestion_id),
        ids,
    ) {
        (Some(name), None, None, None, None) => Selector::ByName(name),
        (None, Some(site_id), None, None, None) => Selector::BySiteId(site_id),
        (None, Some(site_id), Some(opportunity_id), None, None) => {
            Selector::BySiteAndOpportunity {
                site_id,
                opportunity_id,
            }
        }
        (None, Some(site_id), Some(opportunity_id), Some(suggestion_id), None) => {
            Selector::ExplicitSuggestion {
                site_id,
                opportunity_id,
                suggestion_id,
            }
        }
        (None, Some(site_id), Some(opportunity_id), None, Some(suggestion_ids)) => {
            Selector::ExplicitSuggestionSet {
                site_id,
                opportunity_id,
                suggestion_ids,
            }
        }
        _ => {
            let given: Vec<&str> = flags.given().iter().map(Flag::as_arg).collect();
            return Err(AutofixError::InvalidSelectorCombination(vec![
                FlagViolation::new(
                    FlagRule::AnyOf(&[Flag::Name, Flag::SiteId]),
                    format!("unsupported selector combination: {}", given.join(" ")),
                ),
            ]));
        }
    };

    let mode = if flags.suggestion_ids.is_some() {
        BatchMode::ExplicitIdSet
    } else if flags.send_by_issue_type {
        BatchMode::ByIssueType
    } else if flags.send_all_issues || flags.send_by_aggregation_key {
        BatchMode::AllIssuesForSuggestion
    } else {
        BatchMode::SingleSuggestion
    };

    let pick_by = if selector.requested_ids().is_some() {
        None
    } else if flags.send_by_issue_type {
        Some(PickBy::IssueType)
    } else if flags.send_by_aggregation_key {
        Some(PickBy::AggregationKey)
    } else {
        Some(PickBy::Suggestion)
    };

    let snapshot = if flags.force_upload {
        SnapshotSource::ForceUpload
    } else if let Some(archive) = text(&flags.archive) {
        SnapshotSource::Pinned(archive)
    } else if let Some(archive) = archive_override.map(str::trim).filter(|a| !a.is_empty()) {
        SnapshotSource::Pinned(archive.to_string())
    } else {
        SnapshotSource::Auto
    };

    Ok(Selection {
        selector,
        mode,
        pick_by,
        snapshot,
    })
}
