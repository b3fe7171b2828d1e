//! Interactive picking.
//!
//! Bridges a [`Resolution`] and the [`Selection`]'s batch mode to a concrete
//! [`BatchPolicy`]. Explicit ids need no operator input; otherwise the
//! operator picks a suggestion, an issue type or an aggregation key through
//! the [`Prompter`].

use std::collections::HashMap;

use crate::error::{AutofixError, Result};
use crate::grouping::BatchPolicy;
use crate::prompt::{truncate, Prompter};
use crate::resolver::{Resolution, ResolvedSuggestion};
use crate::selector::{BatchMode, PickBy, Selection};

/// Suggestions to group and the policy to group them under.
#[derive(Debug, Clone)]
pub struct GroupingPlan {
    pub input: Vec<ResolvedSuggestion>,
    pub policy: BatchPolicy,
}

/// Count of members per label, sorted by descending count, then label.
pub fn ranked_counts<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Aggregation keys counted per opportunity, since a batch never spans two
/// opportunities. Sorted by descending count, then key, then opportunity.
pub fn ranked_keys(pool: &[ResolvedSuggestion]) -> Vec<(String, String, usize)> {
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for r in pool {
        *counts
            .entry((r.opportunity.id.as_str(), r.suggestion.aggregation_key.as_str()))
            .or_default() += 1;
    }
    let mut ranked: Vec<(String, String, usize)> = counts
        .into_iter()
        .map(|((opportunity_id, key), count)| (opportunity_id.to_string(), key.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| {
        b.2.cmp(&a.2)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked
}

/// One listing line for a suggestion.
pub fn describe(resolved: &ResolvedSuggestion) -> String {
    let s = &resolved.suggestion;
    let mut line = format!("{} | {} | {}", s.issue_type, s.url, s.id);
    if !s.target_selector.is_empty() {
        line.push_str(&format!(" | {}", truncate(&s.target_selector, 60)));
    }
    if !s.faulty_line.is_empty() {
        line.push_str(&format!(" | {}", truncate(&s.faulty_line, 60)));
    }
    line
}

/// Decide what to group, prompting the operator where the mode needs it.
pub fn plan_grouping(
    resolution: &Resolution,
    selection: &Selection,
    prompter: &dyn Prompter,
) -> Result<GroupingPlan> {
    let pool = resolution.pool.clone();

    if let Some(requested) = &resolution.requested {
        let ids: Vec<String> = requested.iter().map(|r| r.suggestion.id.clone()).collect();
        let first = ids
            .first()
            .cloned()
            .ok_or_else(|| AutofixError::NoEligibleSuggestions {
                context: "no requested suggestion resolved".into(),
            })?;
        let policy = match selection.mode {
            BatchMode::ExplicitIdSet => BatchPolicy::ExplicitIdSet { ids },
            BatchMode::AllIssuesForSuggestion => {
                BatchPolicy::AllIssuesForSuggestion { chosen: first }
            }
            _ => BatchPolicy::SingleSuggestion { chosen: first },
        };
        return Ok(GroupingPlan {
            input: pool,
            policy,
        });
    }

    let policy = match selection.pick_by.unwrap_or(PickBy::Suggestion) {
        PickBy::Suggestion => {
            let chosen = pick_suggestion(&pool, prompter)?;
            if selection.mode == BatchMode::AllIssuesForSuggestion {
                BatchPolicy::AllIssuesForSuggestion { chosen }
            } else {
                BatchPolicy::SingleSuggestion { chosen }
            }
        }
        PickBy::IssueType => {
            let ranked = ranked_counts(pool.iter().map(|r| r.suggestion.issue_type.as_str()));
            let issue_type = pick_ranked(&ranked, "Choose an issue type", prompter)?;
            BatchPolicy::ByIssueType { issue_type }
        }
        PickBy::AggregationKey => {
            let ranked = ranked_keys(&pool);
            let spans_opportunities = ranked.windows(2).any(|pair| pair[0].0 != pair[1].0);
            let labels: Vec<String> = ranked
                .iter()
                .map(|(opportunity_id, key, count)| {
                    if spans_opportunities {
                        format!("{key} [opportunity {opportunity_id}] ({count})")
                    } else {
                        format!("{key} ({count})")
                    }
                })
                .collect();
            let prompt = "Choose an aggregation key";
            let index = choose(&labels, prompt, prompter)?;
            let (opportunity_id, key, _) = &ranked[index];
            let chosen = pool
                .iter()
                .find(|r| &r.opportunity.id == opportunity_id && &r.suggestion.aggregation_key == key)
                .map(|r| r.suggestion.id.clone())
                .ok_or_else(|| AutofixError::NoEligibleSuggestions {
                    context: format!("no suggestion carries aggregation key {key}"),
                })?;
            BatchPolicy::AllIssuesForSuggestion { chosen }
        }
    };

    Ok(GroupingPlan {
        input: pool,
        policy,
    })
}

fn pick_suggestion(pool: &[ResolvedSuggestion], prompter: &dyn Prompter) -> Result<String> {
    if !prompter.is_interactive() {
        return Err(AutofixError::SelectionCancelled(
            "choosing a suggestion needs an interactive terminal; pass --suggestion-id".into(),
        ));
    }
    let labels: Vec<String> = pool.iter().map(describe).collect();
    prompter
        .select("Choose a suggestion", &labels)
        .and_then(|index| pool.get(index))
        .map(|r| r.suggestion.id.clone())
        .ok_or_else(|| AutofixError::SelectionCancelled("no suggestion chosen".into()))
}

fn pick_ranked(ranked: &[(String, usize)], prompt: &str, prompter: &dyn Prompter) -> Result<String> {
    let labels: Vec<String> = ranked
        .iter()
        .map(|(label, count)| format!("{label} ({count})"))
        .collect();
    let index = choose(&labels, prompt, prompter)?;
    Ok(ranked[index].0.clone())
}

/// Index of the operator's choice; always within `labels`.
fn choose(labels: &[String], prompt: &str, prompter: &dyn Prompter) -> Result<usize> {
    if !prompter.is_interactive() {
        return Err(AutofixError::SelectionCancelled(format!(
            "{} needs an interactive terminal",
            prompt.to_lowercase()
        )));
    }
    prompter
        .select(prompt, labels)
        .filter(|index| *index < labels.len())
        .ok_or_else(|| AutofixError::SelectionCancelled(format!("{prompt}: nothing chosen")))
}
