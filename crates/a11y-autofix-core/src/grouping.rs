//! Grouping Engine.
//!
//! Partitions resolved suggestions into message groups under a
//! [`BatchPolicy`]. A group never mixes aggregation keys or opportunities,
//! and group order follows first discovery in the input.

use std::collections::{HashMap, HashSet};

use a11y_autofix_gateway::{Opportunity, Suggestion};

use crate::resolver::ResolvedSuggestion;

/// Concrete batching decision, after any interactive pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Exactly the chosen suggestion.
    SingleSuggestion { chosen: String },
    /// Every suggestion sharing the chosen one's aggregation key and
    /// opportunity.
    AllIssuesForSuggestion { chosen: String },
    /// Every suggestion of one issue type, one group per aggregation key.
    ByIssueType { issue_type: String },
    /// One group per listed id, in list order.
    ExplicitIdSet { ids: Vec<String> },
}

/// Suggestions that travel together in one outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageGroup {
    pub aggregation_key: String,
    pub opportunity: Opportunity,
    pub suggestions: Vec<Suggestion>,
}

impl MessageGroup {
    fn from_resolved(resolved: &ResolvedSuggestion) -> Self {
        Self {
            aggregation_key: resolved.suggestion.aggregation_key.clone(),
            opportunity: resolved.opportunity.clone(),
            suggestions: vec![resolved.suggestion.clone()],
        }
    }

    pub fn suggestion_ids(&self) -> Vec<String> {
        self.suggestions.iter().map(|s| s.id.clone()).collect()
    }
}

/// Partition `input` under `policy`. Returns no groups when nothing in the
/// input matches.
pub fn group(input: &[ResolvedSuggestion], policy: &BatchPolicy) -> Vec<MessageGroup> {
    match policy {
        BatchPolicy::SingleSuggestion { chosen } => input
            .iter()
            .find(|r| &r.suggestion.id == chosen)
            .map(MessageGroup::from_resolved)
            .into_iter()
            .collect(),

        BatchPolicy::AllIssuesForSuggestion { chosen } => {
            let Some(anchor) = input.iter().find(|r| &r.suggestion.id == chosen) else {
                return Vec::new();
            };
            let members = input.iter().filter(|r| {
                r.opportunity.id == anchor.opportunity.id
                    && r.suggestion.aggregation_key == anchor.suggestion.aggregation_key
            });
            partition(members)
        }

        BatchPolicy::ByIssueType { issue_type } => {
            partition(input.iter().filter(|r| &r.suggestion.issue_type == issue_type))
        }

        BatchPolicy::ExplicitIdSet { ids } => {
            let mut emitted = HashSet::new();
            ids.iter()
                .filter_map(|id| input.iter().find(|r| &r.suggestion.id == id))
                .filter(|r| emitted.insert(r.suggestion.id.clone()))
                .map(MessageGroup::from_resolved)
                .collect()
        }
    }
}

/// Ordered partition by (opportunity, aggregation key).
fn partition<'a>(members: impl Iterator<Item = &'a ResolvedSuggestion>) -> Vec<MessageGroup> {
    let mut groups: Vec<MessageGroup> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for resolved in members {
        let key = (
            resolved.opportunity.id.clone(),
            resolved.suggestion.aggregation_key.clone(),
        );
        match index.get(&key) {
            Some(&at) => groups[at].suggestions.push(resolved.suggestion.clone()),
            None => {
                index.insert(key, groups.len());
                groups.push(MessageGroup::from_resolved(resolved));
            }
        }
    }
    groups
}
