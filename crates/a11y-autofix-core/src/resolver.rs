//! Suggestion Resolver.
//!
//! Turns a validated [`Selector`] into a concrete site and the pool of
//! eligible accessibility suggestions under it. Only opportunities of the
//! accessibility type are considered; non-eligible suggestions are dropped
//! silently unless they were requested by id, in which case the exclusion is
//! reported as a non-fatal warning.

use std::fmt;

use a11y_autofix_gateway::{Directory, Ineligibility, Opportunity, Site, Suggestion};
use tracing::debug;

use crate::error::{AutofixError, Result};
use crate::prompt::Prompter;
use crate::selector::Selector;

/// Most site candidates listed in an ambiguous-name error.
pub const MAX_SITE_CANDIDATES: usize = 10;

/// An eligible suggestion together with the opportunity that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSuggestion {
    pub opportunity: Opportunity,
    pub suggestion: Suggestion,
}

/// Non-fatal resolution outcome surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionWarning {
    /// A requested id is not an eligible suggestion of the opportunity.
    /// `ineligible` is set when the id exists but was excluded.
    SuggestionIdNotFound {
        id: String,
        ineligible: Option<Ineligibility>,
    },
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionWarning::SuggestionIdNotFound {
                id,
                ineligible: None,
            } => write!(f, "suggestion {id} not found"),
            ResolutionWarning::SuggestionIdNotFound {
                id,
                ineligible: Some(reason),
            } => write!(f, "suggestion {id} skipped: {reason}"),
        }
    }
}

/// Result of resolving a selector.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub site: Site,
    /// Every eligible suggestion in scope, in discovery order.
    pub pool: Vec<ResolvedSuggestion>,
    /// Explicitly requested suggestions that resolved, in request order.
    pub requested: Option<Vec<ResolvedSuggestion>>,
    pub warnings: Vec<ResolutionWarning>,
}

/// Resolves selectors against a [`Directory`].
pub struct SuggestionResolver<'a> {
    directory: &'a dyn Directory,
    prompter: &'a dyn Prompter,
}

impl<'a> SuggestionResolver<'a> {
    pub fn new(directory: &'a dyn Directory, prompter: &'a dyn Prompter) -> Self {
        Self {
            directory,
            prompter,
        }
    }

    pub async fn resolve(&self, selector: &Selector) -> Result<Resolution> {
        match selector {
            Selector::ByName(query) => {
                let site = self.site_by_name(query).await?;
                self.resolve_site(site).await
            }
            Selector::BySiteId(site_id) => {
                let site = self.site_by_id(site_id).await?;
                self.resolve_site(site).await
            }
            Selector::BySiteAndOpportunity {
                site_id,
                opportunity_id,
            } => {
                let site = self.site_by_id(site_id).await?;
                let opportunity = self.opportunity(&site, opportunity_id).await?;
                let suggestions = self.suggestions(&opportunity).await?;
                let pool = eligible(&opportunity, suggestions);
                if pool.is_empty() {
                    return Err(AutofixError::NoEligibleSuggestions {
                        context: format!(
                            "opportunity {} has no CODE_CHANGE suggestions in NEW status",
                            opportunity.id
                        ),
                    });
                }
                Ok(Resolution {
                    site,
                    pool,
                    requested: None,
                    warnings: Vec::new(),
                })
            }
            Selector::ExplicitSuggestion {
                site_id,
                opportunity_id,
                ..
            }
            | Selector::ExplicitSuggestionSet {
                site_id,
                opportunity_id,
                ..
            } => {
                let ids = selector.requested_ids().unwrap_or_default();
                let site = self.site_by_id(site_id).await?;
                let opportunity = self.opportunity(&site, opportunity_id).await?;
                let suggestions = self.suggestions(&opportunity).await?;

                let mut requested = Vec::new();
                let mut warnings = Vec::new();
                for id in &ids {
                    match suggestions.iter().find(|s| &s.id == id) {
                        None => warnings.push(ResolutionWarning::SuggestionIdNotFound {
                            id: id.clone(),
                            ineligible: None,
                        }),
                        Some(s) => match s.ineligibility() {
                            Some(reason) => {
                                warnings.push(ResolutionWarning::SuggestionIdNotFound {
                                    id: id.clone(),
                                    ineligible: Some(reason),
                                })
                            }
                            None => requested.push(ResolvedSuggestion {
                                opportunity: opportunity.clone(),
                                suggestion: s.clone(),
                            }),
                        },
                    }
                }

                if requested.is_empty() {
                    let reasons: Vec<String> = warnings.iter().map(ToString::to_string).collect();
                    return Err(AutofixError::NoEligibleSuggestions {
                        context: format!(
                            "none of the {} requested suggestion ids is eligible in opportunity {} ({})",
                            ids.len(),
                            opportunity.id,
                            reasons.join("; ")
                        ),
                    });
                }

                Ok(Resolution {
                    site,
                    pool: eligible(&opportunity, suggestions),
                    requested: Some(requested),
                    warnings,
                })
            }
        }
    }

    async fn all_sites(&self) -> Result<Vec<Site>> {
        self.directory
            .list_sites()
            .await
            .map_err(|e| AutofixError::Directory(e.to_string()))
    }

    async fn site_by_name(&self, query: &str) -> Result<Site> {
        let needle = query.to_lowercase();
        let mut matches: Vec<Site> = self
            .all_sites()
            .await?
            .into_iter()
            .filter(|s| s.base_url.to_lowercase().contains(&needle))
            .collect();

        match matches.len() {
            0 => Err(AutofixError::SiteNotFound {
                query: query.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            _ => {
                if !self.prompter.is_interactive() {
                    return Err(AutofixError::AmbiguousSiteName {
                        query: query.to_string(),
                        candidates: matches,
                    });
                }
                let labels: Vec<String> = matches
                    .iter()
                    .map(|s| format!("{} ({})", s.base_url, s.id))
                    .collect();
                let prompt = format!("'{query}' matches several sites, choose one");
                match self.prompter.select(&prompt, &labels) {
                    Some(index) if index < matches.len() => Ok(matches.swap_remove(index)),
                    _ => Err(AutofixError::SelectionCancelled(format!(
                        "no site chosen for '{query}'"
                    ))),
                }
            }
        }
    }

    async fn site_by_id(&self, site_id: &str) -> Result<Site> {
        self.all_sites()
            .await?
            .into_iter()
            .find(|s| s.id == site_id)
            .ok_or_else(|| AutofixError::SiteNotFound {
                query: site_id.to_string(),
            })
    }

    async fn opportunities(&self, site: &Site) -> Result<Vec<Opportunity>> {
        let mut opportunities = self
            .directory
            .list_opportunities(&site.id)
            .await
            .map_err(|e| AutofixError::Directory(e.to_string()))?;
        for opportunity in &mut opportunities {
            if opportunity.site_id.is_empty() {
                opportunity.site_id = site.id.clone();
            }
        }
        Ok(opportunities)
    }

    async fn opportunity(&self, site: &Site, opportunity_id: &str) -> Result<Opportunity> {
        let opportunity = self
            .opportunities(site)
            .await?
            .into_iter()
            .find(|o| o.id == opportunity_id)
            .ok_or_else(|| AutofixError::OpportunityNotFound {
                site_id: site.id.clone(),
                opportunity_id: opportunity_id.to_string(),
                reason: "no opportunity with this id".to_string(),
            })?;
        if !opportunity.is_accessibility() {
            return Err(AutofixError::OpportunityNotFound {
                site_id: site.id.clone(),
                opportunity_id: opportunity_id.to_string(),
                reason: format!("opportunity type is '{}', not accessibility", opportunity.kind),
            });
        }
        Ok(opportunity)
    }

    async fn suggestions(&self, opportunity: &Opportunity) -> Result<Vec<Suggestion>> {
        self.directory
            .list_suggestions(opportunity)
            .await
            .map_err(|e| AutofixError::Directory(e.to_string()))
    }

    async fn resolve_site(&self, site: Site) -> Result<Resolution> {
        let opportunities = self.opportunities(&site).await?;
        let total = opportunities.len();
        let accessibility: Vec<Opportunity> = opportunities
            .into_iter()
            .filter(Opportunity::is_accessibility)
            .collect();
        if accessibility.is_empty() {
            return Err(AutofixError::NoEligibleSuggestions {
                context: format!(
                    "site {} has {total} opportunities, none of type accessibility",
                    site.id
                ),
            });
        }

        let mut pool = Vec::new();
        let mut seen = 0;
        for opportunity in &accessibility {
            let suggestions = self.suggestions(opportunity).await?;
            seen += suggestions.len();
            pool.extend(eligible(opportunity, suggestions));
        }
        debug!(
            site_id = %site.id,
            opportunities = accessibility.len(),
            suggestions = seen,
            eligible = pool.len(),
            "resolved site suggestions"
        );

        if pool.is_empty() {
            return Err(AutofixError::NoEligibleSuggestions {
                context: format!(
                    "{seen} suggestions across {} accessibility opportunities, none CODE_CHANGE in NEW status",
                    accessibility.len()
                ),
            });
        }

        Ok(Resolution {
            site,
            pool,
            requested: None,
            warnings: Vec::new(),
        })
    }
}

fn eligible(opportunity: &Opportunity, suggestions: Vec<Suggestion>) -> Vec<ResolvedSuggestion> {
    suggestions
        .into_iter()
        .filter(Suggestion::is_eligible)
        .map(|suggestion| ResolvedSuggestion {
            opportunity: opportunity.clone(),
            suggestion,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use a11y_autofix_gateway::fakes::MemoryDirectory;

    fn directory() -> MemoryDirectory {
        MemoryDirectory::new()
            .with_site(Site::new("s1", "https://www.sunstargum.com"))
            .with_opportunity(Opportunity::new("o1", "s1", "accessibility", Some("a1")))
            .with_opportunity(Opportunity::new("o2", "s1", "broken-backlinks", Some("a2")))
            .with_suggestions(
                "o1",
                vec![
                    Suggestion::new("x", "o1", "u|aria|nav"),
                    Suggestion::new("y", "o1", "u|aria|main").with_status("FIXED"),
                ],
            )
            .with_suggestions("o2", vec![Suggestion::new("z", "o2", "u|links|a")])
    }

    #[tokio::test]
    async fn test_site_pool_only_has_eligible_accessibility_suggestions() {
        let directory = directory();
        let prompter = ScriptedPrompter::non_interactive();
        let resolution = SuggestionResolver::new(&directory, &prompter)
            .resolve(&Selector::BySiteId("s1".into()))
            .await
            .unwrap();
        let ids: Vec<&str> = resolution
            .pool
            .iter()
            .map(|r| r.suggestion.id.as_str())
            .collect();
        assert_eq!(ids, vec!["x"]);
        assert!(resolution.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_non_accessibility_opportunity_is_not_found() {
        let directory = directory();
        let prompter = ScriptedPrompter::non_interactive();
        let err = SuggestionResolver::new(&directory, &prompter)
            .resolve(&Selector::BySiteAndOpportunity {
                site_id: "s1".into(),
                opportunity_id: "o2".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AutofixError::OpportunityNotFound { .. }));
    }

    #[tokio::test]
    async fn test_explicit_ineligible_id_is_reported() {
        let directory = directory();
        let prompter = ScriptedPrompter::non_interactive();
        let resolution = SuggestionResolver::new(&directory, &prompter)
            .resolve(&Selector::ExplicitSuggestionSet {
                site_id: "s1".into(),
                opportunity_id: "o1".into(),
                suggestion_ids: vec!["y".into(), "x".into()],
            })
            .await
            .unwrap();
        assert_eq!(
            resolution.warnings,
            vec![ResolutionWarning::SuggestionIdNotFound {
                id: "y".into(),
                ineligible: Some(Ineligibility::NotNew),
            }]
        );
        assert_eq!(resolution.requested.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_single_ineligible_id_names_the_reason() {
        let directory = directory();
        let prompter = ScriptedPrompter::non_interactive();
        let err = SuggestionResolver::new(&directory, &prompter)
            .resolve(&Selector::ExplicitSuggestion {
                site_id: "s1".into(),
                opportunity_id: "o1".into(),
                suggestion_id: "y".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AutofixError::NoEligibleSuggestions { .. }));
        let message = err.to_string();
        assert!(message.contains("suggestion y skipped: status is not NEW"));
    }

    fn crowded_directory() -> MemoryDirectory {
        (1..=12).fold(MemoryDirectory::new(), |directory, n| {
            directory.with_site(Site::new(format!("s{n}"), format!("https://gum{n}.example")))
        })
    }

    #[tokio::test]
    async fn test_ambiguous_name_reports_every_match() {
        let directory = crowded_directory();
        let prompter = ScriptedPrompter::non_interactive();
        let err = SuggestionResolver::new(&directory, &prompter)
            .resolve(&Selector::ByName("gum".into()))
            .await
            .unwrap_err();
        let AutofixError::AmbiguousSiteName { candidates, .. } = &err else {
            panic!("expected ambiguous site name, got {err}");
        };
        assert_eq!(candidates.len(), 12);
        let message = err.to_string();
        assert!(message.contains("'gum' matches 12 sites"));
        assert!(message.contains("https://gum10.example (s10)"));
        assert!(!message.contains("https://gum11.example"));
        assert!(message.contains("and 2 more"));
    }

    #[tokio::test]
    async fn test_any_match_can_be_chosen_interactively() {
        let directory = crowded_directory();
        let prompter = ScriptedPrompter::new().with_selection(11);
        let err = SuggestionResolver::new(&directory, &prompter)
            .resolve(&Selector::ByName("gum".into()))
            .await
            .unwrap_err();
        // The twelfth site resolves; it simply has no opportunities.
        assert!(
            err.to_string().contains("site s12 has 0 opportunities"),
            "unexpected error: {err}"
        );
    }
}
