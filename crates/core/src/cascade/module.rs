//! Module selection.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::name_matcher::{contains_either_way, words_longer_than, OVERLAP_MIN_WORD_LEN};
use super::{bounded, CallError};
use crate::brain::Classifier;
use crate::lms::Module;

/// Most proposals taken from the classifier.
pub const MAX_MODULE_PROPOSALS: usize = 3;

/// The modules picked for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSelection {
    /// Subset of the course's modules, in their original order.
    pub modules: Vec<Module>,
    /// True when nothing matched and the leading modules were taken.
    pub fallback_used: bool,
    pub classifier_error: Option<CallError>,
}

/// Picks a bounded, non-empty subset of a course's modules.
pub struct ModuleResolver<'a> {
    classifier: &'a dyn Classifier,
    call_timeout: Duration,
    fallback_count: usize,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(classifier: &'a dyn Classifier, call_timeout: Duration, fallback_count: usize) -> Self {
        Self {
            classifier,
            call_timeout,
            fallback_count,
        }
    }

    pub async fn resolve(&self, query: &str, modules: &[Module]) -> ModuleSelection {
        let names: Vec<&str> = modules.iter().map(|m| m.name.as_str()).collect();

        let (proposals, classifier_error) = if modules.is_empty() {
            (Vec::new(), None)
        } else {
            match bounded(
                self.call_timeout,
                self.classifier.classify_modules(query, &names),
            )
            .await
            {
                Ok(reply) => {
                    debug!("Module proposals: {:?}", reply.module_names);
                    (repair_proposals(&reply.module_names, &names), None)
                }
                Err(e) => {
                    warn!("Module classification failed: {}", e);
                    (Vec::new(), Some(e))
                }
            }
        };

        let (modules, fallback_used) = select_modules(query, &proposals, modules, self.fallback_count);
        info!(
            fallback_used,
            "Selected {} modules for further analysis",
            modules.len()
        );

        ModuleSelection {
            modules,
            fallback_used,
            classifier_error,
        }
    }
}

/// Map free-text proposals onto real module names.
///
/// At most [`MAX_MODULE_PROPOSALS`] are considered. An exact name is kept.
/// Otherwise the first name containing the proposal, or contained in it, is
/// used. Proposals that match nothing are dropped.
pub fn repair_proposals<'a>(proposals: &[String], names: &[&'a str]) -> Vec<&'a str> {
    proposals
        .iter()
        .take(MAX_MODULE_PROPOSALS)
        .filter_map(|proposal| {
            let proposal = proposal.trim();
            if proposal.is_empty() {
                return None;
            }
            if let Some(exact) = names.iter().copied().find(|n| *n == proposal) {
                return Some(exact);
            }
            let repaired = names
                .iter()
                .copied()
                .find(|n| contains_either_way(proposal, n));
            match repaired {
                Some(name) => debug!("Repaired module proposal {:?} to {:?}", proposal, name),
                None => debug!("Dropped invalid module proposal {:?}", proposal),
            }
            repaired
        })
        .collect()
}

/// Keep each module named by a proposal or containing a query word, in
/// list order. With no match, the first `fallback_count` modules.
pub fn select_modules(
    query: &str,
    proposals: &[&str],
    modules: &[Module],
    fallback_count: usize,
) -> (Vec<Module>, bool) {
    let words = words_longer_than(query, OVERLAP_MIN_WORD_LEN);

    let selected: Vec<Module> = modules
        .iter()
        .filter(|module| {
            let named = proposals.contains(&module.name.as_str());
            let lower = module.name.to_lowercase();
            named || words.iter().any(|w| lower.contains(w.as_str()))
        })
        .cloned()
        .collect();

    if selected.is_empty() {
        let take = fallback_count.min(modules.len());
        (modules[..take].to_vec(), true)
    } else {
        (selected, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{BrainError, ModuleClassification};
    use crate::testing::MockClassifier;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn weeks(n: u64) -> Vec<Module> {
        (1..=n).map(|i| Module::new(i, format!("Week {}", i))).collect()
    }

    #[test]
    fn test_repair_proposals() {
        let names = ["Week 1: Vectors", "Week 2: Matrices", "Week 3: Orthogonality"];
        let proposals = vec![
            "Week 2: Matrices".to_string(),
            "orthogonality".to_string(),
            "Eigenvalues".to_string(),
        ];
        assert_eq!(
            repair_proposals(&proposals, &names),
            vec!["Week 2: Matrices", "Week 3: Orthogonality"]
        );
    }

    #[test]
    fn test_repair_proposals_caps_at_three() {
        let names = ["A1", "B1", "C1", "D1"];
        let proposals: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        assert_eq!(repair_proposals(&proposals, &names), vec!["A1", "B1", "C1"]);
    }

    #[test]
    fn test_repair_ignores_blank_proposals() {
        let names = ["Week 1"];
        assert!(repair_proposals(&["  ".to_string()], &names).is_empty());
    }

    #[test]
    fn test_select_keeps_list_order() {
        let modules = vec![
            Module::new(1, "Vectors"),
            Module::new(2, "Matrices"),
            Module::new(3, "Orthogonality"),
        ];
        let (selected, fallback) =
            select_modules("question about orthogonality", &["Matrices"], &modules, 2);
        assert!(!fallback);
        let ids: Vec<u64> = selected.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_select_query_word_substring() {
        let modules = vec![Module::new(1, "Orthogonalization Methods"), Module::new(2, "Review")];
        let (selected, fallback) = select_modules("ORTHOGONAL vectors", &[], &modules, 2);
        assert!(!fallback);
        assert_eq!(selected, vec![Module::new(1, "Orthogonalization Methods")]);
    }

    #[test]
    fn test_select_fallback_prefix() {
        let (selected, fallback) = select_modules("zzz", &[], &weeks(5), 2);
        assert!(fallback);
        assert_eq!(selected, weeks(2));

        let (selected, _) = select_modules("zzz", &[], &weeks(1), 2);
        assert_eq!(selected, weeks(1));
    }

    #[test]
    fn test_duplicate_names_all_selected() {
        let modules = vec![Module::new(1, "Review"), Module::new(2, "Review")];
        let (selected, _) = select_modules("q", &["Review"], &modules, 2);
        assert_eq!(selected.len(), 2);
    }

    #[tokio::test]
    async fn test_classifier_unavailable_takes_first_two() {
        let classifier = MockClassifier::new();
        classifier.set_next_error(BrainError::NotConfigured).await;

        let selection = ModuleResolver::new(&classifier, TIMEOUT, 2)
            .resolve("help", &weeks(2))
            .await;

        assert_eq!(selection.modules, weeks(2));
        assert!(selection.fallback_used);
        assert!(selection.classifier_error.is_some());
    }

    #[tokio::test]
    async fn test_classifier_proposal_selected() {
        let classifier = MockClassifier::new();
        classifier
            .set_module_reply(ModuleClassification::named(["week 3"]))
            .await;

        let selection = ModuleResolver::new(&classifier, TIMEOUT, 2)
            .resolve("help", &weeks(4))
            .await;

        assert_eq!(selection.modules, vec![Module::new(3, "Week 3")]);
        assert!(!selection.fallback_used);

        let calls = classifier.module_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec!["Week 1", "Week 2", "Week 3", "Week 4"]);
    }
}
