//! Course resolution.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::events::CourseTier;
use super::name_matcher::{best_match, keyword_match, MatchRule};
use super::{bounded, CallError};
use crate::brain::Classifier;
use crate::lms::{Catalog, CourseId};

/// The course picked for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseResolution {
    pub name: String,
    pub id: CourseId,
    pub tier: CourseTier,
    /// Set when the classifier call failed.
    pub classifier_error: Option<CallError>,
}

/// Picks exactly one course from a non-empty catalog.
pub struct CourseResolver<'a> {
    classifier: &'a dyn Classifier,
    call_timeout: Duration,
}

impl<'a> CourseResolver<'a> {
    pub fn new(classifier: &'a dyn Classifier, call_timeout: Duration) -> Self {
        Self {
            classifier,
            call_timeout,
        }
    }

    /// Resolve `query` to a catalog key. Returns `None` only for an empty
    /// catalog.
    pub async fn resolve(&self, query: &str, catalog: &Catalog) -> Option<CourseResolution> {
        if catalog.is_empty() {
            return None;
        }

        let names: Vec<&str> = catalog.names().collect();
        let reply = bounded(
            self.call_timeout,
            self.classifier.classify_course(query, &names),
        )
        .await;

        let (proposal, classifier_error) = match reply {
            Ok(classification) => {
                debug!(
                    confidence = classification.confidence,
                    "Course proposal {:?}: {}", classification.course_name, classification.reasoning
                );
                (classification.proposal().map(str::to_string), None)
            }
            Err(e) => {
                warn!("Course classification failed: {}", e);
                (None, Some(e))
            }
        };

        let (name, tier) = pick_course(query, proposal.as_deref(), &names)?;
        let id = catalog.get(name)?;
        info!("Selected course: {} (ID: {}, tier: {:?})", name, id, tier);

        Some(CourseResolution {
            name: name.to_string(),
            id,
            tier,
            classifier_error,
        })
    }
}

/// The deterministic part of course resolution.
///
/// Tiers in order: exact proposal, word overlap or substring via
/// [`best_match`], keyword containment, first name.
pub fn pick_course<'a>(
    query: &str,
    proposal: Option<&str>,
    names: &[&'a str],
) -> Option<(&'a str, CourseTier)> {
    if let Some(p) = proposal {
        if let Some(name) = names.iter().copied().find(|name| *name == p) {
            return Some((name, CourseTier::Exact));
        }
        debug!("No exact course match for {:?}, trying partial matches", p);
    }

    if let Some(found) = best_match(query, proposal, names.iter().copied()) {
        let tier = match found.rule {
            MatchRule::WordOverlap => CourseTier::WordOverlap,
            MatchRule::Substring => CourseTier::Substring,
        };
        return Some((found.name, tier));
    }

    if let Some(name) = keyword_match(query, names.iter().copied()) {
        return Some((name, CourseTier::Keyword));
    }

    names.first().map(|name| (*name, CourseTier::Default))
}
