//! Per-module resource ranking.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{bounded, CallError};
use crate::brain::{Classifier, RelevanceResult};
use crate::lms::{CourseId, LmsClient, ModuleItem};

/// Most indices taken from a scoring reply.
pub const MAX_RESOURCE_INDICES: usize = 5;

/// Score for an index that has no paired score.
pub const MISSING_SCORE: f32 = 0.5;

pub const UNTITLED_RESOURCE: &str = "Untitled Resource";
pub const UNKNOWN_TYPE: &str = "Unknown";

/// One search result.
///
/// `relevance_score` comes from an untrusted source and is not clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub url: String,
    pub course: String,
    pub module: String,
    pub relevance_score: f32,
}

/// Resources picked from one module.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedModule {
    /// In reply order, not sorted.
    pub resources: Vec<Resource>,
    /// True when the default ranking replaced the classifier's.
    pub fallback_used: bool,
    pub classifier_error: Option<CallError>,
    /// File URL lookups that failed. The item's own URL was kept.
    pub file_url_errors: Vec<CallError>,
}

/// Course context for ranking one module.
#[derive(Debug, Clone, Copy)]
pub struct RankingScope<'s> {
    pub course_id: CourseId,
    pub course_name: &'s str,
    pub module_name: &'s str,
}

/// Ranks the items of one module.
pub struct ResourceRanker<'a> {
    classifier: &'a dyn Classifier,
    lms: &'a dyn LmsClient,
    call_timeout: Duration,
    fallback_count: usize,
    fallback_score: f32,
}

impl<'a> ResourceRanker<'a> {
    pub fn new(
        classifier: &'a dyn Classifier,
        lms: &'a dyn LmsClient,
        call_timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            lms,
            call_timeout,
            fallback_count: 3,
            fallback_score: 0.8,
        }
    }

    /// Ranking used when scoring fails.
    pub fn with_fallback(mut self, count: usize, score: f32) -> Self {
        self.fallback_count = count;
        self.fallback_score = score;
        self
    }

    pub async fn rank(&self, query: &str, items: &[ModuleItem], scope: RankingScope<'_>) -> RankedModule {
        let reply = bounded(
            self.call_timeout,
            self.classifier
                .score_resources(query, items, scope.course_name, scope.module_name),
        )
        .await;

        let (relevance, fallback_used, classifier_error) = match reply {
            Ok(relevance) => {
                debug!(
                    "Relevant indices from analysis: {:?} ({})",
                    relevance.resource_indices, relevance.reasoning
                );
                (relevance, false, None)
            }
            Err(e) => {
                warn!(
                    "Resource scoring failed for {}, using default ranking: {}",
                    scope.module_name, e
                );
                (
                    default_ranking(items.len(), self.fallback_count, self.fallback_score),
                    true,
                    Some(e),
                )
            }
        };

        let mut resources = Vec::new();
        let mut file_url_errors = Vec::new();

        for (item, score) in select_items(&relevance, items) {
            let mut resource = build_resource(item, score, scope);

            if let Some(content_ref) = item.resolvable_file() {
                match bounded(
                    self.call_timeout,
                    self.lms.resolve_file_url(scope.course_id, content_ref),
                )
                .await
                {
                    Ok(Some(url)) if !url.is_empty() => resource.url = url,
                    Ok(_) => debug!("No file URL for content {}", content_ref),
                    Err(e) => {
                        warn!("File URL lookup failed for content {}: {}", content_ref, e);
                        file_url_errors.push(e);
                    }
                }
            }

            debug!(
                "Added resource: {} (score: {})",
                resource.title, resource.relevance_score
            );
            resources.push(resource);
        }

        RankedModule {
            resources,
            fallback_used,
            classifier_error,
            file_url_errors,
        }
    }
}

/// The first `min(count, len)` items, each with `score`.
pub fn default_ranking(len: usize, count: usize, score: f32) -> RelevanceResult {
    let take = count.min(len);
    RelevanceResult {
        resource_indices: (0..take as i64).collect(),
        relevance_scores: vec![score; take],
        reasoning: "Default selection".to_string(),
    }
}

/// Pair each in-range index with its score, in reply order.
///
/// At most [`MAX_RESOURCE_INDICES`] indices are read. Negative or
/// out-of-range indices are dropped, and a position without a score gets
/// [`MISSING_SCORE`].
pub fn select_items<'i>(relevance: &RelevanceResult, items: &'i [ModuleItem]) -> Vec<(&'i ModuleItem, f32)> {
    relevance
        .resource_indices
        .iter()
        .take(MAX_RESOURCE_INDICES)
        .enumerate()
        .filter_map(|(pos, &index)| {
            let item = usize::try_from(index).ok().and_then(|i| items.get(i));
            if item.is_none() {
                debug!("Dropping out-of-range index {}", index);
            }
            let score = relevance
                .relevance_scores
                .get(pos)
                .copied()
                .unwrap_or(MISSING_SCORE);
            item.map(|item| (item, score))
        })
        .collect()
}

fn build_resource(item: &ModuleItem, score: f32, scope: RankingScope<'_>) -> Resource {
    Resource {
        title: item
            .title
            .clone()
            .unwrap_or_else(|| UNTITLED_RESOURCE.to_string()),
        resource_type: item
            .item_type
            .as_ref()
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
        url: item.url.clone().unwrap_or_default(),
        course: scope.course_name.to_string(),
        module: scope.module_name.to_string(),
        relevance_score: score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::BrainError;
    use crate::lms::{ItemType, LmsError};
    use crate::testing::{fixtures, MockClassifier, MockLms};

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn scope() -> RankingScope<'static> {
        RankingScope {
            course_id: 11,
            course_name: "Linear Algebra",
            module_name: "Week 5",
        }
    }

    fn titled(n: usize) -> Vec<ModuleItem> {
        (0..n)
            .map(|i| fixtures::page_item(i as u64, &format!("Item {}", i)))
            .collect()
    }

    #[test]
    fn test_select_items_drops_out_of_range() {
        let items = titled(2);
        let relevance = RelevanceResult::new(vec![0, 5], vec![0.9, 0.7]);

        let selected = select_items(&relevance, &items);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0.id, 0);
        assert_eq!(selected[0].1, 0.9);
    }

    #[test]
    fn test_select_items_pads_missing_scores() {
        let items = titled(3);
        let relevance = RelevanceResult::new(vec![2, 0, 1], vec![0.95]);

        let scores: Vec<f32> = select_items(&relevance, &items).iter().map(|(_, s)| *s).collect();
        assert_eq!(scores, vec![0.95, 0.5, 0.5]);
    }

    #[test]
    fn test_select_items_score_stays_paired_after_drop() {
        let items = titled(2);
        let relevance = RelevanceResult::new(vec![9, 1], vec![0.1, 0.6]);

        let selected = select_items(&relevance, &items);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0.id, 1);
        assert_eq!(selected[0].1, 0.6);
    }

    #[test]
    fn test_select_items_negative_and_cap() {
        let items = titled(10);
        let relevance = RelevanceResult::new(vec![-1, 1, 2, 3, 4, 5, 6], vec![]);

        let ids: Vec<u64> = select_items(&relevance, &items).iter().map(|(i, _)| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_select_items_empty_inputs() {
        assert!(select_items(&RelevanceResult::default(), &titled(3)).is_empty());
        assert!(select_items(&RelevanceResult::new(vec![0, 1], vec![1.0]), &[]).is_empty());
    }

    #[test]
    fn test_default_ranking() {
        let ranking = default_ranking(5, 3, 0.8);
        assert_eq!(ranking.resource_indices, vec![0, 1, 2]);
        assert_eq!(ranking.relevance_scores, vec![0.8, 0.8, 0.8]);

        let ranking = default_ranking(1, 3, 0.8);
        assert_eq!(ranking.resource_indices, vec![0]);
    }

    #[test]
    fn test_build_resource_defaults() {
        let item = ModuleItem {
            id: 1,
            title: None,
            item_type: None,
            url: None,
            content_ref: None,
        };
        let resource = build_resource(&item, 1.7, scope());
        assert_eq!(resource.title, "Untitled Resource");
        assert_eq!(resource.resource_type, "Unknown");
        assert_eq!(resource.url, "");
        assert_eq!(resource.relevance_score, 1.7);
    }

    #[test]
    fn test_resource_serializes_type_field() {
        let resource = build_resource(&fixtures::page_item(1, "Syllabus"), 0.5, scope());
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["type"], "Page");
        assert_eq!(json["course"], "Linear Algebra");
        assert_eq!(json["module"], "Week 5");
        assert!(json.get("resource_type").is_none());
    }

    #[tokio::test]
    async fn test_rank_resolves_file_urls() {
        let classifier = MockClassifier::new();
        classifier
            .set_resource_reply(RelevanceResult::new(vec![1, 0], vec![0.9, 0.4]))
            .await;
        let lms = MockLms::new();
        lms.set_file_url(777, "https://files.example/gram-schmidt.pdf").await;

        let items = vec![
            fixtures::page_item(1, "Syllabus"),
            fixtures::file_item(2, "Gram-Schmidt Notes", 777),
        ];

        let ranked = ResourceRanker::new(&classifier, &lms, TIMEOUT)
            .rank("gram schmidt", &items, scope())
            .await;

        assert!(!ranked.fallback_used);
        assert_eq!(ranked.resources.len(), 2);
        assert_eq!(ranked.resources[0].url, "https://files.example/gram-schmidt.pdf");
        assert_eq!(ranked.resources[0].resource_type, "File");
        assert_eq!(ranked.resources[1].title, "Syllabus");
        assert_eq!(lms.file_url_calls().await, vec![(11, 777)]);
    }

    #[tokio::test]
    async fn test_rank_keeps_item_url_when_lookup_fails() {
        let classifier = MockClassifier::new();
        classifier
            .set_resource_reply(RelevanceResult::new(vec![0], vec![0.9]))
            .await;
        let lms = MockLms::new();
        lms.set_next_error(LmsError::Api {
            status: 404,
            message: "not found".to_string(),
        })
        .await;

        let items = vec![fixtures::file_item(2, "Notes", 778)];
        let ranked = ResourceRanker::new(&classifier, &lms, TIMEOUT)
            .rank("notes", &items, scope())
            .await;

        assert_eq!(ranked.resources[0].url, items[0].url.clone().unwrap());
        assert_eq!(ranked.file_url_errors.len(), 1);
    }

    #[tokio::test]
    async fn test_rank_file_tag_is_exact() {
        let classifier = MockClassifier::new();
        classifier
            .set_resource_reply(RelevanceResult::new(vec![0], vec![0.9]))
            .await;
        let lms = MockLms::new();
        lms.set_file_url(5, "https://files.example/x").await;

        let mut item = fixtures::file_item(1, "Notes", 5);
        item.item_type = Some(ItemType::from("file"));

        let ranked = ResourceRanker::new(&classifier, &lms, TIMEOUT)
            .rank("notes", &[item], scope())
            .await;

        assert_ne!(ranked.resources[0].url, "https://files.example/x");
        assert!(lms.file_url_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_rank_failure_uses_default_ranking() {
        let classifier = MockClassifier::new();
        classifier
            .set_next_error(BrainError::Parse("garbage".to_string()))
            .await;
        let lms = MockLms::new();

        let ranked = ResourceRanker::new(&classifier, &lms, TIMEOUT)
            .rank("q", &titled(5), scope())
            .await;

        assert!(ranked.fallback_used);
        assert!(ranked.classifier_error.is_some());
        let titles: Vec<&str> = ranked.resources.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Item 0", "Item 1", "Item 2"]);
        assert!(ranked.resources.iter().all(|r| r.relevance_score == 0.8));
    }

    #[tokio::test]
    async fn test_rank_custom_fallback() {
        let classifier = MockClassifier::new();
        classifier.set_next_error(BrainError::NotConfigured).await;
        let lms = MockLms::new();

        let ranked = ResourceRanker::new(&classifier, &lms, TIMEOUT)
            .with_fallback(1, 0.3)
            .rank("q", &titled(5), scope())
            .await;

        assert_eq!(ranked.resources.len(), 1);
        assert_eq!(ranked.resources[0].relevance_score, 0.3);
    }
}
