//! Heuristic name matching.
//!
//! Pure functions, no I/O. Used to repair classifier proposals that do not
//! exactly match a catalog key or module name.

use std::collections::HashSet;
use tracing::debug;

/// Minimum word-overlap score for a candidate to be accepted.
pub const OVERLAP_THRESHOLD: f32 = 0.2;

/// Words must be longer than this to count for overlap.
pub const OVERLAP_MIN_WORD_LEN: usize = 3;

/// Words must be longer than this to count as keywords.
pub const KEYWORD_MIN_WORD_LEN: usize = 4;

/// Which rule produced a [`NameMatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    WordOverlap,
    Substring,
}

/// A candidate picked by [`best_match`].
#[derive(Debug, Clone, PartialEq)]
pub struct NameMatch<'a> {
    pub name: &'a str,
    /// Word-overlap score of `name` against the query.
    pub score: f32,
    pub rule: MatchRule,
}

/// Lowercased whitespace-separated words longer than `min_len` characters,
/// in their original order.
pub fn words_longer_than(text: &str, min_len: usize) -> Vec<String> {
    text.split_whitespace()
        .filter(|w| w.chars().count() > min_len)
        .map(str::to_lowercase)
        .collect()
}

fn word_set(text: &str) -> HashSet<String> {
    words_longer_than(text, OVERLAP_MIN_WORD_LEN)
        .into_iter()
        .collect()
}

/// |A ∩ B| / min(|A|, |B|), or 0.0 when either set is empty.
pub fn word_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / smaller as f32
}

/// Case-insensitive containment in either direction.
pub fn contains_either_way(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

/// Best candidate for `query`, if any rule accepts one.
///
/// Word overlap is scored against `query`. Substring containment probes with
/// `proposal` (the classifier's free-text answer), not with the query. The
/// highest overlap wins when it reaches [`OVERLAP_THRESHOLD`], the earliest
/// candidate winning ties. Otherwise the first candidate that contains the
/// proposal, or is contained in it, is returned.
pub fn best_match<'a, I>(query: &str, proposal: Option<&str>, candidates: I) -> Option<NameMatch<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    let query_words = word_set(query);
    let proposal = proposal.map(str::trim).filter(|p| !p.is_empty());

    let mut best: Option<(&'a str, f32)> = None;
    let mut substring: Option<(&'a str, f32)> = None;

    for name in candidates {
        let score = word_overlap(&query_words, &word_set(name));
        debug!("Candidate {:?}: overlap {:.3}", name, score);

        if score > best.map_or(0.0, |(_, s)| s) {
            best = Some((name, score));
        }

        if substring.is_none() {
            if let Some(p) = proposal {
                if contains_either_way(p, name) {
                    substring = Some((name, score));
                }
            }
        }
    }

    match (best, substring) {
        (Some((name, score)), _) if score >= OVERLAP_THRESHOLD => Some(NameMatch {
            name,
            score,
            rule: MatchRule::WordOverlap,
        }),
        (_, Some((name, score))) => Some(NameMatch {
            name,
            score,
            rule: MatchRule::Substring,
        }),
        _ => None,
    }
}

/// First candidate containing any keyword of `query`.
///
/// Candidates are scanned in order, and for each candidate the keywords in
/// query order.
pub fn keyword_match<'a, I>(query: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let keywords = words_longer_than(query, KEYWORD_MIN_WORD_LEN);
    if keywords.is_empty() {
        return None;
    }

    candidates.into_iter().find(|name| {
        let lower = name.to_lowercase();
        keywords.iter().any(|k| lower.contains(k.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(text: &str) -> HashSet<String> {
        word_set(text)
    }

    #[test]
    fn test_words_longer_than() {
        assert_eq!(
            words_longer_than("How do I use the Gram-Schmidt method", 3),
            vec!["gram-schmidt", "method"]
        );
        assert!(words_longer_than("a bb ccc", 3).is_empty());
    }

    #[test]
    fn test_word_length_counts_chars() {
        // four characters, more than four bytes
        assert_eq!(words_longer_than("ÄÖÜß", 3), vec!["äöüß"]);
    }

    #[test]
    fn test_word_overlap_formula() {
        let a = set("matrix orthogonalization help");
        let b = set("Linear Algebra Orthogonalization");
        let score = word_overlap(&a, &b);
        assert!((score - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_word_overlap_empty_is_zero() {
        assert_eq!(word_overlap(&set(""), &set("Linear Algebra")), 0.0);
        assert_eq!(word_overlap(&set("eigenvalues"), &set("Calc I")), 0.0);
    }

    #[test]
    fn test_overlap_uses_smaller_set() {
        let a = set("calculus derivatives limits integrals");
        let b = set("Calculus");
        assert_eq!(word_overlap(&a, &b), 1.0);
    }

    #[test]
    fn test_best_match_overlap() {
        let names = ["Calculus I", "Linear Algebra Orthogonalization"];
        let found = best_match("matrix orthogonalization help", None, names).unwrap();
        assert_eq!(found.name, "Linear Algebra Orthogonalization");
        assert_eq!(found.rule, MatchRule::WordOverlap);
    }

    #[test]
    fn test_best_match_tie_keeps_first() {
        let names = ["Physics Waves", "Physics Optics"];
        let found = best_match("physics question", None, names).unwrap();
        assert_eq!(found.name, "Physics Waves");
    }

    #[test]
    fn test_best_match_substring_probes_proposal_not_query() {
        let names = ["Calculus I", "Linear Algebra"];

        let found = best_match("orthogonalization of matrices", Some("linear algebra"), names).unwrap();
        assert_eq!(found.name, "Linear Algebra");
        assert_eq!(found.rule, MatchRule::Substring);
        assert_eq!(found.score, 0.0);

        // the query alone mentions no course name
        assert!(best_match("orthogonalization of matrices", None, names).is_none());
    }

    #[test]
    fn test_best_match_substring_either_direction() {
        let names = ["MAT 343 Linear Algebra"];
        let found = best_match("q", Some("Linear Algebra"), names).unwrap();
        assert_eq!(found.name, "MAT 343 Linear Algebra");

        let names = ["Algebra"];
        let found = best_match("q", Some("Linear Algebra II"), names).unwrap();
        assert_eq!(found.name, "Algebra");
    }

    #[test]
    fn test_best_match_overlap_beats_substring() {
        let names = ["Linear Algebra", "Differential Equations"];
        let found = best_match("differential equations homework", Some("linear"), names).unwrap();
        assert_eq!(found.name, "Differential Equations");
        assert_eq!(found.rule, MatchRule::WordOverlap);
    }

    #[test]
    fn test_best_match_low_overlap_falls_to_substring() {
        // 1/6 overlap is below the threshold
        let names = [
            "Foundations of Modern Physics Waves Optics Relativity",
            "Calculus I",
        ];
        let query = "physics equilibrium kinetics reaction mechanism thermodynamics";

        let found = best_match(query, Some("calc"), names).unwrap();
        assert_eq!(found.name, "Calculus I");
        assert_eq!(found.rule, MatchRule::Substring);

        assert!(best_match(query, None, names).is_none());
    }

    #[test]
    fn test_best_match_blank_proposal_ignored() {
        assert!(best_match("q", Some("  "), ["Calculus I"]).is_none());
    }

    #[test]
    fn test_keyword_match_order() {
        let names = ["Intro to Programming", "Data Structures", "Databases"];
        assert_eq!(
            keyword_match("help with structures and databases", names),
            Some("Data Structures")
        );
        assert_eq!(keyword_match("what is a tree", names), None);
    }

    #[test]
    fn test_keyword_match_is_substring() {
        let names = ["Thermodynamics"];
        assert_eq!(keyword_match("heat flow", names), None);
        assert_eq!(keyword_match("dynamics", names), Some("Thermodynamics"));
    }
}
