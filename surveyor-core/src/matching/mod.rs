//! Content-based item matching.
//!
//! Items are paired by what they ask, never by id: ids are assigned per
//! generation run and carry no meaning across documents. Matching is a greedy
//! bipartite assignment over the lexical score matrix:
//!
//! 1. Normalize item text; empty items take no part (nor count in totals)
//! 2. Score every pair with one fitted vector space (or token overlap)
//! 3. Keep pairs at or above the minimum score
//! 4. Commit pairs best-first, skipping any that reuse an index
//!
//! Step 4 binds each item to its best *available* partner, so a strong pair
//! later in the list is never blocked by a weak pair found earlier.

pub mod multi;

pub use multi::{CorpusMatchResult, ReferenceSource, ReferenceUsage};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::config::MatchingConfig;
use crate::document::{Item, normalize_text};
use crate::lexical::{LexicalScorer, SimilarityMatrix, set_jaccard};

/// One committed item association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPair {
    /// Position in the side-A item list.
    pub a_index: usize,
    /// Position in the side-B item list.
    pub b_index: usize,
    pub score: f64,
    /// Jaccard of normalized option sets when both items have options.
    pub option_overlap: Option<f64>,
    /// Originating reference document, for corpus-wide matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ReferenceSource>,
}

/// Matched pairs plus match-quality statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub matched_pairs: Vec<MatchedPair>,
    pub match_rate: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub total_a: usize,
    pub total_b: usize,
}

impl MatchResult {
    fn from_pairs(matched_pairs: Vec<MatchedPair>, total_a: usize, total_b: usize) -> Self {
        let matches = matched_pairs.len() as f64;
        let ratio = |denominator: usize| {
            if denominator == 0 {
                0.0
            } else {
                matches / denominator as f64
            }
        };

        let recall = ratio(total_a);
        let precision = ratio(total_b);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            match_rate: ratio(total_a.max(total_b)),
            precision,
            recall,
            f1,
            total_a,
            total_b,
            matched_pairs,
        }
    }

    pub fn matches(&self) -> usize {
        self.matched_pairs.len()
    }

    /// The pair committed for side-A item `a_index`, if any.
    pub fn pair_for_a(&self, a_index: usize) -> Option<&MatchedPair> {
        self.matched_pairs.iter().find(|p| p.a_index == a_index)
    }
}

/// Greedy content-based matcher.
#[derive(Debug, Clone, Copy)]
pub struct ItemMatcher {
    scorer: LexicalScorer,
    min_score: f64,
}

impl Default for ItemMatcher {
    fn default() -> Self {
        Self::new(LexicalScorer::default(), &MatchingConfig::default())
    }
}

impl ItemMatcher {
    pub fn new(scorer: LexicalScorer, config: &MatchingConfig) -> Self {
        Self {
            scorer,
            min_score: config.min_score,
        }
    }

    /// Match two item lists.
    pub fn match_items(&self, a: &[Item], b: &[Item]) -> MatchResult {
        let refs_a: Vec<&Item> = a.iter().collect();
        let refs_b: Vec<&Item> = b.iter().collect();
        self.match_refs(&refs_a, &refs_b)
    }

    pub(crate) fn match_refs(&self, a: &[&Item], b: &[&Item]) -> MatchResult {
        let side_a = normalized_side(a);
        let side_b = normalized_side(b);
        let (total_a, total_b) = (side_a.len(), side_b.len());

        if total_a == 0 || total_b == 0 {
            return MatchResult::from_pairs(Vec::new(), total_a, total_b);
        }

        let texts_a: Vec<&str> = side_a.iter().map(|(_, t)| t.as_str()).collect();
        let texts_b: Vec<&str> = side_b.iter().map(|(_, t)| t.as_str()).collect();
        let matrix = self.scorer.score_matrix(&texts_a, &texts_b);

        let pairs: Vec<MatchedPair> = greedy_assign(&matrix, total_b, self.min_score)
            .into_iter()
            .map(|(row, col, score)| {
                let (a_index, b_index) = (side_a[row].0, side_b[col].0);
                MatchedPair {
                    a_index,
                    b_index,
                    score,
                    option_overlap: option_overlap(a[a_index], b[b_index]),
                    source: None,
                }
            })
            .collect();

        tracing::debug!(
            total_a,
            total_b,
            matches = pairs.len(),
            backend = ?matrix.backend,
            "Matched items"
        );

        MatchResult::from_pairs(pairs, total_a, total_b)
    }
}

/// Original positions and normalized text of items with non-empty text.
fn normalized_side(items: &[&Item]) -> Vec<(usize, String)> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| (idx, normalize_text(&item.text)))
        .filter(|(_, text)| !text.is_empty())
        .collect()
}

/// Commit candidate pairs best-first; returns `(row, col, score)` in commit order.
///
/// Ties are broken by lower row, then lower column, so results are deterministic.
fn greedy_assign(
    matrix: &SimilarityMatrix,
    cols: usize,
    min_score: f64,
) -> Vec<(usize, usize, f64)> {
    let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
    for (row, scores) in matrix.scores.iter().enumerate() {
        for (col, &score) in scores.iter().enumerate() {
            if score > 0.0 && score >= min_score {
                candidates.push((row, col, score));
            }
        }
    }

    candidates.sort_by(|x, y| {
        y.2.partial_cmp(&x.2)
            .unwrap_or(Ordering::Equal)
            .then(x.0.cmp(&y.0))
            .then(x.1.cmp(&y.1))
    });

    let mut used_rows = vec![false; matrix.rows()];
    let mut used_cols = vec![false; cols];
    let mut committed = Vec::new();
    for (row, col, score) in candidates {
        if used_rows[row] || used_cols[col] {
            continue;
        }
        used_rows[row] = true;
        used_cols[col] = true;
        committed.push((row, col, score));
    }
    committed
}

/// Normalized option set, or `None` when the item has no options.
pub(crate) fn option_set(item: &Item) -> Option<BTreeSet<String>> {
    let options = item.non_empty_options()?;
    Some(
        options
            .iter()
            .map(|o| o.trim().to_lowercase())
            .filter(|o| !o.is_empty())
            .collect(),
    )
}

fn option_overlap(a: &Item, b: &Item) -> Option<f64> {
    let set_a = option_set(a)?;
    let set_b = option_set(b)?;
    Some(set_jaccard(&set_a, &set_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::{LexicalBackend, TextCapabilities};

    fn item(id: &str, text: &str) -> Item {
        Item::new(id, text, "text")
    }

    #[test]
    fn test_matches_by_content_not_id() {
        let a = vec![
            item("a1", "How satisfied are you with our customer support team"),
            item("a2", "How likely are you to renew your subscription next year"),
        ];
        let b = vec![
            item("zz", "How likely are you to renew your subscription this year"),
            item("yy", "How satisfied are you with the customer support team"),
        ];

        let result = ItemMatcher::default().match_items(&a, &b);
        assert_eq!(result.matches(), 2);
        assert_eq!(result.pair_for_a(0).map(|p| p.b_index), Some(1));
        assert_eq!(result.pair_for_a(1).map(|p| p.b_index), Some(0));
        assert_eq!(result.match_rate, 1.0);
        assert_eq!(result.f1, 1.0);
    }

    #[test]
    fn test_greedy_takes_globally_best_partner() {
        // a0 is similar to both b0 and b1, but b0 is a near-exact match for a1.
        // Best-first commits (a1, b0) before a0 can claim b0.
        let a = vec![
            item("a0", "rate the checkout process speed"),
            item("a1", "rate the checkout process speed and ease"),
        ];
        let b = vec![
            item("b0", "rate the checkout process speed and ease"),
            item("b1", "rate the checkout speed"),
        ];

        let result = ItemMatcher::default().match_items(&a, &b);
        assert_eq!(result.pair_for_a(1).map(|p| p.b_index), Some(0));
        assert_eq!(result.pair_for_a(0).map(|p| p.b_index), Some(1));
        assert_eq!(result.matched_pairs[0].score, 1.0);
    }

    #[test]
    fn test_below_threshold_is_unmatched() {
        let a = vec![item("a", "What is your favourite colour")];
        let b = vec![item("b", "Which database engines does your team operate")];
        let result = ItemMatcher::default().match_items(&a, &b);
        assert_eq!(result.matches(), 0);
        assert_eq!(result.f1, 0.0);
        assert_eq!(result.total_a, 1);
        assert_eq!(result.total_b, 1);
    }

    #[test]
    fn test_empty_text_excluded_from_totals() {
        let a = vec![item("a0", "   "), item("a1", "Describe your role")];
        let b = vec![item("b0", "Describe your role"), item("b1", "")];
        let result = ItemMatcher::default().match_items(&a, &b);
        assert_eq!(result.total_a, 1);
        assert_eq!(result.total_b, 1);
        assert_eq!(result.matches(), 1);
        let pair = &result.matched_pairs[0];
        assert_eq!((pair.a_index, pair.b_index), (1, 0));
    }

    #[test]
    fn test_identical_short_items_match() {
        let a = vec![item("a", "A")];
        let b = vec![item("b", "A")];
        let result = ItemMatcher::default().match_items(&a, &b);
        assert_eq!(result.matches(), 1);
        assert_eq!(result.matched_pairs[0].score, 1.0);
    }

    #[test]
    fn test_empty_side_yields_zero_rates() {
        let a = vec![item("a", "Anything")];
        let result = ItemMatcher::default().match_items(&a, &[]);
        assert_eq!(result.matches(), 0);
        assert_eq!(result.match_rate, 0.0);
        assert_eq!(result.precision, 0.0);
        assert_eq!(result.recall, 0.0);
        assert_eq!(result.total_a, 1);
        assert_eq!(result.total_b, 0);
    }

    #[test]
    fn test_rates() {
        let a = vec![
            item("a0", "How old are you"),
            item("a1", "Where do you live"),
            item("a2", "What car do you drive"),
        ];
        let b = vec![item("b0", "How old are you")];
        let result = ItemMatcher::default().match_items(&a, &b);
        assert_eq!(result.matches(), 1);
        assert!((result.recall - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(result.precision, 1.0);
        assert!((result.f1 - 0.5).abs() < 1e-12);
        assert!((result.match_rate - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_option_overlap_reported_only_with_options() {
        let a = vec![
            Item::new("a0", "Preferred contact channel", "single_choice")
                .with_options(["Email", "Phone", "SMS"]),
            item("a1", "Any other comments"),
        ];
        let b = vec![
            Item::new("b0", "Preferred contact channel", "single_choice")
                .with_options([" email", "PHONE", "Post"]),
            item("b1", "Any other comments"),
        ];
        let result = ItemMatcher::default().match_items(&a, &b);
        let with_options = result.pair_for_a(0).unwrap();
        assert_eq!(with_options.option_overlap, Some(0.5));
        assert_eq!(result.pair_for_a(1).unwrap().option_overlap, None);
    }

    #[test]
    fn test_token_overlap_capability_still_matches() {
        let matcher = ItemMatcher::new(
            LexicalScorer::new(TextCapabilities::token_overlap_only()),
            &MatchingConfig::default(),
        );
        let a = vec![item("a", "How satisfied are you with delivery times")];
        let b = vec![item("b", "How satisfied are you with delivery speed")];
        let result = matcher.match_items(&a, &b);
        assert_eq!(result.matches(), 1);
    }

    #[test]
    fn test_greedy_assign_tie_break_is_deterministic() {
        let matrix = SimilarityMatrix {
            scores: vec![vec![0.8, 0.8], vec![0.8, 0.8]],
            backend: LexicalBackend::VectorSpace,
        };
        let committed = greedy_assign(&matrix, 2, 0.25);
        assert_eq!(committed, vec![(0, 0, 0.8), (1, 1, 0.8)]);
    }
}
