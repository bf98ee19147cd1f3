//! Corpus-wide matching: "has this been asked anywhere before?"
//!
//! Side B is the union of all reference items, in reference order and then
//! item order. Greedy consumption still guarantees that no reference item is
//! claimed twice; usage across references is not balanced.

use serde::{Deserialize, Serialize};

use super::{ItemMatcher, MatchResult};
use crate::document::{Item, SurveyDocument};

/// Where a matched reference item came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSource {
    pub reference_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    /// Position within the reference document's flattened items.
    pub item_index: usize,
}

/// Match count attributed to one reference document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceUsage {
    pub reference_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub matches: usize,
}

/// Match result whose pairs carry their source reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusMatchResult {
    #[serde(flatten)]
    pub result: MatchResult,
    /// Every reference document in input order, including those with no matches.
    pub reference_usage: Vec<ReferenceUsage>,
}

impl CorpusMatchResult {
    /// Indices of references that contributed at least one match.
    pub fn contributing_references(&self) -> Vec<usize> {
        self.reference_usage
            .iter()
            .filter(|u| u.matches > 0)
            .map(|u| u.reference_index)
            .collect()
    }
}

impl ItemMatcher {
    /// Match `items` against the pooled items of every reference document.
    pub fn match_across_references(
        &self,
        items: &[Item],
        references: &[SurveyDocument],
    ) -> CorpusMatchResult {
        let mut pool: Vec<&Item> = Vec::new();
        let mut origins: Vec<(usize, usize)> = Vec::new();
        for (reference_index, reference) in references.iter().enumerate() {
            for (item_index, item) in reference.items().enumerate() {
                pool.push(item);
                origins.push((reference_index, item_index));
            }
        }

        let candidates: Vec<&Item> = items.iter().collect();
        let mut result = self.match_refs(&candidates, &pool);

        let mut reference_usage: Vec<ReferenceUsage> = references
            .iter()
            .enumerate()
            .map(|(reference_index, reference)| ReferenceUsage {
                reference_index,
                reference_id: reference.id.clone(),
                matches: 0,
            })
            .collect();

        for pair in &mut result.matched_pairs {
            let Some(&(reference_index, item_index)) = origins.get(pair.b_index) else {
                continue;
            };
            reference_usage[reference_index].matches += 1;
            pair.source = Some(ReferenceSource {
                reference_index,
                reference_id: references[reference_index].id.clone(),
                item_index,
            });
        }

        tracing::debug!(
            references = references.len(),
            pooled_items = pool.len(),
            matches = result.matched_pairs.len(),
            "Matched items across references"
        );

        CorpusMatchResult {
            result,
            reference_usage,
        }
    }
}
