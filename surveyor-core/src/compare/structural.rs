//! Structural signal: how similarly two documents are shaped.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::StructuralConfig;
use crate::document::SurveyDocument;
use crate::lexical::set_jaccard;

/// Score returned when no structural check applies.
const NO_SIGNAL: f64 = 0.5;

/// Compare section layout, section ids, item-type mix and item counts.
///
/// A sectioned document compared with a flat one returns the configured
/// mismatch score without running the other checks.
pub fn structural_similarity(
    a: &SurveyDocument,
    b: &SurveyDocument,
    config: &StructuralConfig,
) -> f64 {
    if a.is_sectioned() != b.is_sectioned() {
        return config.convention_mismatch_score;
    }

    let mut checks: Vec<f64> = Vec::with_capacity(4);

    if a.is_sectioned() {
        checks.push(count_agreement(a.sections().len(), b.sections().len()));

        let ids_a = section_ids(a);
        let ids_b = section_ids(b);
        if !ids_a.is_empty() || !ids_b.is_empty() {
            checks.push(set_jaccard(&ids_a, &ids_b));
        }
    }

    let hist_a = type_frequencies(a);
    let hist_b = type_frequencies(b);
    if !hist_a.is_empty() && !hist_b.is_empty() {
        checks.push(histogram_agreement(&hist_a, &hist_b));
    }

    let (items_a, items_b) = (a.item_count(), b.item_count());
    if items_a > 0 || items_b > 0 {
        checks.push(count_agreement(items_a, items_b));
    }

    if checks.is_empty() {
        return NO_SIGNAL;
    }
    checks.iter().sum::<f64>() / checks.len() as f64
}

/// `1 - |a - b| / max(a, b)`, or 1.0 when both are zero.
fn count_agreement(a: usize, b: usize) -> f64 {
    let max = a.max(b);
    if max == 0 {
        return 1.0;
    }
    1.0 - a.abs_diff(b) as f64 / max as f64
}

fn section_ids(doc: &SurveyDocument) -> BTreeSet<&str> {
    doc.sections()
        .iter()
        .map(|s| s.id.trim())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Relative frequency of each normalized item type.
fn type_frequencies(doc: &SurveyDocument) -> BTreeMap<String, f64> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for item in doc.items() {
        let kind = item.item_type.trim().to_lowercase();
        if !kind.is_empty() {
            *counts.entry(kind).or_insert(0) += 1;
        }
    }

    let total: usize = counts.values().sum();
    counts
        .into_iter()
        .map(|(kind, count)| (kind, count as f64 / total as f64))
        .collect()
}

/// Mean of `1 - |freqA(t) - freqB(t)|` over the union of types.
fn histogram_agreement(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> f64 {
    let types: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    let total: f64 = types
        .iter()
        .map(|t| {
            let fa = a.get(*t).copied().unwrap_or(0.0);
            let fb = b.get(*t).copied().unwrap_or(0.0);
            1.0 - (fa - fb).abs()
        })
        .sum();
    total / types.len() as f64
}
