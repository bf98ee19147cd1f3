//! Metadata signal: methodology tags and industry category.

use std::collections::BTreeSet;

use crate::document::SurveyDocument;
use crate::lexical::set_jaccard;

/// Score returned when neither document carries metadata.
const NO_SIGNAL: f64 = 0.5;

/// Compare methodology tags and industry category.
///
/// Tag overlap is mapped into `[0.5, 1.0]`: disjoint tags are a labeling
/// difference, not evidence that the surveys differ.
pub fn metadata_similarity(a: &SurveyDocument, b: &SurveyDocument) -> f64 {
    let mut checks: Vec<f64> = Vec::with_capacity(2);

    let tags_a = normalized_tags(a);
    let tags_b = normalized_tags(b);
    if !tags_a.is_empty() || !tags_b.is_empty() {
        checks.push(0.5 + 0.5 * set_jaccard(&tags_a, &tags_b));
    }

    match (category(a), category(b)) {
        (Some(ca), Some(cb)) => checks.push(if ca == cb { 1.0 } else { 0.0 }),
        (Some(_), None) | (None, Some(_)) => checks.push(0.5),
        (None, None) => {}
    }

    if checks.is_empty() {
        return NO_SIGNAL;
    }
    checks.iter().sum::<f64>() / checks.len() as f64
}

/// Raw Jaccard overlap of methodology tags; 0.0 when neither has tags.
pub fn methodology_overlap(a: &SurveyDocument, b: &SurveyDocument) -> f64 {
    set_jaccard(&normalized_tags(a), &normalized_tags(b))
}

fn normalized_tags(doc: &SurveyDocument) -> BTreeSet<String> {
    doc.metadata
        .methodology_tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn category(doc: &SurveyDocument) -> Option<String> {
    doc.metadata
        .industry_category
        .as_deref()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
}
