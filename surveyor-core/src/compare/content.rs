//! Content signal: item text only, ignoring titles and narrative fields.

use crate::document::SurveyDocument;
use crate::lexical::LexicalScorer;

/// Neutral score when either side has no item text; the structural signal
/// already accounts for missing items.
const NO_ITEMS: f64 = 0.5;

pub fn content_similarity(a: &SurveyDocument, b: &SurveyDocument, scorer: &LexicalScorer) -> f64 {
    let (text_a, text_b) = (item_text(a), item_text(b));
    if text_a.is_empty() || text_b.is_empty() {
        return NO_ITEMS;
    }
    scorer.score(&text_a, &text_b)
}

fn item_text(doc: &SurveyDocument) -> String {
    doc.items()
        .map(|item| item.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
