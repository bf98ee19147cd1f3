//! Hybrid document similarity.
//!
//! Blends four independent signals into one calibrated score:
//! 1. **Lexical**: TF-IDF cosine over the full canonical rendering, which
//!    includes narrative text (titles, descriptions) never present per item
//! 2. **Structural**: section layout, item-type mix and counts
//! 3. **Metadata**: methodology tags and industry category
//! 4. **Content**: item text only
//!
//! Each signal falls back to a documented neutral value when its input is
//! missing, so a comparison always produces a score.

pub mod content;
pub mod metadata;
pub mod structural;

pub use content::content_similarity;
pub use metadata::{metadata_similarity, methodology_overlap};
pub use structural::structural_similarity;

use serde::{Deserialize, Serialize};

use crate::config::CompareConfig;
use crate::document::SurveyDocument;
use crate::lexical::LexicalScorer;
use crate::render::render;

/// Per-signal scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityComponents {
    pub lexical: f64,
    pub structural: f64,
    pub metadata: f64,
    pub content: f64,
}

/// Blended similarity with its breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResult {
    pub overall: f64,
    pub components: SimilarityComponents,
    /// Raw methodology-tag Jaccard, reported alongside and never blended.
    pub methodology_overlap: f64,
}

impl SimilarityResult {
    fn identical(methodology_overlap: f64) -> Self {
        Self {
            overall: 1.0,
            components: SimilarityComponents {
                lexical: 1.0,
                structural: 1.0,
                metadata: 1.0,
                content: 1.0,
            },
            methodology_overlap,
        }
    }
}

/// Compare two documents, rendering both on the fly.
pub fn compare(
    a: &SurveyDocument,
    b: &SurveyDocument,
    config: &CompareConfig,
    scorer: &LexicalScorer,
) -> SimilarityResult {
    if is_identical(a, b) {
        return SimilarityResult::identical(methodology_overlap(a, b));
    }
    compare_rendered(a, b, &render(a), &render(b), config, scorer)
}

/// Compare two documents whose canonical text has already been rendered.
pub fn compare_rendered(
    a: &SurveyDocument,
    b: &SurveyDocument,
    text_a: &str,
    text_b: &str,
    config: &CompareConfig,
    scorer: &LexicalScorer,
) -> SimilarityResult {
    let overlap = methodology_overlap(a, b);
    if is_identical(a, b) {
        return SimilarityResult::identical(overlap);
    }

    let components = SimilarityComponents {
        lexical: scorer.score(text_a, text_b),
        structural: structural_similarity(a, b, &config.structural),
        metadata: metadata_similarity(a, b),
        content: content_similarity(a, b, scorer),
    };

    let w = &config.weights;
    let overall = (w.lexical * components.lexical
        + w.structural * components.structural
        + w.metadata * components.metadata
        + w.content * components.content)
        .clamp(0.0, 1.0);

    tracing::debug!(
        overall,
        lexical = components.lexical,
        structural = components.structural,
        metadata = components.metadata,
        content = components.content,
        "Compared documents"
    );

    SimilarityResult {
        overall,
        components,
        methodology_overlap: overlap,
    }
}

/// Same reference, or value-equal documents.
fn is_identical(a: &SurveyDocument, b: &SurveyDocument) -> bool {
    std::ptr::eq(a, b) || a == b
}
