//! The comparison facade.
//!
//! [`SurveyComparator`] is built once from a validated [`CompareConfig`] and
//! shared freely: every call fits its own vector space, and the only shared
//! state is the canonical-text cache behind a mutex.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::compare::{SimilarityResult, compare_rendered};
use crate::config::CompareConfig;
use crate::diff::{self, DiffResult, Lineage};
use crate::document::{Item, SurveyDocument};
use crate::error::Result;
use crate::lexical::{LexicalScorer, TextCapabilities};
use crate::matching::{CorpusMatchResult, ItemMatcher, MatchResult};
use crate::render::RenderCache;

/// A reference document ranked by similarity to a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedReference {
    pub reference_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub similarity: SimilarityResult,
}

/// Compares, matches and diffs survey documents.
#[derive(Debug)]
pub struct SurveyComparator {
    config: CompareConfig,
    scorer: LexicalScorer,
    matcher: ItemMatcher,
    renders: RenderCache,
}

impl Default for SurveyComparator {
    fn default() -> Self {
        Self::build(CompareConfig::default(), None)
    }
}

impl SurveyComparator {
    /// Create a comparator after validating `config`.
    pub fn new(config: CompareConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, None))
    }

    /// Create a comparator with explicit text capabilities, overriding `config.lexical`.
    pub fn with_capabilities(
        config: CompareConfig,
        capabilities: TextCapabilities,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, Some(capabilities)))
    }

    fn build(config: CompareConfig, capabilities: Option<TextCapabilities>) -> Self {
        let capabilities =
            capabilities.unwrap_or_else(|| TextCapabilities::from_config(&config.lexical));
        let scorer = LexicalScorer::new(capabilities);
        tracing::debug!(
            vector_space = capabilities.vector_space_available(),
            render_cache = config.cache.render_cache_size,
            "Created survey comparator"
        );
        Self {
            matcher: ItemMatcher::new(scorer, &config.matching),
            renders: RenderCache::new(config.cache.render_cache_size),
            scorer,
            config,
        }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    pub fn render_cache(&self) -> &RenderCache {
        &self.renders
    }

    /// Overall similarity in `[0, 1]`.
    pub fn similarity(&self, a: &SurveyDocument, b: &SurveyDocument) -> f64 {
        self.similarity_detailed(a, b).overall
    }

    /// Similarity with its per-signal breakdown.
    pub fn similarity_detailed(&self, a: &SurveyDocument, b: &SurveyDocument) -> SimilarityResult {
        let text_a = self.renders.get_or_render(a);
        let text_b = self.renders.get_or_render(b);
        compare_rendered(a, b, &text_a, &text_b, &self.config, &self.scorer)
    }

    /// Diff two loosely-shaped JSON documents.
    pub fn diff(
        &self,
        a: &Value,
        b: &Value,
        lineage_a: Option<&Lineage>,
        lineage_b: Option<&Lineage>,
    ) -> DiffResult {
        diff::diff_values(a, b, lineage_a, lineage_b, &self.config, &self.scorer)
    }

    pub fn diff_documents(
        &self,
        a: &SurveyDocument,
        b: &SurveyDocument,
        lineage_a: Option<&Lineage>,
        lineage_b: Option<&Lineage>,
    ) -> DiffResult {
        diff::diff_documents(a, b, lineage_a, lineage_b, &self.config, &self.scorer)
    }

    pub fn diff_json(
        &self,
        a: &str,
        b: &str,
        lineage_a: Option<&Lineage>,
        lineage_b: Option<&Lineage>,
    ) -> DiffResult {
        diff::diff_json(a, b, lineage_a, lineage_b, &self.config, &self.scorer)
    }

    pub fn match_items(&self, a: &[Item], b: &[Item]) -> MatchResult {
        self.matcher.match_items(a, b)
    }

    pub fn match_across_references(
        &self,
        items: &[Item],
        references: &[SurveyDocument],
    ) -> CorpusMatchResult {
        self.matcher.match_across_references(items, references)
    }

    /// References ordered by similarity to `candidate`, best first.
    ///
    /// Ties keep input order. `top_k == 0` returns every reference.
    pub fn rank_references(
        &self,
        candidate: &SurveyDocument,
        references: &[SurveyDocument],
        top_k: usize,
    ) -> Vec<RankedReference> {
        let mut ranked: Vec<RankedReference> = references
            .iter()
            .enumerate()
            .map(|(reference_index, reference)| RankedReference {
                reference_index,
                reference_id: reference.id.clone(),
                similarity: self.similarity_detailed(candidate, reference),
            })
            .collect();

        ranked.sort_by(|x, y| {
            y.similarity
                .overall
                .partial_cmp(&x.similarity.overall)
                .unwrap_or(Ordering::Equal)
                .then(x.reference_index.cmp(&y.reference_index))
        });
        if top_k > 0 {
            ranked.truncate(top_k);
        }
        ranked
    }
}

/// [`SurveyComparator::similarity`] with the default configuration.
pub fn similarity(a: &SurveyDocument, b: &SurveyDocument) -> f64 {
    SurveyComparator::default().similarity(a, b)
}

/// [`SurveyComparator::similarity_detailed`] with the default configuration.
pub fn similarity_detailed(a: &SurveyDocument, b: &SurveyDocument) -> SimilarityResult {
    SurveyComparator::default().similarity_detailed(a, b)
}

/// [`SurveyComparator::diff`] with the default configuration.
pub fn diff(
    a: &Value,
    b: &Value,
    lineage_a: Option<&Lineage>,
    lineage_b: Option<&Lineage>,
) -> DiffResult {
    SurveyComparator::default().diff(a, b, lineage_a, lineage_b)
}

/// [`SurveyComparator::match_items`] with the default configuration.
pub fn match_items(a: &[Item], b: &[Item]) -> MatchResult {
    SurveyComparator::default().match_items(a, b)
}

/// [`SurveyComparator::match_across_references`] with the default configuration.
pub fn match_across_references(items: &[Item], references: &[SurveyDocument]) -> CorpusMatchResult {
    SurveyComparator::default().match_across_references(items, references)
}

/// [`SurveyComparator::rank_references`] with the default configuration.
pub fn rank_references(
    candidate: &SurveyDocument,
    references: &[SurveyDocument],
    top_k: usize,
) -> Vec<RankedReference> {
    SurveyComparator::default().rank_references(candidate, references, top_k)
}
