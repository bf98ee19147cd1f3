//! Lexical similarity.
//!
//! Two strategies behind one interface:
//! - **Vector space** (primary): TF-IDF over a corpus built per call, L2-normalized,
//!   compared with cosine similarity.
//! - **Token overlap** (fallback): Jaccard over word sets.
//!
//! Which one runs is decided by a [`TextCapabilities`] value constructed once and
//! passed in, plus whether the corpus can be fitted at all. Callers always get a
//! score in `[0, 1]`; only its resolution changes when the fallback is used.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::LexicalConfig;

/// Which strategy produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexicalBackend {
    VectorSpace,
    TokenOverlap,
}

/// What the lexical scorer is allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextCapabilities {
    vector_space: bool,
    max_vocabulary: usize,
}

impl TextCapabilities {
    pub fn from_config(config: &LexicalConfig) -> Self {
        Self {
            vector_space: config.vector_space,
            max_vocabulary: config.max_vocabulary,
        }
    }

    /// Capabilities with the vector space switched off.
    pub fn token_overlap_only() -> Self {
        Self {
            vector_space: false,
            max_vocabulary: 0,
        }
    }

    pub fn vector_space_available(&self) -> bool {
        self.vector_space
    }
}

impl Default for TextCapabilities {
    fn default() -> Self {
        Self::from_config(&LexicalConfig::default())
    }
}

/// Why a vector space could not be fitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FitError {
    #[error("corpus has no usable terms")]
    EmptyVocabulary,

    #[error("vocabulary of {terms} terms exceeds limit of {limit}")]
    VocabularyTooLarge { terms: usize, limit: usize },
}

/// Pairwise scores between two text lists.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    pub scores: Vec<Vec<f64>>,
    pub backend: LexicalBackend,
}

impl SimilarityMatrix {
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.scores
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn rows(&self) -> usize {
        self.scores.len()
    }
}

/// Scores text pairs with the vector-space model, falling back to token overlap.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalScorer {
    capabilities: TextCapabilities,
}

impl LexicalScorer {
    pub fn new(capabilities: TextCapabilities) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> TextCapabilities {
        self.capabilities
    }

    /// Similarity of two texts in `[0, 1]`.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        if a.trim().is_empty() || b.trim().is_empty() {
            return 0.0;
        }
        if a == b {
            return 1.0;
        }

        if self.capabilities.vector_space {
            let docs = [tokenize(a), tokenize(b)];
            match VectorSpace::fit(&docs, self.capabilities.max_vocabulary) {
                Ok(space) => {
                    let va = space.transform(&docs[0]);
                    let vb = space.transform(&docs[1]);
                    return sparse_cosine(&va, &vb).clamp(0.0, 1.0);
                }
                Err(err) => {
                    tracing::debug!(error = %err, "Vector space unavailable, using token overlap");
                }
            }
        }

        jaccard_similarity(a, b)
    }

    /// Full score matrix between `a` and `b`.
    ///
    /// One vector space is fitted over every text on both sides; if that fails
    /// the whole matrix is computed with token overlap.
    pub fn score_matrix(&self, a: &[&str], b: &[&str]) -> SimilarityMatrix {
        if a.is_empty() || b.is_empty() {
            return SimilarityMatrix {
                scores: Vec::new(),
                backend: self.preferred_backend(),
            };
        }

        if self.capabilities.vector_space {
            let docs: Vec<Vec<String>> = a.iter().chain(b.iter()).map(|t| tokenize(t)).collect();
            match VectorSpace::fit(&docs, self.capabilities.max_vocabulary) {
                Ok(space) => {
                    let vectors: Vec<SparseVector> =
                        docs.iter().map(|tokens| space.transform(tokens)).collect();
                    let (va, vb) = vectors.split_at(a.len());
                    let scores = a
                        .iter()
                        .zip(va)
                        .map(|(text_a, vec_a)| {
                            b.iter()
                                .zip(vb)
                                .map(|(text_b, vec_b)| {
                                    matrix_cell(text_a, text_b, || {
                                        sparse_cosine(vec_a, vec_b).clamp(0.0, 1.0)
                                    })
                                })
                                .collect::<Vec<f64>>()
                        })
                        .collect();
                    return SimilarityMatrix {
                        scores,
                        backend: LexicalBackend::VectorSpace,
                    };
                }
                Err(err) => {
                    tracing::debug!(
                        error = %err,
                        rows = a.len(),
                        cols = b.len(),
                        "Vector space unavailable for matrix, using token overlap"
                    );
                }
            }
        }

        let sets_b: Vec<BTreeSet<String>> = b.iter().map(|t| token_set(t)).collect();
        let scores = a
            .iter()
            .map(|text_a| {
                let set_a = token_set(text_a);
                b.iter()
                    .zip(&sets_b)
                    .map(|(text_b, set_b)| {
                        matrix_cell(text_a, text_b, || set_jaccard(&set_a, set_b))
                    })
                    .collect::<Vec<f64>>()
            })
            .collect();
        SimilarityMatrix {
            scores,
            backend: LexicalBackend::TokenOverlap,
        }
    }

    fn preferred_backend(&self) -> LexicalBackend {
        if self.capabilities.vector_space {
            LexicalBackend::VectorSpace
        } else {
            LexicalBackend::TokenOverlap
        }
    }
}

/// Blank texts score 0.0 and equal texts 1.0 whichever backend computes the rest.
fn matrix_cell(a: &str, b: &str, similarity: impl FnOnce() -> f64) -> f64 {
    if a.trim().is_empty() || b.trim().is_empty() {
        0.0
    } else if a == b {
        1.0
    } else {
        similarity()
    }
}

/// Lowercase alphanumeric word unigrams of at least two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(String::from)
        .collect()
}

/// Word set used by the overlap fallback: tokens longer than two characters.
pub fn token_set(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(String::from)
        .collect()
}

/// Jaccard similarity of the word sets of two texts.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    set_jaccard(&token_set(a), &token_set(b))
}

/// Jaccard similarity of two sets; 0.0 when both are empty.
pub fn set_jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

type SparseVector = Vec<(usize, f64)>;

/// TF-IDF model fitted over one call's corpus.
struct VectorSpace {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl VectorSpace {
    /// Fit vocabulary and smoothed IDF (`ln((1 + n) / (1 + df)) + 1`).
    ///
    /// Term indices follow sorted term order so the model does not depend on
    /// the order documents were supplied in.
    fn fit(docs: &[Vec<String>], max_vocabulary: usize) -> Result<Self, FitError> {
        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in docs {
            let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(FitError::EmptyVocabulary);
        }
        if document_frequency.len() > max_vocabulary {
            return Err(FitError::VocabularyTooLarge {
                terms: document_frequency.len(),
                limit: max_vocabulary,
            });
        }

        let n = docs.len() as f64;
        let mut vocabulary = HashMap::with_capacity(document_frequency.len());
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (idx, (term, df)) in document_frequency.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), idx);
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
        }

        Ok(Self { vocabulary, idf })
    }

    /// L2-normalized TF-IDF vector, sorted by term index.
    fn transform(&self, tokens: &[String]) -> SparseVector {
        let mut tf: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokens {
            if let Some(&idx) = self.vocabulary.get(token) {
                *tf.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = tf
            .into_iter()
            .map(|(idx, count)| (idx, count * self.idf[idx]))
            .collect();

        let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut vector {
                *w /= norm;
            }
        }
        vector
    }
}

/// Cosine similarity of two normalized sparse vectors sorted by index.
fn sparse_cosine(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut dot = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot
}
