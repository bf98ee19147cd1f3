//! Configuration system for Surveyor.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from the user config directory (`surveyor/config.toml`)
//! and/or `.surveyor/config.toml` in the workspace directory.
//!
//! Every tunable here is an empirically chosen default. The weights and
//! thresholds are meant to be re-validated against a labeled comparison set
//! rather than treated as fixed.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Top-level configuration for document comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompareConfig {
    #[serde(default)]
    pub weights: SimilarityWeights,
    #[serde(default)]
    pub lexical: LexicalConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub structural: StructuralConfig,
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Blend weights for the four similarity signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    /// Weight of lexical similarity over the full canonical rendering.
    pub lexical: f64,
    /// Weight of the structural (shape) signal.
    pub structural: f64,
    /// Weight of the tag/category signal.
    pub metadata: f64,
    /// Weight of the item-text-only signal.
    pub content: f64,
}

impl SimilarityWeights {
    pub fn sum(&self) -> f64 {
        self.lexical + self.structural + self.metadata + self.content
    }
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            lexical: 0.50,
            structural: 0.20,
            metadata: 0.15,
            content: 0.15,
        }
    }
}

/// Lexical scorer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalConfig {
    /// Use the TF-IDF vector space. When false every comparison uses token Jaccard.
    #[serde(default = "default_true")]
    pub vector_space: bool,
    /// Vocabulary size above which the vector space is not fitted.
    #[serde(default = "default_max_vocabulary")]
    pub max_vocabulary: usize,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            vector_space: true,
            max_vocabulary: default_max_vocabulary(),
        }
    }
}

fn default_max_vocabulary() -> usize {
    50_000
}

/// Item matching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum pairwise score for a candidate pair.
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
        }
    }
}

fn default_min_score() -> f64 {
    0.25
}

/// Structural comparator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralConfig {
    /// Score returned when one document is sectioned and the other is flat.
    #[serde(default = "default_convention_mismatch")]
    pub convention_mismatch_score: f64,
}

impl Default for StructuralConfig {
    fn default() -> Self {
        Self {
            convention_mismatch_score: default_convention_mismatch(),
        }
    }
}

fn default_convention_mismatch() -> f64 {
    0.3
}

/// Diff classification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Minimum match score for an unchanged pair to count as preserved.
    #[serde(default = "default_preserved_threshold")]
    pub preserved_threshold: f64,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            preserved_threshold: default_preserved_threshold(),
        }
    }
}

fn default_preserved_threshold() -> f64 {
    0.9
}

/// Canonical text cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of rendered documents kept, keyed by id and version. 0 disables the cache.
    #[serde(default = "default_render_cache_size")]
    pub render_cache_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            render_cache_size: default_render_cache_size(),
        }
    }
}

fn default_render_cache_size() -> usize {
    256
}

fn default_true() -> bool {
    true
}

const WEIGHT_TOLERANCE: f64 = 1e-9;

impl CompareConfig {
    /// Check weights and thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::InvalidWeights { sum });
        }

        let unit_fields = [
            ("weights.lexical", self.weights.lexical),
            ("weights.structural", self.weights.structural),
            ("weights.metadata", self.weights.metadata),
            ("weights.content", self.weights.content),
            ("matching.min_score", self.matching.min_score),
            (
                "structural.convention_mismatch_score",
                self.structural.convention_mismatch_score,
            ),
            ("diff.preserved_threshold", self.diff.preserved_threshold),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field: field.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `SURVEYOR_`)
/// 3. Workspace-local config (`.surveyor/config.toml`)
/// 4. User config (`~/.config/surveyor/config.toml`)
/// 5. Built-in defaults
///
/// The merged result is validated before it is returned.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&CompareConfig>,
) -> Result<CompareConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(CompareConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "surveyor", "surveyor") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            tracing::debug!(path = %user_config.display(), "Merging user config");
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".surveyor").join("config.toml");
        if ws_config.exists() {
            tracing::debug!(path = %ws_config.display(), "Merging workspace config");
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (SURVEYOR_MATCHING__MIN_SCORE, SURVEYOR_WEIGHTS__LEXICAL, etc.)
    figment = figment.merge(Env::prefixed("SURVEYOR_").split("__"));

    // Explicit overrides
    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: CompareConfig = figment.extract()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = SimilarityWeights::default();
        assert!((weights.sum() - 1.0).abs() < 1e-12);
        assert_eq!(weights.lexical, 0.50);
        assert_eq!(weights.structural, 0.20);
        assert_eq!(weights.metadata, 0.15);
        assert_eq!(weights.content, 0.15);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = CompareConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.matching.min_score, 0.25);
        assert_eq!(config.diff.preserved_threshold, 0.9);
        assert_eq!(config.structural.convention_mismatch_score, 0.3);
        assert!(config.lexical.vector_space);
    }

    #[test]
    fn test_validate_rejects_unbalanced_weights() {
        let mut config = CompareConfig::default();
        config.weights.lexical = 0.6;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWeights { .. }));
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = CompareConfig::default();
        config.diff.preserved_threshold = 1.2;
        match config.validate().unwrap_err() {
            ConfigError::OutOfRange { field, .. } => {
                assert_eq!(field, "diff.preserved_threshold")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let mut config = CompareConfig::default();
        config.weights.lexical = 0.9;
        config.weights.structural = -0.2;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::OutOfRange { .. }
        ));
    }

    #[test]
    fn test_config_backward_compat() {
        // Sections missing from the document fall back to defaults.
        let json = serde_json::json!({
            "matching": { "min_score": 0.4 }
        });
        let config: CompareConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.matching.min_score, 0.4);
        assert_eq!(config.weights, SimilarityWeights::default());
        assert_eq!(config.cache.render_cache_size, 256);
    }

    #[test]
    fn test_load_config_with_overrides() {
        let mut overrides = CompareConfig::default();
        overrides.matching.min_score = 0.35;
        overrides.lexical.vector_space = false;

        let config = load_config(None, Some(&overrides)).unwrap();
        assert_eq!(config.matching.min_score, 0.35);
        assert!(!config.lexical.vector_space);
    }

    #[test]
    fn test_load_config_rejects_invalid_overrides() {
        let mut overrides = CompareConfig::default();
        overrides.weights.content = 0.5;
        assert!(load_config(None, Some(&overrides)).is_err());
    }
}
