//! Generation bookkeeping supplied next to each document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::types::ComparisonType;

/// Lineage metadata for one side of a diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lineage {
    #[serde(default, alias = "parent_request_id")]
    pub parent_request_id: Option<String>,
    /// Held-out reference example.
    #[serde(default, alias = "is_reference", alias = "heldOut", alias = "held_out")]
    pub is_reference: bool,
    #[serde(default, alias = "regenerated_sections")]
    pub regenerated_sections: Option<Vec<String>>,
    #[serde(default, alias = "carried_over_sections")]
    pub carried_over_sections: Option<Vec<String>>,
    #[serde(default, alias = "quality_scores")]
    pub quality_scores: Option<BTreeMap<String, f64>>,
}

impl Lineage {
    pub fn with_parent(parent_request_id: impl Into<String>) -> Self {
        Self {
            parent_request_id: Some(parent_request_id.into()),
            ..Default::default()
        }
    }

    pub fn reference() -> Self {
        Self {
            is_reference: true,
            ..Default::default()
        }
    }

    /// Lenient parse; unusable lineage is treated as absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value.clone()) {
            Ok(lineage) => Some(lineage),
            Err(err) => {
                tracing::debug!(error = %err, "Ignoring malformed lineage");
                None
            }
        }
    }

    fn parent(&self) -> Option<&str> {
        self.parent_request_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Classify a comparison from the lineage of both sides.
pub fn classify(a: Option<&Lineage>, b: Option<&Lineage>) -> ComparisonType {
    let parent_a = a.and_then(Lineage::parent);
    let parent_b = b.and_then(Lineage::parent);
    if parent_a.is_some() && parent_a == parent_b {
        return ComparisonType::Version;
    }
    if b.is_some_and(|l| l.is_reference) {
        return ComparisonType::Reference;
    }
    ComparisonType::Arbitrary
}

/// `A - B` for every metric both sides score; `None` without overlap.
pub fn quality_delta(a: Option<&Lineage>, b: Option<&Lineage>) -> Option<BTreeMap<String, f64>> {
    let scores_a = a?.quality_scores.as_ref()?;
    let scores_b = b?.quality_scores.as_ref()?;
    let delta: BTreeMap<String, f64> = scores_a
        .iter()
        .filter_map(|(metric, va)| scores_b.get(metric).map(|vb| (metric.clone(), va - vb)))
        .collect();
    (!delta.is_empty()).then_some(delta)
}
