use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How two compared documents relate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonType {
    /// Parent and child generated from the same request.
    Version,
    /// Side B is a held-out reference example.
    Reference,
    #[default]
    Arbitrary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Added,
    Removed,
    Modified,
    Preserved,
}

impl DiffStatus {
    pub fn is_changed(self) -> bool {
        self != DiffStatus::Preserved
    }
}

/// Item fields compared explicitly for matched pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemField {
    Text,
    Type,
    Options,
    Required,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDiff {
    pub id: String,
    pub status: DiffStatus,
    pub item_count_a: usize,
    pub item_count_b: usize,
    /// Contained items whose status is not `preserved`.
    pub items_changed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDiff {
    /// Side-A item id, or the side-B id for removed items.
    pub id: String,
    pub status: DiffStatus,
    /// Match score; absent for added and removed items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub changed_fields: BTreeSet<ItemField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    /// Id of the side-B item a matched item was paired with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
}

/// Per-status tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub preserved: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: DiffStatus) {
        match status {
            DiffStatus::Added => self.added += 1,
            DiffStatus::Removed => self.removed += 1,
            DiffStatus::Modified => self.modified += 1,
            DiffStatus::Preserved => self.preserved += 1,
        }
    }

    /// Everything that is not preserved.
    pub fn changed(&self) -> usize {
        self.added + self.removed + self.modified
    }

    pub fn total(&self) -> usize {
        self.changed() + self.preserved
    }
}

impl<'a> FromIterator<&'a DiffStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = &'a DiffStatus>>(iter: I) -> Self {
        let mut counts = StatusCounts::default();
        for status in iter {
            counts.record(*status);
        }
        counts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub items: StatusCounts,
    pub sections: StatusCounts,
    /// Sections regenerated in a version comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regenerated_sections: Option<Vec<String>>,
    /// Sections carried over unchanged from the parent in a version comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carried_over_sections: Option<Vec<String>>,
}

/// Outcome of a document diff.
///
/// A failed diff is still well formed: every list is empty, every count is
/// zero and `error` says what went wrong.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub comparison_type: ComparisonType,
    pub sections: Vec<SectionDiff>,
    pub items: Vec<ItemDiff>,
    pub summary: DiffSummary,
    /// Per-metric `A - B` over quality scores both sides report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_delta: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiffResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Items with the given status.
    pub fn items_with(&self, status: DiffStatus) -> impl Iterator<Item = &ItemDiff> {
        self.items.iter().filter(move |item| item.status == status)
    }

    pub fn section(&self, id: &str) -> Option<&SectionDiff> {
        self.sections.iter().find(|s| s.id == id)
    }
}
