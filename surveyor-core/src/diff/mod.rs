//! Structural diff between two survey documents.
//!
//! Items are aligned by content through [`ItemMatcher`], never by id. Each
//! matched pair is then checked field by field; an explicit field change
//! always marks the item `modified`, and only a field-identical pair is
//! judged by its match score. Section statuses are derived from the items
//! they hold and are never computed on their own.
//!
//! Every entry point returns a [`DiffResult`]. Bad input and internal panics
//! become a zero-valued result with `error` set.

pub mod lineage;
pub mod types;

pub use lineage::{Lineage, classify, quality_delta};
pub use types::{
    ComparisonType, DiffResult, DiffStatus, DiffSummary, ItemDiff, ItemField, SectionDiff,
    StatusCounts,
};

use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};

use crate::config::CompareConfig;
use crate::document::{Item, LocatedItem, SurveyDocument, normalize_text};
use crate::lexical::LexicalScorer;
use crate::matching::{ItemMatcher, MatchedPair, option_set};

/// Diff two typed documents. Side A is the newer (candidate) document.
pub fn diff_documents(
    a: &SurveyDocument,
    b: &SurveyDocument,
    lineage_a: Option<&Lineage>,
    lineage_b: Option<&Lineage>,
    config: &CompareConfig,
    scorer: &LexicalScorer,
) -> DiffResult {
    guarded(|| diff_checked(a, b, lineage_a, lineage_b, config, scorer))
}

/// Diff two loosely-shaped JSON documents, unwrapping one envelope level.
pub fn diff_values(
    a: &Value,
    b: &Value,
    lineage_a: Option<&Lineage>,
    lineage_b: Option<&Lineage>,
    config: &CompareConfig,
    scorer: &LexicalScorer,
) -> DiffResult {
    guarded(|| {
        for (side, value) in [("A", a), ("B", b)] {
            if !value.is_object() {
                return DiffResult::failed(format!("document {side} is not a JSON object"));
            }
        }
        let doc_a = SurveyDocument::from_value(a);
        let doc_b = SurveyDocument::from_value(b);
        diff_checked(&doc_a, &doc_b, lineage_a, lineage_b, config, scorer)
    })
}

/// Diff two documents given as JSON text.
pub fn diff_json(
    a: &str,
    b: &str,
    lineage_a: Option<&Lineage>,
    lineage_b: Option<&Lineage>,
    config: &CompareConfig,
    scorer: &LexicalScorer,
) -> DiffResult {
    let value_a: Value = match serde_json::from_str(a) {
        Ok(value) => value,
        Err(err) => return DiffResult::failed(format!("document A is not valid JSON: {err}")),
    };
    let value_b: Value = match serde_json::from_str(b) {
        Ok(value) => value,
        Err(err) => return DiffResult::failed(format!("document B is not valid JSON: {err}")),
    };
    diff_values(&value_a, &value_b, lineage_a, lineage_b, config, scorer)
}

/// Run `f`, converting a panic into a failed result.
fn guarded<F>(f: F) -> DiffResult
where
    F: FnOnce() -> DiffResult,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(error = %message, "Diff failed unexpectedly");
            DiffResult::failed(format!("diff failed unexpectedly: {message}"))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn diff_checked(
    a: &SurveyDocument,
    b: &SurveyDocument,
    lineage_a: Option<&Lineage>,
    lineage_b: Option<&Lineage>,
    config: &CompareConfig,
    scorer: &LexicalScorer,
) -> DiffResult {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return DiffResult::failed("both documents are empty"),
        (true, false) => return DiffResult::failed("document A has no sections or items"),
        (false, true) => return DiffResult::failed("document B has no sections or items"),
        (false, false) => {}
    }

    let comparison_type = classify(lineage_a, lineage_b);
    let located_a = a.located_items();
    let located_b = b.located_items();
    let items_a: Vec<&Item> = located_a.iter().map(|l| l.item).collect();
    let items_b: Vec<&Item> = located_b.iter().map(|l| l.item).collect();

    let matcher = ItemMatcher::new(*scorer, &config.matching);
    let matched = matcher.match_refs(&items_a, &items_b);
    let pair_by_a: HashMap<usize, &MatchedPair> =
        matched.matched_pairs.iter().map(|p| (p.a_index, p)).collect();
    let matched_b: HashSet<usize> = matched.matched_pairs.iter().map(|p| p.b_index).collect();

    let mut items = Vec::new();
    let mut status_a: Vec<Option<DiffStatus>> = vec![None; located_a.len()];
    let mut status_b: Vec<Option<DiffStatus>> = vec![None; located_b.len()];

    for (idx, located) in located_a.iter().enumerate() {
        if !has_text(located.item) {
            continue;
        }
        let diff = match pair_by_a.get(&idx) {
            Some(pair) => {
                let partner = items_b[pair.b_index];
                let changed_fields = changed_fields(located.item, partner);
                let status = if !changed_fields.is_empty()
                    || pair.score < config.diff.preserved_threshold
                {
                    DiffStatus::Modified
                } else {
                    DiffStatus::Preserved
                };
                status_b[pair.b_index] = Some(status);
                ItemDiff {
                    id: located.item.id.clone(),
                    status,
                    similarity: Some(pair.score),
                    changed_fields,
                    section_id: located.section_id.map(String::from),
                    reference_id: Some(partner.id.clone()),
                }
            }
            None => unmatched(located, DiffStatus::Added),
        };
        status_a[idx] = Some(diff.status);
        items.push(diff);
    }

    for (idx, located) in located_b.iter().enumerate() {
        if !has_text(located.item) || matched_b.contains(&idx) {
            continue;
        }
        status_b[idx] = Some(DiffStatus::Removed);
        items.push(unmatched(located, DiffStatus::Removed));
    }

    let sections = section_diffs(a, b, &located_a, &status_a, &located_b, &status_b);

    let mut summary = DiffSummary {
        items: items.iter().map(|i| &i.status).collect(),
        sections: sections.iter().map(|s| &s.status).collect(),
        ..Default::default()
    };
    if comparison_type == ComparisonType::Version {
        fill_regeneration(&mut summary, a, lineage_a, lineage_b);
    }

    tracing::debug!(
        comparison = ?comparison_type,
        items_changed = summary.items.changed(),
        sections_changed = summary.sections.changed(),
        match_rate = matched.match_rate,
        "Diffed documents"
    );

    DiffResult {
        comparison_type,
        sections,
        items,
        summary,
        quality_delta: quality_delta(lineage_a, lineage_b),
        error: None,
    }
}

fn has_text(item: &Item) -> bool {
    !normalize_text(&item.text).is_empty()
}

fn unmatched(located: &LocatedItem<'_>, status: DiffStatus) -> ItemDiff {
    ItemDiff {
        id: located.item.id.clone(),
        status,
        similarity: None,
        changed_fields: BTreeSet::new(),
        section_id: located.section_id.map(String::from),
        reference_id: None,
    }
}

/// Explicit field differences between two matched items.
fn changed_fields(a: &Item, b: &Item) -> BTreeSet<ItemField> {
    let mut changed = BTreeSet::new();
    if normalize_text(&a.text) != normalize_text(&b.text) {
        changed.insert(ItemField::Text);
    }
    if normalize_type(&a.item_type) != normalize_type(&b.item_type) {
        changed.insert(ItemField::Type);
    }
    if option_set(a).unwrap_or_default() != option_set(b).unwrap_or_default() {
        changed.insert(ItemField::Options);
    }
    if a.required.unwrap_or(false) != b.required.unwrap_or(false) {
        changed.insert(ItemField::Required);
    }
    changed
}

fn normalize_type(item_type: &str) -> String {
    item_type.trim().to_lowercase()
}

/// Section statuses derived from the statuses of the items they hold.
///
/// A sections come first in document order, then B-only sections in B order.
fn section_diffs(
    a: &SurveyDocument,
    b: &SurveyDocument,
    located_a: &[LocatedItem<'_>],
    status_a: &[Option<DiffStatus>],
    located_b: &[LocatedItem<'_>],
    status_b: &[Option<DiffStatus>],
) -> Vec<SectionDiff> {
    let ids_a: HashSet<&str> = a.sections().iter().map(|s| s.id.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut sections = Vec::new();

    for section in a.sections() {
        if !seen.insert(section.id.as_str()) {
            continue;
        }
        let changed_a = count_in_section(located_a, status_a, &section.id, DiffStatus::is_changed);
        let diff = match b.sections().iter().find(|s| s.id == section.id) {
            Some(other) => {
                let removed_b = count_in_section(located_b, status_b, &section.id, is_removed);
                let items_changed = changed_a + removed_b;
                let status = if items_changed > 0 || section.items.len() != other.items.len() {
                    DiffStatus::Modified
                } else {
                    DiffStatus::Preserved
                };
                SectionDiff {
                    id: section.id.clone(),
                    status,
                    item_count_a: section.items.len(),
                    item_count_b: other.items.len(),
                    items_changed,
                }
            }
            None => SectionDiff {
                id: section.id.clone(),
                status: DiffStatus::Added,
                item_count_a: section.items.len(),
                item_count_b: 0,
                items_changed: changed_a,
            },
        };
        sections.push(diff);
    }

    for section in b.sections() {
        if ids_a.contains(section.id.as_str()) || !seen.insert(section.id.as_str()) {
            continue;
        }
        sections.push(SectionDiff {
            id: section.id.clone(),
            status: DiffStatus::Removed,
            item_count_a: 0,
            item_count_b: section.items.len(),
            items_changed: count_in_section(located_b, status_b, &section.id, is_removed),
        });
    }

    sections
}

/// Items of section `id` whose status satisfies `pred`.
fn count_in_section(
    located: &[LocatedItem<'_>],
    statuses: &[Option<DiffStatus>],
    id: &str,
    pred: fn(DiffStatus) -> bool,
) -> usize {
    located
        .iter()
        .zip(statuses)
        .filter(|(l, _)| l.section_id == Some(id))
        .filter_map(|(_, status)| *status)
        .filter(|status| pred(*status))
        .count()
}

fn is_removed(status: DiffStatus) -> bool {
    status == DiffStatus::Removed
}

/// Regenerated and carried-over sections for a version comparison.
fn fill_regeneration(
    summary: &mut DiffSummary,
    a: &SurveyDocument,
    lineage_a: Option<&Lineage>,
    lineage_b: Option<&Lineage>,
) {
    let Some(source) = [lineage_a, lineage_b]
        .into_iter()
        .flatten()
        .find(|l| l.regenerated_sections.is_some() || l.carried_over_sections.is_some())
    else {
        return;
    };

    let regenerated = source.regenerated_sections.clone();
    let carried_over = source.carried_over_sections.clone().or_else(|| {
        regenerated.as_ref().map(|regen| {
            a.sections()
                .iter()
                .map(|s| s.id.clone())
                .filter(|id| !regen.contains(id))
                .collect()
        })
    });
    summary.regenerated_sections = regenerated;
    summary.carried_over_sections = carried_over;
}
