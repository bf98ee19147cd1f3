//! Property-based tests for similarity, matching and diffs using proptest.

use proptest::prelude::*;

use surveyor_core::{
    CompareConfig, Item, Section, SurveyComparator, SurveyDocument, SurveyMetadata,
    TextCapabilities,
};

// Includes one and two letter words, which the tokenizers drop or keep differently.
const WORDS: &[&str] = &[
    "price", "delivery", "support", "quality", "store", "online", "staff", "wait", "order",
    "refund", "brand", "taste", "recommend", "value", "app", "service", "a", "b", "x", "q1",
    "ok", "to",
];
const TYPES: &[&str] = &["text", "scale", "single_choice", "boolean"];

fn question() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 2..7).prop_map(|words| words.join(" "))
}

fn item(prefix: &'static str) -> impl Strategy<Value = Item> {
    (
        question(),
        prop::sample::select(TYPES),
        any::<u16>(),
        prop::option::of(any::<bool>()),
    )
        .prop_map(move |(text, kind, id, required)| {
            let mut item = Item::new(format!("{prefix}{id}"), text, kind);
            item.required = required;
            item
        })
}

/// Both scoring backends: vector space with fallback, and token overlap alone.
fn comparators() -> [SurveyComparator; 2] {
    let overlap_only = SurveyComparator::with_capabilities(
        CompareConfig::default(),
        TextCapabilities::token_overlap_only(),
    )
    .expect("default config is valid");
    [SurveyComparator::default(), overlap_only]
}

fn document() -> impl Strategy<Value = SurveyDocument> {
    let tags =
        prop::collection::btree_set(prop::sample::select(WORDS).prop_map(String::from), 0..4);
    let sectioned = prop::collection::vec(prop::collection::vec(item("s"), 1..5), 1..4).prop_map(
        |sections| {
            let sections = sections
                .into_iter()
                .enumerate()
                .map(|(n, items)| Section::new(format!("sec{n}"), format!("Part {n}"), items))
                .collect();
            SurveyDocument::sectioned("Generated survey", sections)
        },
    );
    let flat = prop::collection::vec(item("f"), 1..8)
        .prop_map(|items| SurveyDocument::flat("Generated survey", items));

    (prop_oneof![sectioned, flat], tags).prop_map(|(mut doc, methodology_tags)| {
        doc.metadata = SurveyMetadata {
            methodology_tags,
            industry_category: None,
        };
        doc
    })
}

// --- Similarity properties ---

proptest! {
    #[test]
    fn similarity_with_itself_is_one(doc in document()) {
        for comparator in comparators() {
            let score = comparator.similarity(&doc, &doc.clone());
            prop_assert!((score - 1.0).abs() <= 0.02, "score = {}", score);
        }
    }

    #[test]
    fn similarity_is_symmetric(a in document(), b in document()) {
        let comparator = SurveyComparator::default();
        let ab = comparator.similarity_detailed(&a, &b);
        let ba = comparator.similarity_detailed(&b, &a);
        prop_assert_eq!(ab.components, ba.components);
        prop_assert!((ab.overall - ba.overall).abs() < 1e-12);
    }

    #[test]
    fn similarity_is_bounded(a in document(), b in document()) {
        let result = SurveyComparator::default().similarity_detailed(&a, &b);
        prop_assert!((0.0..=1.0).contains(&result.overall));
        prop_assert!((0.0..=1.0).contains(&result.methodology_overlap));
    }
}

// --- Item matcher properties ---

proptest! {
    #[test]
    fn matcher_respects_bipartite_bounds(
        a in prop::collection::vec(item("a"), 0..10),
        b in prop::collection::vec(item("b"), 0..10),
    ) {
        for comparator in comparators() {
            let result = comparator.match_items(&a, &b);
            prop_assert!((0.0..=1.0).contains(&result.match_rate));
            prop_assert!(result.matches() <= result.total_a.min(result.total_b));

            let mut seen_a = std::collections::HashSet::new();
            let mut seen_b = std::collections::HashSet::new();
            for pair in &result.matched_pairs {
                prop_assert!(seen_a.insert(pair.a_index));
                prop_assert!(seen_b.insert(pair.b_index));
                prop_assert!(pair.score >= 0.25);
            }
        }
    }

    #[test]
    fn items_match_themselves(a in prop::collection::vec(item("a"), 1..10)) {
        for comparator in comparators() {
            let result = comparator.match_items(&a, &a.clone());
            prop_assert_eq!(result.matches(), a.len());
        }
    }
}

// --- Diff properties ---

proptest! {
    #[test]
    fn diff_with_itself_has_no_changes(doc in document()) {
        for comparator in comparators() {
            let result = comparator.diff_documents(&doc, &doc.clone(), None, None);
            prop_assert!(result.error.is_none());
            prop_assert_eq!(result.summary.items.added, 0);
            prop_assert_eq!(result.summary.items.removed, 0);
            prop_assert_eq!(result.summary.items.modified, 0);
            prop_assert_eq!(result.summary.sections.changed(), 0);
        }
    }
}
