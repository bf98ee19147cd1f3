//! Canonical text rendering.
//!
//! Flattens a document into one labeled text blob for lexical comparison.
//! Every field is prefixed with its label ("Title:", "Question:", "Type:", ...)
//! so the same word in different fields does not read as the same token run.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use crate::document::{Item, SurveyDocument};

/// Render a document into its canonical comparison text.
///
/// Returns an empty string for a document with neither sections nor items.
/// Blank fields are skipped rather than rendered as empty labels.
pub fn render(doc: &SurveyDocument) -> String {
    if doc.is_empty() {
        return String::new();
    }

    let mut lines: Vec<String> = Vec::new();
    push_labeled(&mut lines, "Title", &doc.title);
    push_labeled(&mut lines, "Description", &doc.description);

    if !doc.metadata.methodology_tags.is_empty() {
        let tags: Vec<&str> = doc
            .metadata
            .methodology_tags
            .iter()
            .map(String::as_str)
            .collect();
        push_labeled(&mut lines, "Methodology", &tags.join(", "));
    }
    if let Some(category) = &doc.metadata.industry_category {
        push_labeled(&mut lines, "Industry", category);
    }

    if doc.is_sectioned() {
        for section in doc.sections() {
            push_labeled(&mut lines, "Section", &section.title);
            if let Some(description) = &section.description {
                push_labeled(&mut lines, "Section Description", description);
            }
            for item in &section.items {
                render_item(&mut lines, item);
            }
        }
    } else {
        for item in doc.items() {
            render_item(&mut lines, item);
        }
    }

    lines.join("\n")
}

fn render_item(lines: &mut Vec<String>, item: &Item) {
    push_labeled(lines, "Question", &item.text);
    push_labeled(lines, "Type", &item.item_type);
    if let Some(options) = item.non_empty_options() {
        let options: Vec<&str> = options
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .collect();
        push_labeled(lines, "Options", &options.join(" | "));
    }
}

fn push_labeled(lines: &mut Vec<String>, label: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        lines.push(format!("{label}: {value}"));
    }
}

/// Bounded cache of canonical text keyed by document id and version.
///
/// Documents missing either key are rendered on every call. Only rendered
/// text is cached; fitted vector spaces are always built per comparison.
pub struct RenderCache {
    entries: Option<Mutex<LruCache<(String, String), Arc<str>>>>,
}

impl RenderCache {
    /// Create a cache holding up to `capacity` renderings. 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Canonical text for `doc`, served from cache when possible.
    pub fn get_or_render(&self, doc: &SurveyDocument) -> Arc<str> {
        let (Some(entries), Some(id), Some(version)) = (&self.entries, &doc.id, &doc.version)
        else {
            return Arc::from(render(doc));
        };

        let key = (id.clone(), version.clone());
        if let Ok(mut guard) = entries.lock() {
            if let Some(text) = guard.get(&key) {
                return Arc::clone(text);
            }
        }

        let text: Arc<str> = Arc::from(render(doc));
        if let Ok(mut guard) = entries.lock() {
            guard.put(key, Arc::clone(&text));
        }
        text
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .and_then(|m| m.lock().ok().map(|guard| guard.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RenderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCache")
            .field("enabled", &self.entries.is_some())
            .field("cached", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Section, SurveyMetadata};

    fn sample() -> SurveyDocument {
        let mut doc = SurveyDocument::sectioned(
            "Shopper Study",
            vec![Section::new(
                "s1",
                "Habits",
                vec![
                    Item::new("q1", "How often do you shop online?", "single_choice")
                        .with_options(["Daily", "Weekly", " "]),
                ],
            )],
        );
        doc.description = "Understanding habits".into();
        doc.metadata = SurveyMetadata {
            methodology_tags: ["diary".to_string(), "nps".to_string()].into(),
            industry_category: Some("retail".into()),
        };
        doc
    }

    #[test]
    fn test_render_labels_in_document_order() {
        let text = render(&sample());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Title: Shopper Study",
                "Description: Understanding habits",
                "Methodology: diary, nps",
                "Industry: retail",
                "Section: Habits",
                "Question: How often do you shop online?",
                "Type: single_choice",
                "Options: Daily | Weekly",
            ]
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(render(&sample()), render(&sample()));
    }

    #[test]
    fn test_render_empty_document() {
        let mut doc = SurveyDocument::flat("Only a title", vec![]);
        doc.description = "and a description".into();
        assert_eq!(render(&doc), "");
    }

    #[test]
    fn test_render_skips_blank_fields() {
        let doc = SurveyDocument::flat("", vec![Item::new("q1", "Why?", "")]);
        assert_eq!(render(&doc), "Question: Why?");
    }

    #[test]
    fn test_cache_requires_id_and_version() {
        let cache = RenderCache::new(4);
        let mut doc = sample();
        cache.get_or_render(&doc);
        assert!(cache.is_empty());

        doc.id = Some("survey-1".into());
        doc.version = Some("3".into());
        let first = cache.get_or_render(&doc);
        let second = cache.get_or_render(&doc);
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cache_disabled_with_zero_capacity() {
        let cache = RenderCache::new(0);
        let mut doc = sample();
        doc.id = Some("survey-1".into());
        doc.version = Some("1".into());
        assert_eq!(&*cache.get_or_render(&doc), render(&doc));
        assert!(cache.is_empty());
    }
}
