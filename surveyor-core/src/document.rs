//! Survey document model and tolerant extraction.
//!
//! Documents arrive as machine-generated JSON in two shapes: sectioned
//! (`sections[].items[]`) and the legacy flat shape (`items[]`), sometimes
//! wrapped in a `final`/`raw` envelope. [`SurveyDocument::from_value`] folds
//! all of them into one canonical view so the comparators never branch on
//! input shape. Extraction never fails: parts that do not look like a section
//! or an item are skipped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

/// Envelope keys unwrapped (one level) when a document carries no content of its own.
const ENVELOPE_KEYS: &[&str] = &[
    "final",
    "finalSurvey",
    "final_survey",
    "raw",
    "rawSurvey",
    "raw_survey",
    "survey",
    "document",
];

/// One question within a survey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl Item {
    /// Convenience constructor for a free-text item.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        item_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            item_type: item_type.into(),
            options: None,
            required: None,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Options that carry text, if any.
    pub fn non_empty_options(&self) -> Option<&[String]> {
        self.options
            .as_deref()
            .filter(|opts| opts.iter().any(|o| !o.trim().is_empty()))
    }
}

/// A titled group of items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            items,
        }
    }
}

/// Tags and classification attached to a survey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyMetadata {
    #[serde(default)]
    pub methodology_tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_category: Option<String>,
}

/// How a document organizes its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Layout {
    #[serde(rename = "sections")]
    Sectioned(Vec<Section>),
    #[serde(rename = "items")]
    Flat(Vec<Item>),
}

impl Default for Layout {
    fn default() -> Self {
        Layout::Flat(Vec::new())
    }
}

/// An item together with the id of the section that holds it.
#[derive(Debug, Clone, Copy)]
pub struct LocatedItem<'a> {
    pub section_id: Option<&'a str>,
    pub item: &'a Item,
}

/// A research-survey document in canonical form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", rename_all = "camelCase")]
pub struct SurveyDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub title: String,
    pub description: String,
    pub metadata: SurveyMetadata,
    #[serde(flatten)]
    pub layout: Layout,
}

impl SurveyDocument {
    pub fn sectioned(title: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            title: title.into(),
            layout: Layout::Sectioned(sections),
            ..Default::default()
        }
    }

    pub fn flat(title: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            title: title.into(),
            layout: Layout::Flat(items),
            ..Default::default()
        }
    }

    /// Extract a document from loosely-shaped JSON.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = unwrap_envelope(value).as_object() else {
            return Self::default();
        };

        let metadata_obj = obj.get("metadata").and_then(Value::as_object);
        let lookup = |keys: &[&str]| {
            metadata_obj
                .and_then(|m| first_value(m, keys))
                .or_else(|| first_value(obj, keys))
        };

        let methodology_tags = lookup(&["methodologyTags", "methodology_tags", "methodology"])
            .map(extract_tags)
            .unwrap_or_default();
        let industry_category = lookup(&["industryCategory", "industry_category", "industry"])
            .and_then(scalar_string)
            .filter(|s| !s.trim().is_empty());

        let sections: Vec<Section> = obj
            .get("sections")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .enumerate()
                    .filter_map(|(idx, v)| extract_section(v, idx + 1))
                    .collect()
            })
            .unwrap_or_default();

        let layout = if !sections.is_empty() {
            Layout::Sectioned(sections)
        } else {
            let items = obj
                .get("items")
                .or_else(|| obj.get("questions"))
                .and_then(Value::as_array)
                .map(|arr| extract_items(arr, None))
                .unwrap_or_default();
            Layout::Flat(items)
        };

        Self {
            id: first_value(obj, &["id", "surveyId", "survey_id"]).and_then(scalar_string),
            version: first_value(obj, &["version", "versionId", "version_id"])
                .and_then(scalar_string),
            title: first_value(obj, &["title", "name"])
                .and_then(scalar_string)
                .unwrap_or_default(),
            description: obj
                .get("description")
                .and_then(scalar_string)
                .unwrap_or_default(),
            metadata: SurveyMetadata {
                methodology_tags,
                industry_category,
            },
            layout,
        }
    }

    pub fn is_sectioned(&self) -> bool {
        matches!(&self.layout, Layout::Sectioned(sections) if !sections.is_empty())
    }

    /// Sections in document order; empty for flat documents.
    pub fn sections(&self) -> &[Section] {
        match &self.layout {
            Layout::Sectioned(sections) => sections,
            Layout::Flat(_) => &[],
        }
    }

    /// All items in document order, regardless of layout.
    pub fn items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.sections()
            .iter()
            .flat_map(|s| s.items.iter())
            .chain(self.flat_items().iter())
    }

    fn flat_items(&self) -> &[Item] {
        match &self.layout {
            Layout::Flat(items) => items,
            Layout::Sectioned(_) => &[],
        }
    }

    /// All items with their owning section id.
    pub fn located_items(&self) -> Vec<LocatedItem<'_>> {
        match &self.layout {
            Layout::Sectioned(sections) => sections
                .iter()
                .flat_map(|s| {
                    s.items.iter().map(move |item| LocatedItem {
                        section_id: Some(s.id.as_str()),
                        item,
                    })
                })
                .collect(),
            Layout::Flat(items) => items
                .iter()
                .map(|item| LocatedItem {
                    section_id: None,
                    item,
                })
                .collect(),
        }
    }

    pub fn item_count(&self) -> usize {
        self.items().count()
    }

    /// True when the document has neither sections nor items.
    pub fn is_empty(&self) -> bool {
        match &self.layout {
            Layout::Sectioned(sections) => sections.is_empty(),
            Layout::Flat(items) => items.is_empty(),
        }
    }
}

impl From<Value> for SurveyDocument {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

/// Normalize text for comparison: NFKC, lowercase, whitespace collapsed and trimmed.
pub fn normalize_text(text: &str) -> String {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Unwrap one level of `final`/`raw` envelope, if present.
pub fn unwrap_envelope(value: &Value) -> &Value {
    let Some(obj) = value.as_object() else {
        return value;
    };
    if obj.contains_key("sections") || obj.contains_key("items") {
        return value;
    }
    ENVELOPE_KEYS
        .iter()
        .filter_map(|key| obj.get(*key))
        .find(|inner| inner.is_object())
        .unwrap_or(value)
}

fn first_value<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn extract_tags(value: &Value) -> BTreeSet<String> {
    let raw: Vec<String> = match value {
        Value::Array(arr) => arr.iter().filter_map(scalar_string).collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn extract_section(value: &Value, position: usize) -> Option<Section> {
    let obj = value.as_object()?;
    let id = first_value(obj, &["id", "sectionId", "section_id"])
        .and_then(scalar_string)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("section_{position}"));
    let items = obj
        .get("items")
        .or_else(|| obj.get("questions"))
        .and_then(Value::as_array)
        .map(|arr| extract_items(arr, Some(&id)))
        .unwrap_or_default();

    Some(Section {
        title: first_value(obj, &["title", "name"])
            .and_then(scalar_string)
            .unwrap_or_default(),
        description: obj
            .get("description")
            .and_then(scalar_string)
            .filter(|s| !s.trim().is_empty()),
        id,
        items,
    })
}

fn extract_items(arr: &[Value], section_id: Option<&str>) -> Vec<Item> {
    arr.iter()
        .enumerate()
        .filter_map(|(idx, v)| extract_item(v, section_id, idx + 1))
        .collect()
}

fn extract_item(value: &Value, section_id: Option<&str>, position: usize) -> Option<Item> {
    let obj = value.as_object()?;
    let id = first_value(obj, &["id", "itemId", "item_id", "questionId", "question_id"])
        .and_then(scalar_string)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| match section_id {
            Some(section) => format!("{section}_item_{position}"),
            None => format!("item_{position}"),
        });

    let options = obj.get("options").and_then(Value::as_array).map(|arr| {
        arr.iter()
            .filter_map(|opt| match opt {
                Value::Object(o) => {
                    first_value(o, &["label", "text", "value"]).and_then(scalar_string)
                }
                other => scalar_string(other),
            })
            .collect::<Vec<_>>()
    });

    Some(Item {
        id,
        text: first_value(obj, &["text", "question", "prompt"])
            .and_then(scalar_string)
            .unwrap_or_default(),
        item_type: first_value(obj, &["type", "questionType", "question_type"])
            .and_then(scalar_string)
            .unwrap_or_default(),
        options,
        required: obj.get("required").and_then(Value::as_bool),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_sectioned_document() {
        let doc = SurveyDocument::from_value(&json!({
            "title": "Customer Pulse",
            "description": "Quarterly check-in",
            "metadata": {
                "methodologyTags": ["nps", "csat"],
                "industryCategory": "retail"
            },
            "sections": [
                {"id": "s1", "title": "Intro", "items": [
                    {"id": "q1", "text": "How likely are you to recommend us?", "type": "scale"}
                ]},
                {"id": "s2", "title": "Details", "items": []}
            ]
        }));

        assert!(doc.is_sectioned());
        assert_eq!(doc.title, "Customer Pulse");
        assert_eq!(doc.sections().len(), 2);
        assert_eq!(doc.item_count(), 1);
        assert!(doc.metadata.methodology_tags.contains("nps"));
        assert_eq!(doc.metadata.industry_category.as_deref(), Some("retail"));
    }

    #[test]
    fn test_extract_flat_document() {
        let doc = SurveyDocument::from_value(&json!({
            "title": "Legacy",
            "items": [
                {"id": "a", "text": "First?", "type": "text"},
                {"id": "b", "question": "Second?", "type": "choice", "options": ["Yes", "No", 3]}
            ]
        }));

        assert!(!doc.is_sectioned());
        assert!(doc.sections().is_empty());
        let items: Vec<_> = doc.items().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text, "Second?");
        assert_eq!(
            items[1].options.as_deref(),
            Some(&["Yes".to_string(), "No".to_string(), "3".to_string()][..])
        );
    }

    #[test]
    fn test_unwraps_one_envelope_level() {
        let doc = SurveyDocument::from_value(&json!({
            "final": {"title": "Wrapped", "items": [{"text": "Q?", "type": "text"}]}
        }));
        assert_eq!(doc.title, "Wrapped");
        assert_eq!(doc.item_count(), 1);

        // Only one level is unwrapped.
        let nested = SurveyDocument::from_value(&json!({
            "final": {"raw": {"title": "Deep", "items": [{"text": "Q?"}]}}
        }));
        assert!(nested.is_empty());
    }

    #[test]
    fn test_malformed_parts_are_skipped() {
        let doc = SurveyDocument::from_value(&json!({
            "title": 42,
            "metadata": {"methodologyTags": "nps, ,diary"},
            "sections": [
                "not a section",
                {"title": "No id", "items": [null, {"text": "Kept"}, 7]}
            ]
        }));

        assert_eq!(doc.title, "42");
        assert_eq!(doc.metadata.methodology_tags.len(), 2);
        assert_eq!(doc.sections().len(), 1);
        assert_eq!(doc.sections()[0].id, "section_2");
        assert_eq!(doc.item_count(), 1);
        assert_eq!(doc.sections()[0].items[0].id, "section_2_item_2");
    }

    #[test]
    fn test_non_object_input_is_empty() {
        assert!(SurveyDocument::from_value(&json!("just text")).is_empty());
        assert!(SurveyDocument::from_value(&Value::Null).is_empty());
    }

    #[test]
    fn test_empty_sections_fall_back_to_items() {
        let doc = SurveyDocument::from_value(&json!({
            "sections": [],
            "items": [{"text": "Flat question"}]
        }));
        assert!(!doc.is_sectioned());
        assert_eq!(doc.item_count(), 1);
    }

    #[test]
    fn test_deserialize_goes_through_extraction() {
        let doc: SurveyDocument = serde_json::from_str(
            r#"{"survey": {"title": "T", "industry_category": "health",
                "items": [{"prompt": "P?"}]}}"#,
        )
        .unwrap();
        assert_eq!(doc.title, "T");
        assert_eq!(doc.metadata.industry_category.as_deref(), Some("health"));
        assert_eq!(doc.items().next().map(|i| i.text.as_str()), Some("P?"));
    }

    #[test]
    fn test_serialize_uses_layout_key() {
        let doc = SurveyDocument::flat("T", vec![Item::new("q1", "Q?", "text")]);
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("items").is_some());
        assert!(value.get("sections").is_none());

        let back = SurveyDocument::from_value(&value);
        assert_eq!(back, doc);
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  How   OFTEN\tdo you\n shop? "), "how often do you shop?");
        assert_eq!(normalize_text("ﬁne"), "fine");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_located_items_carry_section() {
        let doc = SurveyDocument::sectioned(
            "T",
            vec![
                Section::new("a", "A", vec![Item::new("1", "x", "text")]),
                Section::new("b", "B", vec![Item::new("2", "y", "text")]),
            ],
        );
        let located = doc.located_items();
        assert_eq!(located[0].section_id, Some("a"));
        assert_eq!(located[1].section_id, Some("b"));
    }
}
