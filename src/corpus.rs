//! # Document Corpus Module
//!
//! ## Purpose
//! Typed, validated representation of the hierarchical input batch
//! (chapter → section title → section text), parsed once per synchronization
//! run so downstream components never re-check shape.
//!
//! ## Input/Output Specification
//! - **Input**: JSON object of objects of strings (outer keys = chapter names)
//! - **Output**: Read-only `Corpus` value preserving input order
//! - **Validation**: Non-object top level is fatal; malformed per-chapter
//!   values are skipped and counted, never crash the run
//!
//! ## Key Features
//! - Order-preserving iteration (chapters in input order, sections in per-chapter order)
//! - Skip counters for malformed chapters and sections
//! - JSON projection for the downstream notification payload

use crate::errors::{Result, SyncError};
use serde_json::Value;

/// One section within a chapter
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Section title, unique within its chapter
    pub title: String,
    /// Section text, may be empty
    pub content: String,
}

/// One chapter with its ordered sections
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    /// Chapter name, unique within the corpus
    pub name: String,
    /// Sections in input order
    pub sections: Vec<Section>,
}

/// In-memory corpus for one synchronization run.
///
/// Constructed once from JSON input, read-only thereafter. Chapter names are
/// unique within a corpus and section titles unique within a chapter; both
/// are guaranteed by the object keys of the source document.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    chapters: Vec<Chapter>,
    skipped_chapters: usize,
    skipped_sections: usize,
}

impl Corpus {
    /// Parse a corpus from its JSON representation.
    ///
    /// A non-object top level is a fatal configuration error. A chapter whose
    /// value is not an object, or whose name is empty, is skipped and counted;
    /// likewise a section whose value is not a string or whose title is empty.
    pub fn from_json(value: &Value) -> Result<Self> {
        let top = value.as_object().ok_or_else(|| SyncError::InvalidCorpus {
            details: "expected a JSON object with chapters as keys".to_string(),
        })?;

        let mut chapters = Vec::with_capacity(top.len());
        let mut skipped_chapters = 0;
        let mut skipped_sections = 0;

        for (chapter_name, sections_value) in top {
            let sections_obj = match sections_value.as_object() {
                Some(obj) if !chapter_name.is_empty() => obj,
                _ => {
                    tracing::warn!(chapter = %chapter_name, "Skipping malformed chapter entry");
                    skipped_chapters += 1;
                    continue;
                }
            };

            let mut sections = Vec::with_capacity(sections_obj.len());
            for (title, content_value) in sections_obj {
                match content_value.as_str() {
                    Some(content) if !title.is_empty() => sections.push(Section {
                        title: title.clone(),
                        content: content.to_string(),
                    }),
                    _ => {
                        tracing::warn!(
                            chapter = %chapter_name,
                            section = %title,
                            "Skipping malformed section entry"
                        );
                        skipped_sections += 1;
                    }
                }
            }

            chapters.push(Chapter {
                name: chapter_name.clone(),
                sections,
            });
        }

        Ok(Self {
            chapters,
            skipped_chapters,
            skipped_sections,
        })
    }

    /// Parse a corpus from a JSON string
    pub fn from_json_str(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input).map_err(|e| SyncError::InvalidCorpus {
            details: format!("invalid JSON: {}", e),
        })?;
        Self::from_json(&value)
    }

    /// Chapters in input order
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Iterate (chapter, section_title, section_content) triples in corpus order
    pub fn iter_sections(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.chapters.iter().flat_map(|chapter| {
            chapter.sections.iter().map(move |section| {
                (
                    chapter.name.as_str(),
                    section.title.as_str(),
                    section.content.as_str(),
                )
            })
        })
    }

    /// Total number of sections across all chapters
    pub fn section_count(&self) -> usize {
        self.chapters.iter().map(|c| c.sections.len()).sum()
    }

    /// Number of chapters
    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// Number of malformed chapter entries dropped during parsing
    pub fn skipped_chapters(&self) -> usize {
        self.skipped_chapters
    }

    /// Number of malformed section entries dropped during parsing
    pub fn skipped_sections(&self) -> usize {
        self.skipped_sections
    }

    pub fn is_empty(&self) -> bool {
        self.section_count() == 0
    }

    /// Project the corpus back to its JSON wire shape, for the notification payload
    pub fn to_json(&self) -> Value {
        let mut top = serde_json::Map::new();
        for chapter in &self.chapters {
            let mut sections = serde_json::Map::new();
            for section in &chapter.sections {
                sections.insert(section.title.clone(), Value::String(section.content.clone()));
            }
            top.insert(chapter.name.clone(), Value::Object(sections));
        }
        Value::Object(top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_corpus() {
        let corpus = Corpus::from_json(&json!({
            "Chapter 1": {"Definitions": "means any person...", "Scope": ""},
            "Chapter 2": {"Penalties": "a fine not exceeding..."}
        }))
        .unwrap();

        assert_eq!(corpus.chapter_count(), 2);
        assert_eq!(corpus.section_count(), 3);
        assert_eq!(corpus.skipped_chapters(), 0);

        let triples: Vec<_> = corpus.iter_sections().collect();
        assert_eq!(triples[0], ("Chapter 1", "Definitions", "means any person..."));
        assert_eq!(triples[1], ("Chapter 1", "Scope", ""));
        assert_eq!(triples[2], ("Chapter 2", "Penalties", "a fine not exceeding..."));
    }

    #[test]
    fn test_top_level_must_be_object() {
        let err = Corpus::from_json(&json!(["Chapter 1"])).unwrap_err();
        assert_eq!(err.category(), "corpus");

        assert!(Corpus::from_json(&json!("not a corpus")).is_err());
        assert!(Corpus::from_json_str("[1, 2, 3").is_err());
    }

    #[test]
    fn test_malformed_chapter_skipped_not_fatal() {
        let corpus = Corpus::from_json(&json!({
            "Chapter 1": {"Definitions": "means any person..."},
            "Chapter 2": "not a mapping",
            "Chapter 3": {"Penalties": "a fine..."}
        }))
        .unwrap();

        assert_eq!(corpus.chapter_count(), 2);
        assert_eq!(corpus.skipped_chapters(), 1);
        let names: Vec<_> = corpus.chapters().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Chapter 1", "Chapter 3"]);
    }

    #[test]
    fn test_malformed_section_skipped_siblings_kept() {
        let corpus = Corpus::from_json(&json!({
            "Chapter 1": {
                "Definitions": "means any person...",
                "Broken": 42,
                "Scope": "applies to..."
            }
        }))
        .unwrap();

        assert_eq!(corpus.section_count(), 2);
        assert_eq!(corpus.skipped_sections(), 1);
    }

    #[test]
    fn test_preserves_input_order() {
        let corpus =
            Corpus::from_json_str(r#"{"Zebra": {"z": "1"}, "Alpha": {"a": "2"}, "Mid": {"m": "3"}}"#)
                .unwrap();
        let names: Vec<_> = corpus.chapters().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zebra", "Alpha", "Mid"]);
    }

    #[test]
    fn test_to_json_roundtrip() {
        let input = json!({
            "Chapter 1": {"Definitions": "means any person..."}
        });
        let corpus = Corpus::from_json(&input).unwrap();
        assert_eq!(corpus.to_json(), input);
    }

    #[test]
    fn test_empty_corpus() {
        let corpus = Corpus::from_json(&json!({})).unwrap();
        assert!(corpus.is_empty());
        assert_eq!(corpus.iter_sections().count(), 0);
    }
}
