//! Pronunciation dictionary
//!
//! Whole-word, case-sensitive replacements loaded from a plain word table:
//!
//! ```text
//! # word   replacement phrase
//! SQL      sequel
//! GUI      gooey
//! ```

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::core::error::{ResourceType, Result, TtsError};

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static regex"));

/// Immutable word -> phrase table
#[derive(Debug, Clone, Default)]
pub struct PronunciationDictionary {
    entries: HashMap<String, String>,
}

impl PronunciationDictionary {
    /// Create an empty dictionary (every word passes through)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from explicit pairs
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load a dictionary table from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TtsError::not_found(
                ResourceType::Dictionary,
                path.display().to_string(),
                e.to_string(),
            )
        })?;
        let dict = Self::parse(&content);
        debug!("Loaded {} dictionary entries from {:?}", dict.len(), path);
        Ok(dict)
    }

    /// Parse the table format: first token is the word, the rest is the phrase
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let phrase: Vec<&str> = parts.collect();
            if phrase.is_empty() {
                continue;
            }
            entries.insert(word.to_string(), phrase.join(" "));
        }
        Self { entries }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a single word
    pub fn lookup(&self, word: &str) -> Option<&str> {
        self.entries.get(word).map(String::as_str)
    }

    /// Replace every mapped word in `text`; unmapped words pass through
    pub fn apply(&self, text: &str) -> String {
        if self.entries.is_empty() {
            return text.to_string();
        }
        WORD.replace_all(text, |caps: &Captures| {
            let word = &caps[0];
            self.lookup(word).unwrap_or(word).to_string()
        })
        .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_short_lines_and_comments() {
        let dict = PronunciationDictionary::parse("# header\nSQL sequel\nlonely\n\nNYC  New   York City\n");
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.lookup("SQL"), Some("sequel"));
        assert_eq!(dict.lookup("NYC"), Some("New York City"));
        assert_eq!(dict.lookup("lonely"), None);
    }

    #[test]
    fn test_whole_word_only() {
        let dict = PronunciationDictionary::from_entries([("cat", "kitty")]);
        assert_eq!(dict.apply("cat concat cat."), "kitty concat kitty.");
    }

    #[test]
    fn test_case_sensitive() {
        let dict = PronunciationDictionary::from_entries([("GUI", "gooey")]);
        assert_eq!(dict.apply("GUI gui Gui"), "gooey gui Gui");
    }

    #[test]
    fn test_empty_dictionary_is_identity() {
        let dict = PronunciationDictionary::new();
        assert_eq!(dict.apply("  spacing  stays "), "  spacing  stays ");
    }

    #[test]
    fn test_load_missing_is_lookup_failure() {
        let err = PronunciationDictionary::load("/nonexistent/dict.txt").unwrap_err();
        assert!(matches!(err, TtsError::Lookup { resource: ResourceType::Dictionary, .. }));
    }
}
