//! Locale-aware token lookup
//!
//! The model's vocabulary tables are an injected, immutable lookup service:
//! loaded once (typically at process start) and shared read-only between
//! requests. Unknown units map to the sentinel [`UNKNOWN_TOKEN`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::core::error::{ResourceType, Result, TtsError};

/// Token emitted for units missing from the vocabulary
pub const UNKNOWN_TOKEN: u32 = 0;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static regex"));

/// Maps normalized text to model token ids for a locale
pub trait Tokenizer: Send + Sync {
    /// Deterministic locale-specific lookup
    fn tokenize(&self, text: &str, locale: &str) -> Vec<u32>;
}

/// Granularity of vocabulary entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUnit {
    /// Whole lowercase words
    #[default]
    Word,
    /// Graphemes converted by the basic English G2P
    Phoneme,
}

/// Vocabulary for one locale
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    #[serde(default)]
    pub unit: TokenUnit,
    #[serde(default)]
    pub tokens: HashMap<String, u32>,
}

impl Vocabulary {
    pub fn new(unit: TokenUnit, tokens: HashMap<String, u32>) -> Self {
        Self { unit, tokens }
    }

    fn id(&self, unit: &str) -> u32 {
        self.tokens.get(unit).copied().unwrap_or(UNKNOWN_TOKEN)
    }
}

#[derive(Debug, Deserialize)]
struct VocabularyFile {
    default_locale: Option<String>,
    #[serde(default)]
    locales: HashMap<String, Vocabulary>,
}

/// Table-driven tokenizer over per-locale vocabularies
#[derive(Debug, Clone)]
pub struct VocabularyTokenizer {
    default_locale: String,
    vocabularies: HashMap<String, Vocabulary>,
}

impl VocabularyTokenizer {
    /// Build from explicit vocabularies
    pub fn new(default_locale: impl Into<String>, vocabularies: HashMap<String, Vocabulary>) -> Self {
        Self {
            default_locale: default_locale.into(),
            vocabularies,
        }
    }

    /// A tokenizer with no tables: every unit maps to the unknown token
    pub fn empty(default_locale: impl Into<String>) -> Self {
        Self::new(default_locale, HashMap::new())
    }

    /// Load vocabularies from a YAML file
    ///
    /// ```yaml
    /// default_locale: en-US
    /// locales:
    ///   en-US: { unit: phoneme, tokens: { "θ": 1, a: 2 } }
    ///   es-ES: { unit: word, tokens: { el: 1, la: 2 } }
    /// ```
    pub fn load<P: AsRef<Path>>(path: P, fallback_locale: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TtsError::not_found(ResourceType::Vocabulary, path.display().to_string(), e.to_string())
        })?;
        let file: VocabularyFile = serde_yaml::from_str(&content).map_err(|e| TtsError::Config {
            message: format!("Failed to parse vocabulary: {}", e),
            path: Some(path.to_path_buf()),
        })?;

        debug!("Loaded vocabularies for {} locales from {:?}", file.locales.len(), path);
        Ok(Self::new(
            file.default_locale.unwrap_or_else(|| fallback_locale.to_string()),
            file.locales,
        ))
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.vocabularies.keys().map(String::as_str)
    }

    fn vocabulary_for(&self, locale: &str) -> Option<&Vocabulary> {
        self.vocabularies.get(locale).or_else(|| {
            let fallback = self.vocabularies.get(&self.default_locale);
            if fallback.is_some() {
                warn!("No vocabulary for locale {}, using {}", locale, self.default_locale);
            }
            fallback
        })
    }
}

impl Tokenizer for VocabularyTokenizer {
    fn tokenize(&self, text: &str, locale: &str) -> Vec<u32> {
        let lower = text.to_lowercase();
        let words = WORD.find_iter(&lower).map(|m| m.as_str());

        let Some(vocab) = self.vocabulary_for(locale) else {
            // No table at all: one unknown per unit so sequence length still tracks the text
            return words
                .flat_map(grapheme_to_phoneme)
                .map(|_| UNKNOWN_TOKEN)
                .collect();
        };

        match vocab.unit {
            TokenUnit::Word => words.map(|w| vocab.id(w)).collect(),
            TokenUnit::Phoneme => words
                .flat_map(grapheme_to_phoneme)
                .map(|p| vocab.id(&p))
                .collect(),
        }
    }
}

/// Basic English grapheme-to-phoneme split
///
/// `th`, `sh` and `ch` collapse into one unit; every other letter is its own unit.
pub fn grapheme_to_phoneme(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.to_lowercase().chars().collect();
    let mut phonemes = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        let digraph = chars.get(i + 1).and_then(|&next| match (chars[i], next) {
            ('t', 'h') => Some("θ"),
            ('s', 'h') => Some("ʃ"),
            ('c', 'h') => Some("tʃ"),
            _ => None,
        });

        match digraph {
            Some(p) => {
                phonemes.push(p.to_string());
                i += 2;
            }
            None => {
                phonemes.push(chars[i].to_string());
                i += 1;
            }
        }
    }

    phonemes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> VocabularyTokenizer {
        let mut vocabularies = HashMap::new();
        vocabularies.insert(
            "en-US".to_string(),
            Vocabulary::new(
                TokenUnit::Phoneme,
                [("θ", 1), ("e", 2), ("ʃ", 3), ("i", 4), ("p", 5)]
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            ),
        );
        vocabularies.insert(
            "es-ES".to_string(),
            Vocabulary::new(
                TokenUnit::Word,
                [("el", 1), ("la", 2)].into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            ),
        );
        VocabularyTokenizer::new("en-US", vocabularies)
    }

    #[test]
    fn test_g2p_digraphs() {
        assert_eq!(grapheme_to_phoneme("ship"), vec!["ʃ", "i", "p"]);
        assert_eq!(grapheme_to_phoneme("The"), vec!["θ", "e"]);
        assert_eq!(grapheme_to_phoneme("church"), vec!["tʃ", "u", "r", "tʃ"]);
    }

    #[test]
    fn test_phoneme_lookup_with_unknown_fallback() {
        let tokens = tokenizer().tokenize("The ship", "en-US");
        assert_eq!(tokens, vec![1, 2, 3, 4, 5]);
        let tokens = tokenizer().tokenize("xyz", "en-US");
        assert_eq!(tokens, vec![UNKNOWN_TOKEN; 3]);
    }

    #[test]
    fn test_word_lookup_is_case_insensitive() {
        let tokens = tokenizer().tokenize("El gato, LA casa", "es-ES");
        assert_eq!(tokens, vec![1, 0, 2, 0]);
    }

    #[test]
    fn test_unknown_locale_falls_back_to_default() {
        let t = tokenizer();
        assert_eq!(t.tokenize("ship", "de-DE"), t.tokenize("ship", "en-US"));
    }

    #[test]
    fn test_deterministic() {
        let t = tokenizer();
        assert_eq!(t.tokenize("the ship sails", "en-US"), t.tokenize("the ship sails", "en-US"));
    }

    #[test]
    fn test_empty_tables() {
        let t = VocabularyTokenizer::empty("en-US");
        assert_eq!(t.tokenize("hi there", "en-US"), vec![0; 6]);
        assert!(t.tokenize("", "en-US").is_empty());
    }

    #[test]
    fn test_load_yaml() {
        let path = std::env::temp_dir().join("sdkwork_voiceover_vocab_test.yaml");
        std::fs::write(&path, "default_locale: es-ES\nlocales:\n  es-ES:\n    unit: word\n    tokens: { hola: 7 }\n").unwrap();
        let t = VocabularyTokenizer::load(&path, "en-US").unwrap();
        assert_eq!(t.default_locale(), "es-ES");
        assert_eq!(t.tokenize("Hola mundo", "es-ES"), vec![7, 0]);
        std::fs::remove_file(&path).ok();
    }
}
