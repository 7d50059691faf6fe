//! Voice embedding storage
//!
//! A voice is a pair of files in the voices directory:
//! - `<name>.json`: [`VoiceMetadata`] including a SHA-256 checksum
//! - `<name>.bin`: raw little-endian f32 embedding bytes
//!
//! Lookups are read-only; loaded embeddings are cached and shared between requests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::embedding::Embedding;
use crate::core::error::{ResourceType, Result, TtsError};

/// Voice gender tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Neutral,
    #[default]
    Unknown,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
            Gender::Neutral => write!(f, "neutral"),
            Gender::Unknown => write!(f, "unknown"),
        }
    }
}

/// Contents of `<name>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceMetadata {
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub description: String,
    /// Optional preview clip
    #[serde(default)]
    pub sample_file: Option<PathBuf>,
    /// Lowercase hex SHA-256 of the `.bin` bytes; empty skips verification
    #[serde(default)]
    pub checksum: String,
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_sample_rate() -> u32 {
    crate::SAMPLE_RATE
}

/// Lowercase hex SHA-256 digest
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Source of voice embeddings
pub trait EmbeddingStore: Send + Sync {
    /// Load a voice; fails with `Lookup` (missing) or `ChecksumMismatch` (corrupt)
    fn load_embedding(&self, voice: &str) -> Result<Arc<Embedding>>;

    /// Load a voice, substituting [`Embedding::fallback`] on any failure
    fn load_or_fallback(&self, voice: &str) -> Arc<Embedding> {
        match self.load_embedding(voice) {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Using fallback embedding for voice '{}': {}", voice, e);
                Arc::new(Embedding::fallback())
            }
        }
    }
}

/// Directory-backed store with an in-memory cache
pub struct FileEmbeddingStore {
    voices_dir: PathBuf,
    cache: DashMap<String, Arc<Embedding>>,
}

impl FileEmbeddingStore {
    pub fn new(voices_dir: impl Into<PathBuf>) -> Self {
        Self {
            voices_dir: voices_dir.into(),
            cache: DashMap::new(),
        }
    }

    pub fn voices_dir(&self) -> &Path {
        &self.voices_dir
    }

    /// Number of cached embeddings
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Read `<name>.json`
    pub fn metadata(&self, voice: &str) -> Result<VoiceMetadata> {
        let path = self.voices_dir.join(format!("{}.json", voice));
        let content = std::fs::read_to_string(&path).map_err(|e| {
            TtsError::not_found(ResourceType::Voice, voice, format!("{}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| TtsError::Lookup {
            resource: ResourceType::Voice,
            name: voice.to_string(),
            message: format!("Invalid voice metadata: {}", e),
        })
    }

    /// Enumerate voices with readable metadata, sorted by name
    pub fn list_voices(&self) -> Result<Vec<VoiceMetadata>> {
        let entries = std::fs::read_dir(&self.voices_dir)
            .map_err(|e| TtsError::io_at(e, self.voices_dir.clone()))?;

        let mut voices = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.metadata(stem) {
                Ok(meta) => voices.push(meta),
                Err(e) => warn!("Skipping unreadable voice {:?}: {}", path, e),
            }
        }

        voices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(voices)
    }

    /// Write a voice pair; mainly for tooling and tests
    pub fn save_voice(&self, metadata: &VoiceMetadata, embedding: &Embedding) -> Result<()> {
        std::fs::create_dir_all(&self.voices_dir)
            .map_err(|e| TtsError::io_at(e, self.voices_dir.clone()))?;

        let bin_path = self.voices_dir.join(format!("{}.bin", metadata.name));
        let json_path = self.voices_dir.join(format!("{}.json", metadata.name));
        let bytes = embedding.to_le_bytes();

        let mut metadata = metadata.clone();
        metadata.checksum = sha256_hex(&bytes);

        std::fs::write(&bin_path, &bytes).map_err(|e| TtsError::io_at(e, bin_path.clone()))?;
        std::fs::write(&json_path, serde_json::to_string_pretty(&metadata)?)
            .map_err(|e| TtsError::io_at(e, json_path.clone()))?;

        self.cache.remove(&metadata.name);
        Ok(())
    }

    fn read_verified(&self, voice: &str) -> Result<Embedding> {
        let metadata = self.metadata(voice)?;
        let path = self.voices_dir.join(format!("{}.bin", voice));
        let bytes = std::fs::read(&path).map_err(|e| {
            TtsError::not_found(ResourceType::Embedding, voice, format!("{}: {}", path.display(), e))
        })?;

        let expected = metadata.checksum.trim();
        if expected.is_empty() {
            debug!("Voice '{}' has no checksum, skipping verification", voice);
            return Ok(Embedding::from_le_bytes(&bytes));
        }

        let actual = sha256_hex(&bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(TtsError::ChecksumMismatch {
                name: voice.to_string(),
                expected: metadata.checksum,
                actual,
            });
        }

        Ok(Embedding::from_le_bytes(&bytes))
    }
}

impl EmbeddingStore for FileEmbeddingStore {
    fn load_embedding(&self, voice: &str) -> Result<Arc<Embedding>> {
        if let Some(cached) = self.cache.get(voice) {
            return Ok(Arc::clone(cached.value()));
        }

        let embedding = Arc::new(self.read_verified(voice)?);
        debug!("Loaded embedding '{}' ({} dims)", voice, embedding.len());
        self.cache.insert(voice.to_string(), Arc::clone(&embedding));
        Ok(embedding)
    }
}

/// In-memory store
#[derive(Debug, Default, Clone)]
pub struct StaticEmbeddingStore {
    voices: HashMap<String, Arc<Embedding>>,
}

impl StaticEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voice(mut self, name: impl Into<String>, embedding: Embedding) -> Self {
        self.voices.insert(name.into(), Arc::new(embedding));
        self
    }
}

impl EmbeddingStore for StaticEmbeddingStore {
    fn load_embedding(&self, voice: &str) -> Result<Arc<Embedding>> {
        self.voices
            .get(voice)
            .cloned()
            .ok_or_else(|| TtsError::not_found(ResourceType::Voice, voice, "not registered"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sdkwork_voiceover_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn metadata(name: &str) -> VoiceMetadata {
        VoiceMetadata {
            name: name.to_string(),
            gender: Gender::Female,
            locale: "en-US".to_string(),
            sample_rate: 44100,
            description: "test voice".to_string(),
            sample_file: None,
            checksum: String::new(),
        }
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = temp_dir("store_roundtrip");
        let store = FileEmbeddingStore::new(&dir);
        let emb = Embedding::new(vec![0.1, 0.2, 0.3]);
        store.save_voice(&metadata("ava"), &emb).unwrap();

        let loaded = store.load_embedding("ava").unwrap();
        assert_eq!(*loaded, emb);
        assert_eq!(store.cached(), 1);
        assert_eq!(store.list_voices().unwrap().len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_unverified_imported_voice() {
        let dir = temp_dir("store_imported");
        std::fs::create_dir_all(&dir).unwrap();
        let emb = Embedding::new(vec![0.25, -0.5]);
        std::fs::write(dir.join("imp.json"), r#"{"name":"imp","gender":"unknown"}"#).unwrap();
        std::fs::write(dir.join("imp.bin"), emb.to_le_bytes()).unwrap();
        std::fs::write(dir.join("nock.json"), r#"{"name":"nock","checksum":""}"#).unwrap();
        std::fs::write(dir.join("nock.bin"), emb.to_le_bytes()).unwrap();

        let store = FileEmbeddingStore::new(&dir);
        let voices = store.list_voices().unwrap();
        let names: Vec<_> = voices.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["imp", "nock"]);
        assert_eq!(voices[0].gender, Gender::Unknown);
        assert_eq!(voices[1].gender, Gender::Unknown);

        assert_eq!(*store.load_embedding("imp").unwrap(), emb);
        assert_eq!(*store.load_embedding("nock").unwrap(), emb);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_voice_is_lookup() {
        let store = FileEmbeddingStore::new(temp_dir("store_missing"));
        let err = store.load_embedding("nobody").unwrap_err();
        assert!(matches!(err, TtsError::Lookup { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_corrupt_voice_is_checksum_mismatch() {
        let dir = temp_dir("store_corrupt");
        let store = FileEmbeddingStore::new(&dir);
        store.save_voice(&metadata("bob"), &Embedding::new(vec![1.0; 4])).unwrap();
        std::fs::write(dir.join("bob.bin"), [0u8; 16]).unwrap();

        let err = store.load_embedding("bob").unwrap_err();
        assert!(matches!(err, TtsError::ChecksumMismatch { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_fallback_on_failure() {
        let store = StaticEmbeddingStore::new().with_voice("a", Embedding::new(vec![1.0]));
        assert_eq!(store.load_or_fallback("a").as_slice(), &[1.0]);
        assert_eq!(*store.load_or_fallback("b"), Embedding::fallback());
    }

    #[test]
    fn test_list_skips_bad_metadata() {
        let dir = temp_dir("store_list");
        let store = FileEmbeddingStore::new(&dir);
        store.save_voice(&metadata("zed"), &Embedding::new(vec![0.0])).unwrap();
        std::fs::write(dir.join("broken.json"), "{ not json").unwrap();

        let names: Vec<_> = store.list_voices().unwrap().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["zed"]);
        std::fs::remove_dir_all(&dir).ok();
    }
}
