//! Voice Module
//!
//! - Voice identity embeddings and blending (voice morphing)
//! - File-backed voice catalog with checksum verification
//! - Deterministic fallback when a voice cannot be loaded

mod embedding;
mod store;

pub use embedding::{Embedding, EMBEDDING_DIM, FALLBACK_VALUE};
pub use store::{
    sha256_hex, EmbeddingStore, FileEmbeddingStore, Gender, StaticEmbeddingStore, VoiceMetadata,
};
