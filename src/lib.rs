//! # SDKWork Voiceover - Offline TTS voiceover pipeline
//!
//! Converts marked-up text into mastered speech audio with subtitle and
//! chapter sidecars.
//!
//! ## Features
//!
//! - **Inline markup**: `<break>`, `<prosody>`, `<emphasis>` and `<breath>` tags
//! - **Pronunciation dictionary**: whole-word substitutions before tokenization
//! - **Pluggable inference**: a real model runner or a deterministic fallback generator
//! - **Streaming**: chunked token groups delivered as fixed-size audio chunks
//! - **Mastering chain**: trim, normalize, EQ, gate, compressor, loudness, limiter, dither
//! - **Sidecars**: SRT/VTT subtitles, chapter metadata and a quality report
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sdkwork_voiceover::{PipelineConfig, SynthesisOptions, VoiceoverPipeline};
//!
//! let pipeline = VoiceoverPipeline::from_config(PipelineConfig::load("pipeline.yaml")?)?;
//! let output = pipeline.synthesize(
//!     "Hello <break time=\"500ms\"/> <prosody rate=\"1.2\">world</prosody>",
//!     &SynthesisOptions::default().with_voice("narrator"),
//! )?;
//! pipeline.save_audio(&output, "out.wav".as_ref(), &Default::default())?;
//! println!("{}", output.quality);
//! ```

pub mod audio;
pub mod config;
pub mod core;
pub mod inference;
pub mod subtitle;
pub mod text;
pub mod voice;

// Core re-exports
pub use core::error::{Result, TtsError};

pub use audio::{AudioEncoder, AudioMetadata, DspChain, QualityReport, WavEncoder};
pub use config::{DspConfig, EqPreset, PipelineConfig};
pub use inference::{
    Emotion, InferenceAdapter, InferenceBackend, ModelRunner, SynthesisControls,
    SynthesisOptions, SynthesisOutput, VoiceoverPipeline,
};
pub use subtitle::{SubtitleFormat, Timestamp, TimestampAligner};
pub use text::{MarkupSegmenter, PronunciationDictionary, TextSegment, Tokenizer, VocabularyTokenizer};
pub use voice::{Embedding, EmbeddingStore, FileEmbeddingStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output sample rate (mono)
pub const SAMPLE_RATE: u32 = 44100;
