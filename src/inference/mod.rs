//! Inference and orchestration
//!
//! - Synthesis controls (rate, pitch, volume, emotion, voice modifiers)
//! - Backend selection (real model or deterministic fallback)
//! - Single-shot and streaming synthesis
//! - The voiceover pipeline and batch processing

mod adapter;
mod backend;
mod batch;
mod controls;
mod pipeline;
mod streaming;

pub use adapter::{InferenceAdapter, BREATH_NOISE_LEVEL};
pub use backend::{FallbackGenerator, InferenceBackend, ModelRunner};
pub use batch::{BatchItem, BatchSynthesisRequest, BatchSynthesisResult};
pub use controls::{Emotion, SynthesisControls};
pub use pipeline::{
    assemble, silence_samples, RenderedSegment, SynthesisOptions, SynthesisOutput,
    VoiceoverPipeline,
};
pub use streaming::{AudioChunk, PcmBuffer, StreamingStats};
