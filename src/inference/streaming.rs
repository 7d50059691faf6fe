//! Chunked streaming synthesis
//!
//! Tokens are synthesized in fixed-size groups. Output accumulates in a
//! [`PcmBuffer`] and is delivered in threshold-sized chunks, in time order,
//! through a synchronous callback. A slow callback stalls production.

use std::collections::VecDeque;

use tracing::debug;

use super::adapter::InferenceAdapter;
use super::controls::SynthesisControls;
use crate::core::error::Result;
use crate::voice::Embedding;
use crate::SAMPLE_RATE;

/// Append-only sample accumulator with prefix draining
#[derive(Debug, Clone, Default)]
pub struct PcmBuffer {
    samples: VecDeque<f32>,
}

impl PcmBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn append(&mut self, pcm: &[f32]) {
        self.samples.extend(pcm.iter().copied());
    }

    /// Remove and return up to `n` samples from the front
    pub fn drain_prefix(&mut self, n: usize) -> Vec<f32> {
        let n = n.min(self.samples.len());
        self.samples.drain(..n).collect()
    }

    /// Remove and return everything
    pub fn take_all(&mut self) -> Vec<f32> {
        self.samples.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One delivered piece of streamed audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Delivery order, from zero
    pub index: usize,
    /// Sample offset of the first sample in the stream
    pub offset: usize,
    pub samples: Vec<f32>,
}

impl AudioChunk {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / SAMPLE_RATE as f64
    }
}

/// Counters for a finished stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingStats {
    pub groups: usize,
    pub chunks: usize,
    pub samples: usize,
}

struct ChunkEmitter<F> {
    on_chunk: F,
    stats: StreamingStats,
}

impl<F> ChunkEmitter<F>
where
    F: FnMut(AudioChunk) -> Result<()>,
{
    fn emit(&mut self, samples: Vec<f32>) -> Result<()> {
        let chunk = AudioChunk {
            index: self.stats.chunks,
            offset: self.stats.samples,
            samples,
        };
        self.stats.chunks += 1;
        self.stats.samples += chunk.samples.len();
        (self.on_chunk)(chunk)
    }
}

impl InferenceAdapter {
    /// Stream synthesis of `tokens`, calling `on_chunk` for each delivered chunk
    ///
    /// Every full group of `chunk_tokens` tokens is synthesized on its own. Whenever
    /// the accumulated audio reaches `delivery_threshold` samples, threshold-sized
    /// prefixes are delivered; the remainder is flushed at the end. An error
    /// returned by the callback stops the stream.
    pub fn synthesize_streaming<I, F>(
        &self,
        tokens: I,
        embedding: &Embedding,
        controls: &SynthesisControls,
        on_chunk: F,
    ) -> Result<StreamingStats>
    where
        I: IntoIterator<Item = u32>,
        F: FnMut(AudioChunk) -> Result<()>,
    {
        let group_size = self.streaming.chunk_tokens.max(1);
        let threshold = self.streaming.delivery_threshold.max(1);

        let mut buffer = PcmBuffer::with_capacity(threshold * 2);
        let mut emitter = ChunkEmitter {
            on_chunk,
            stats: StreamingStats::default(),
        };
        let mut group = Vec::with_capacity(group_size);
        let mut tokens = tokens.into_iter();

        loop {
            group.clear();
            group.extend(tokens.by_ref().take(group_size));
            if group.is_empty() {
                break;
            }

            let pcm = self.synthesize(&group, embedding, controls);
            buffer.append(&pcm);
            emitter.stats.groups += 1;

            while buffer.len() >= threshold {
                emitter.emit(buffer.drain_prefix(threshold))?;
            }
        }

        if !buffer.is_empty() {
            emitter.emit(buffer.take_all())?;
        }

        debug!(
            "Streamed {} groups as {} chunks ({} samples)",
            emitter.stats.groups, emitter.stats.chunks, emitter.stats.samples
        );
        Ok(emitter.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InferenceSettings, StreamingConfig};
    use crate::core::error::TtsError;
    use crate::inference::backend::ModelRunner;

    /// Emits 300 samples per group, valued by group start token
    struct RampRunner;

    impl ModelRunner for RampRunner {
        fn name(&self) -> &str {
            "ramp"
        }

        fn run(&self, tokens: &[u32], _: &Embedding, _: &SynthesisControls) -> Result<Vec<f32>> {
            Ok((0..300).map(|i| tokens[0] as f32 + i as f32 / 1000.0).collect())
        }
    }

    fn adapter() -> InferenceAdapter {
        InferenceAdapter::with_model(
            Box::new(RampRunner),
            &InferenceSettings::default(),
            &StreamingConfig::default(),
        )
    }

    #[test]
    fn test_pcm_buffer_drain() {
        let mut buf = PcmBuffer::new();
        buf.append(&[1.0, 2.0, 3.0]);
        buf.append(&[4.0]);
        assert_eq!(buf.drain_prefix(2), vec![1.0, 2.0]);
        assert_eq!(buf.drain_prefix(10), vec![3.0, 4.0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_chunks_are_threshold_sized_and_ordered() {
        let adapter = adapter();
        // 45 tokens -> 5 groups -> 1500 samples -> 1024 + 476
        let mut chunks = Vec::new();
        let stats = adapter
            .synthesize_streaming(0..45, &Embedding::fallback(), &SynthesisControls::default(), |c| {
                chunks.push(c);
                Ok(())
            })
            .unwrap();

        assert_eq!(stats.groups, 5);
        assert_eq!(stats.chunks, 2);
        assert_eq!(chunks[0].samples.len(), 1024);
        assert_eq!(chunks[1].samples.len(), 476);
        assert_eq!(chunks[1].offset, 1024);
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn test_stream_matches_single_shot_concatenation() {
        let adapter = adapter();
        let emb = Embedding::fallback();
        let controls = SynthesisControls::default();
        let tokens: Vec<u32> = (0..35).collect();

        let mut streamed = Vec::new();
        adapter
            .synthesize_streaming(tokens.iter().copied(), &emb, &controls, |c| {
                streamed.extend(c.samples);
                Ok(())
            })
            .unwrap();

        let expected: Vec<f32> = tokens
            .chunks(10)
            .flat_map(|g| adapter.synthesize(g, &emb, &controls))
            .collect();
        assert_eq!(streamed, expected);
    }

    #[test]
    fn test_empty_stream() {
        let stats = adapter()
            .synthesize_streaming(
                std::iter::empty(),
                &Embedding::fallback(),
                &SynthesisControls::default(),
                |_| panic!("no chunks expected"),
            )
            .unwrap();
        assert_eq!(stats, StreamingStats::default());
    }

    #[test]
    fn test_callback_error_stops_stream() {
        let mut calls = 0;
        let result = adapter().synthesize_streaming(
            0..100,
            &Embedding::fallback(),
            &SynthesisControls::default(),
            |_| {
                calls += 1;
                Err(TtsError::Internal {
                    message: "sink closed".into(),
                    location: None,
                })
            },
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
