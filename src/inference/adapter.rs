//! Inference adapter
//!
//! Wraps the selected backend and applies the post-inference voice modifiers
//! (jitter, shimmer, breath floor, emphasis). The modifiers run the same way
//! for both backends.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::backend::{token_hash, FallbackGenerator, InferenceBackend, ModelRunner};
use super::controls::SynthesisControls;
use crate::config::{InferenceSettings, StreamingConfig};
use crate::voice::Embedding;
use crate::SAMPLE_RATE;

/// Peak amplitude of the breath noise floor
pub const BREATH_NOISE_LEVEL: f32 = 0.005;

/// Single-shot and streaming synthesis over one backend
#[derive(Debug)]
pub struct InferenceAdapter {
    backend: InferenceBackend,
    fallback: FallbackGenerator,
    settings: InferenceSettings,
    pub(crate) streaming: StreamingConfig,
}

impl InferenceAdapter {
    pub fn new(
        backend: InferenceBackend,
        settings: &InferenceSettings,
        streaming: &StreamingConfig,
    ) -> Self {
        Self {
            backend,
            fallback: FallbackGenerator::new(settings),
            settings: settings.clone(),
            streaming: streaming.clone(),
        }
    }

    /// Adapter over a real model; runtime failures degrade to the fallback generator
    pub fn with_model(
        runner: Box<dyn ModelRunner>,
        settings: &InferenceSettings,
        streaming: &StreamingConfig,
    ) -> Self {
        Self::new(InferenceBackend::RealModel(runner), settings, streaming)
    }

    /// Adapter that only uses the deterministic fallback generator
    pub fn fallback_only(settings: &InferenceSettings, streaming: &StreamingConfig) -> Self {
        let generator = FallbackGenerator::new(settings);
        Self::new(InferenceBackend::DeterministicFallback(generator), settings, streaming)
    }

    pub fn backend(&self) -> &InferenceBackend {
        &self.backend
    }

    pub fn streaming_config(&self) -> &StreamingConfig {
        &self.streaming
    }

    /// Synthesize one token sequence
    ///
    /// Never fails: a model error is logged and replaced by fallback audio.
    pub fn synthesize(
        &self,
        tokens: &[u32],
        embedding: &Embedding,
        controls: &SynthesisControls,
    ) -> Vec<f32> {
        let controls = controls.sanitized();
        let mut pcm = self.raw(tokens, embedding, &controls);
        self.apply_modifiers(&mut pcm, tokens, &controls);
        debug!(
            "Synthesized {} tokens -> {} samples ({})",
            tokens.len(),
            pcm.len(),
            self.backend.name()
        );
        pcm
    }

    /// Render a breath marker: a short stretch of the breath noise floor
    pub fn synthesize_breath(&self, controls: &SynthesisControls) -> Vec<f32> {
        let controls = controls.sanitized();
        let samples =
            (self.settings.breath_duration_secs.max(0.0) as f64 * SAMPLE_RATE as f64) as usize;
        let mut rng = StdRng::seed_from_u64(self.settings.seed.rotate_left(29));
        (0..samples)
            .map(|_| BREATH_NOISE_LEVEL * controls.volume * rng.gen_range(-1.0f32..=1.0))
            .collect()
    }

    fn raw(&self, tokens: &[u32], embedding: &Embedding, controls: &SynthesisControls) -> Vec<f32> {
        match &self.backend {
            InferenceBackend::DeterministicFallback(generator) => generator.generate(tokens, controls),
            InferenceBackend::RealModel(runner) => {
                match runner.run(tokens, embedding, controls) {
                    Ok(pcm) => pcm,
                    Err(e) => {
                        warn!("Model '{}' failed, using fallback audio: {}", runner.name(), e);
                        self.fallback.generate(tokens, controls)
                    }
                }
            }
        }
    }

    /// Jitter, then shimmer, then breath floor, then emphasis
    fn apply_modifiers(&self, pcm: &mut [f32], tokens: &[u32], controls: &SynthesisControls) {
        if pcm.is_empty() {
            return;
        }
        let mut rng = StdRng::seed_from_u64(self.settings.seed.rotate_left(17) ^ token_hash(tokens));

        if controls.jitter > 0.0 {
            for sample in pcm.iter_mut() {
                *sample += controls.jitter * (rng.gen::<f32>() - 0.5);
            }
        }

        if controls.shimmer > 0.0 {
            let mut previous = pcm[0];
            for sample in pcm.iter_mut().skip(1) {
                let current = *sample;
                *sample += controls.shimmer * (current - previous);
                previous = current;
            }
        }

        if controls.breath {
            for sample in pcm.iter_mut() {
                *sample += BREATH_NOISE_LEVEL * rng.gen_range(-1.0f32..=1.0);
            }
        }

        if controls.emphasis != 1.0 {
            for sample in pcm.iter_mut() {
                *sample *= controls.emphasis;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{Result, TtsError};

    struct ConstRunner(f32);

    impl ModelRunner for ConstRunner {
        fn name(&self) -> &str {
            "const"
        }

        fn run(&self, tokens: &[u32], _: &Embedding, _: &SynthesisControls) -> Result<Vec<f32>> {
            Ok(vec![self.0; tokens.len() * 100])
        }
    }

    struct BrokenRunner;

    impl ModelRunner for BrokenRunner {
        fn name(&self) -> &str {
            "broken"
        }

        fn run(&self, _: &[u32], _: &Embedding, _: &SynthesisControls) -> Result<Vec<f32>> {
            Err(TtsError::Inference {
                runner: "broken".into(),
                message: "session unavailable".into(),
                recoverable: true,
            })
        }
    }

    fn settings() -> (InferenceSettings, StreamingConfig) {
        (InferenceSettings::default(), StreamingConfig::default())
    }

    #[test]
    fn test_emphasis_scales_buffer() {
        let (s, c) = settings();
        let adapter = InferenceAdapter::with_model(Box::new(ConstRunner(0.2)), &s, &c);
        let controls = SynthesisControls {
            emphasis: 1.5,
            ..Default::default()
        };
        let pcm = adapter.synthesize(&[1, 2], &Embedding::fallback(), &controls);
        assert_eq!(pcm.len(), 200);
        assert!(pcm.iter().all(|&x| (x - 0.3).abs() < 1e-6));
    }

    #[test]
    fn test_jitter_is_bounded_and_centered() {
        let (s, c) = settings();
        let adapter = InferenceAdapter::with_model(Box::new(ConstRunner(0.0)), &s, &c);
        let controls = SynthesisControls {
            jitter: 0.2,
            ..Default::default()
        };
        let pcm = adapter.synthesize(&[1; 50], &Embedding::fallback(), &controls);
        assert!(pcm.iter().all(|x| x.abs() <= 0.1 + 1e-6));
        let mean = pcm.iter().sum::<f32>() / pcm.len() as f32;
        assert!(mean.abs() < 0.01);
    }

    #[test]
    fn test_shimmer_zero_on_flat_signal() {
        let (s, c) = settings();
        let adapter = InferenceAdapter::with_model(Box::new(ConstRunner(0.4)), &s, &c);
        let controls = SynthesisControls {
            shimmer: 0.5,
            ..Default::default()
        };
        let pcm = adapter.synthesize(&[1], &Embedding::fallback(), &controls);
        assert!(pcm.iter().all(|&x| (x - 0.4).abs() < 1e-6));
    }

    #[test]
    fn test_breath_adds_floor() {
        let (s, c) = settings();
        let adapter = InferenceAdapter::with_model(Box::new(ConstRunner(0.0)), &s, &c);
        let controls = SynthesisControls {
            breath: true,
            ..Default::default()
        };
        let pcm = adapter.synthesize(&[1], &Embedding::fallback(), &controls);
        assert!(pcm.iter().any(|&x| x != 0.0));
        assert!(pcm.iter().all(|x| x.abs() <= BREATH_NOISE_LEVEL));
    }

    #[test]
    fn test_model_error_uses_fallback() {
        let (s, c) = settings();
        let broken = InferenceAdapter::with_model(Box::new(BrokenRunner), &s, &c);
        let fallback = InferenceAdapter::fallback_only(&s, &c);
        let controls = SynthesisControls::default();
        let emb = Embedding::fallback();
        assert_eq!(
            broken.synthesize(&[4, 5], &emb, &controls),
            fallback.synthesize(&[4, 5], &emb, &controls)
        );
    }

    #[test]
    fn test_breath_marker_length() {
        let (s, c) = settings();
        let adapter = InferenceAdapter::fallback_only(&s, &c);
        let pcm = adapter.synthesize_breath(&SynthesisControls::default());
        assert_eq!(pcm.len(), 13230);
    }
}
