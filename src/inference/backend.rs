//! Inference backends
//!
//! The backend is chosen once when the adapter is built: either a real model
//! runner or the deterministic fallback generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::controls::SynthesisControls;
use crate::config::InferenceSettings;
use crate::core::error::Result;
use crate::voice::Embedding;
use crate::SAMPLE_RATE;

/// Black-box neural model call
pub trait ModelRunner: Send + Sync {
    /// Runner name for logs
    fn name(&self) -> &str;

    /// Run the model on one token group and return mono PCM at [`SAMPLE_RATE`]
    fn run(
        &self,
        tokens: &[u32],
        embedding: &Embedding,
        controls: &SynthesisControls,
    ) -> Result<Vec<f32>>;
}

/// Capability selected at construction time
pub enum InferenceBackend {
    RealModel(Box<dyn ModelRunner>),
    DeterministicFallback(FallbackGenerator),
}

impl InferenceBackend {
    pub fn name(&self) -> &str {
        match self {
            InferenceBackend::RealModel(runner) => runner.name(),
            InferenceBackend::DeterministicFallback(_) => "deterministic-fallback",
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, InferenceBackend::DeterministicFallback(_))
    }
}

impl std::fmt::Debug for InferenceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("InferenceBackend").field(&self.name()).finish()
    }
}

/// FNV-1a over the token ids, used to derive per-call seeds
pub(crate) fn token_hash(tokens: &[u32]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for token in tokens {
        for byte in token.to_le_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
    }
    hash
}

/// Reproducible noise placeholder for when no model is available
///
/// Output is gaussian noise of fixed length, seeded from the configured seed
/// and the token ids, so the same input always gives the same waveform.
#[derive(Debug, Clone)]
pub struct FallbackGenerator {
    seed: u64,
    amplitude: f32,
    samples: usize,
}

impl FallbackGenerator {
    pub fn new(settings: &InferenceSettings) -> Self {
        Self {
            seed: settings.seed,
            amplitude: settings.fallback_amplitude,
            samples: (settings.fallback_duration_secs.max(0.0) as f64 * SAMPLE_RATE as f64) as usize,
        }
    }

    /// Samples produced per non-empty call
    pub fn samples_per_call(&self) -> usize {
        self.samples
    }

    pub fn generate(&self, tokens: &[u32], controls: &SynthesisControls) -> Vec<f32> {
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut rng = StdRng::seed_from_u64(self.seed ^ token_hash(tokens));
        let gain = self.amplitude * controls.volume;
        (0..self.samples).map(|_| gaussian(&mut rng) * gain).collect()
    }
}

/// Standard normal sample (Box-Muller)
fn gaussian(rng: &mut StdRng) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_deterministic() {
        let gen = FallbackGenerator::new(&InferenceSettings::default());
        let controls = SynthesisControls::default();
        let a = gen.generate(&[1, 2, 3], &controls);
        let b = gen.generate(&[1, 2, 3], &controls);
        assert_eq!(a, b);
        assert_eq!(a.len(), SAMPLE_RATE as usize);
        assert_ne!(a, gen.generate(&[3, 2, 1], &controls));
    }

    #[test]
    fn test_fallback_empty_tokens() {
        let gen = FallbackGenerator::new(&InferenceSettings::default());
        assert!(gen.generate(&[], &SynthesisControls::default()).is_empty());
    }

    #[test]
    fn test_fallback_level() {
        let gen = FallbackGenerator::new(&InferenceSettings::default());
        let pcm = gen.generate(&[7; 20], &SynthesisControls::default());
        let rms = (pcm.iter().map(|x| x * x).sum::<f32>() / pcm.len() as f32).sqrt();
        assert!((rms - 0.1).abs() < 0.01, "rms {}", rms);
        assert!(pcm.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_token_hash_order_sensitive() {
        assert_ne!(token_hash(&[1, 2]), token_hash(&[2, 1]));
        assert_eq!(token_hash(&[]), 0xcbf2_9ce4_8422_2325);
    }
}
