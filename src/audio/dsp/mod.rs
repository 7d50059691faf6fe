//! Post-processing chain
//!
//! Stages run in a fixed order:
//! trim -> normalize -> EQ -> noise gate -> compressor -> loudness -> limiter -> dither -> stereo.
//!
//! Trim and normalize always run. Every stage accepts empty input, and the chain
//! never produces NaN or infinite samples.

mod dynamics;
mod eq;
mod finishing;

pub use dynamics::{Compressor, Limiter, LoudnessNormalizer, NoiseGate, Normalize, TrimSilence};
pub use eq::{Biquad, EqBand, ParametricEq};
pub use finishing::{Dither, StereoImage};

use tracing::debug;

use crate::config::DspConfig;
use crate::SAMPLE_RATE;

/// Floor added to magnitudes before taking the log
pub const LEVEL_FLOOR: f32 = 1e-6;

/// Instantaneous level in dBFS
#[inline]
pub fn level_db(sample: f32) -> f32 {
    20.0 * (sample.abs() + LEVEL_FLOOR).log10()
}

#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// One transform in the chain
///
/// Stages may carry state across samples; a fresh set is built for every
/// [`DspChain::process`] call.
pub trait DspStage: Send {
    /// Stage name for logs
    fn name(&self) -> &'static str;

    /// Transform the buffer in place; trimming may shorten it
    fn process(&mut self, pcm: &mut Vec<f32>);
}

/// Configured post-processing chain
#[derive(Debug, Clone)]
pub struct DspChain {
    config: DspConfig,
    sample_rate: u32,
}

impl DspChain {
    pub fn new(config: DspConfig) -> Self {
        Self::with_sample_rate(config, SAMPLE_RATE)
    }

    pub fn with_sample_rate(config: DspConfig, sample_rate: u32) -> Self {
        Self {
            config,
            sample_rate,
        }
    }

    pub fn config(&self) -> &DspConfig {
        &self.config
    }

    /// Build the enabled stages in chain order
    pub fn stages(&self) -> Vec<Box<dyn DspStage>> {
        let c = &self.config;
        let mut stages: Vec<Box<dyn DspStage>> = vec![
            Box::new(TrimSilence::new(c.trim_threshold_db)),
            Box::new(Normalize),
        ];

        if c.eq {
            stages.push(Box::new(ParametricEq::from_preset(c.eq_preset, self.sample_rate)));
        }
        if c.noise_gate {
            stages.push(Box::new(NoiseGate::new(c.gate_threshold_db, c.gate_ratio)));
        }
        if c.compressor {
            stages.push(Box::new(Compressor::new(
                c.compressor_threshold_db,
                c.compressor_ratio,
                c.compressor_release_step,
            )));
        }
        if c.loudness {
            stages.push(Box::new(LoudnessNormalizer::new(c.target_lufs)));
        }
        if c.limiter {
            stages.push(Box::new(Limiter::new(c.limiter_threshold_db)));
        }
        if c.dither {
            stages.push(Box::new(Dither::new(c.dither_bits, c.dither_seed)));
        }
        if c.stereo {
            stages.push(Box::new(StereoImage::new(c.stereo_width)));
        }
        stages
    }

    /// Names of the stages that would run, in order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages().iter().map(|s| s.name()).collect()
    }

    /// Run the whole chain over `pcm`
    pub fn process(&self, mut pcm: Vec<f32>) -> Vec<f32> {
        for sample in pcm.iter_mut() {
            if !sample.is_finite() {
                *sample = 0.0;
            }
        }

        let input_len = pcm.len();
        for mut stage in self.stages() {
            stage.process(&mut pcm);
            debug!("DSP stage {} -> {} samples", stage.name(), pcm.len());
        }
        debug!("DSP chain: {} -> {} samples", input_len, pcm.len());
        pcm
    }
}

impl Default for DspChain {
    fn default() -> Self {
        Self::new(DspConfig::default())
    }
}
