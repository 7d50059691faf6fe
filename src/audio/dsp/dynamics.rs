//! Level and dynamics stages

use super::{db_to_linear, level_db, DspStage};

/// Drop leading and trailing samples below a dBFS threshold
///
/// When no sample rises above the threshold the whole buffer counts as silence
/// and the result is empty.
#[derive(Debug, Clone)]
pub struct TrimSilence {
    threshold_db: f32,
}

impl TrimSilence {
    pub fn new(threshold_db: f32) -> Self {
        Self { threshold_db }
    }
}

impl DspStage for TrimSilence {
    fn name(&self) -> &'static str {
        "trim"
    }

    fn process(&mut self, pcm: &mut Vec<f32>) {
        let loud = |x: &f32| level_db(*x) > self.threshold_db;
        let Some(start) = pcm.iter().position(loud) else {
            pcm.clear();
            return;
        };
        // A loud sample exists, so the reverse search succeeds too
        let end = pcm.iter().rposition(loud).unwrap_or(start);
        pcm.truncate(end + 1);
        pcm.drain(..start);
    }
}

/// Peak normalization to 1.0
#[derive(Debug, Clone, Copy)]
pub struct Normalize;

impl DspStage for Normalize {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn process(&mut self, pcm: &mut Vec<f32>) {
        let peak = pcm.iter().fold(0.0f32, |m, x| m.max(x.abs()));
        if peak > 0.0 {
            let scale = 1.0 / peak;
            pcm.iter_mut().for_each(|x| *x *= scale);
        }
    }
}

/// Downward expander: samples under the threshold are divided by `ratio`
#[derive(Debug, Clone)]
pub struct NoiseGate {
    threshold_db: f32,
    ratio: f32,
}

impl NoiseGate {
    pub fn new(threshold_db: f32, ratio: f32) -> Self {
        Self {
            threshold_db,
            ratio: ratio.max(1.0),
        }
    }
}

impl DspStage for NoiseGate {
    fn name(&self) -> &'static str {
        "noise_gate"
    }

    fn process(&mut self, pcm: &mut Vec<f32>) {
        for x in pcm.iter_mut() {
            if level_db(*x) < self.threshold_db {
                *x /= self.ratio;
            }
        }
    }
}

/// Causal feed-forward compressor with instant attack and linear release
///
/// Above the threshold the gain drops to the minimum required so far; below it,
/// the gain climbs back toward unity by `release_step` per sample.
#[derive(Debug, Clone)]
pub struct Compressor {
    threshold_db: f32,
    ratio: f32,
    release_step: f32,
    gain: f32,
}

impl Compressor {
    pub fn new(threshold_db: f32, ratio: f32, release_step: f32) -> Self {
        Self {
            threshold_db,
            ratio: ratio.max(1.0),
            release_step: release_step.max(0.0),
            gain: 1.0,
        }
    }

    /// Current gain state
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Advance one sample and return the gain applied to it
    pub fn next_gain(&mut self, sample: f32) -> f32 {
        let level = level_db(sample);
        if level > self.threshold_db {
            let reduction_db = (level - self.threshold_db) * (1.0 - 1.0 / self.ratio);
            self.gain = self.gain.min(db_to_linear(-reduction_db));
        } else {
            self.gain = (self.gain + self.release_step).min(1.0);
        }
        self.gain
    }
}

impl DspStage for Compressor {
    fn name(&self) -> &'static str {
        "compressor"
    }

    fn process(&mut self, pcm: &mut Vec<f32>) {
        for x in pcm.iter_mut() {
            *x *= self.next_gain(*x);
        }
    }
}

/// RMS-based loudness normalization toward a dB target
#[derive(Debug, Clone)]
pub struct LoudnessNormalizer {
    target_db: f32,
}

impl LoudnessNormalizer {
    pub fn new(target_db: f32) -> Self {
        Self { target_db }
    }
}

impl DspStage for LoudnessNormalizer {
    fn name(&self) -> &'static str {
        "loudness"
    }

    fn process(&mut self, pcm: &mut Vec<f32>) {
        if pcm.is_empty() {
            return;
        }
        let mean_square = pcm.iter().map(|&x| x as f64 * x as f64).sum::<f64>() / pcm.len() as f64;
        let rms = mean_square.sqrt() as f32;
        if rms <= 0.0 || !rms.is_finite() {
            return;
        }
        let gain = db_to_linear(self.target_db) / rms;
        pcm.iter_mut().for_each(|x| *x *= gain);
    }
}

/// Hard clip to a dBFS ceiling, keeping sign
#[derive(Debug, Clone)]
pub struct Limiter {
    ceiling: f32,
}

impl Limiter {
    pub fn new(threshold_db: f32) -> Self {
        Self {
            ceiling: db_to_linear(threshold_db),
        }
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }
}

impl DspStage for Limiter {
    fn name(&self) -> &'static str {
        "limiter"
    }

    fn process(&mut self, pcm: &mut Vec<f32>) {
        for x in pcm.iter_mut() {
            if x.abs() > self.ceiling {
                *x = self.ceiling.copysign(*x);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_edges() {
        let mut pcm = vec![0.0, 0.0, 0.5, 0.0, -0.3, 0.0];
        TrimSilence::new(-60.0).process(&mut pcm);
        assert_eq!(pcm, vec![0.5, 0.0, -0.3]);
    }

    #[test]
    fn test_trim_all_silent_is_empty() {
        let mut pcm = vec![0.0, 1e-5, -1e-5];
        TrimSilence::new(-60.0).process(&mut pcm);
        assert!(pcm.is_empty());

        let mut empty: Vec<f32> = Vec::new();
        TrimSilence::new(-60.0).process(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_normalize() {
        let mut pcm = vec![0.25, -0.5];
        Normalize.process(&mut pcm);
        assert_eq!(pcm, vec![0.5, -1.0]);

        let mut zeros = vec![0.0; 8];
        Normalize.process(&mut zeros);
        assert!(zeros.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_gate_attenuates_quiet_only() {
        let mut pcm = vec![0.5, 1e-4];
        NoiseGate::new(-60.0, 10.0).process(&mut pcm);
        assert_eq!(pcm[0], 0.5);
        assert!((pcm[1] - 1e-5).abs() < 1e-9);
    }

    #[test]
    fn test_compressor_attack_is_immediate() {
        let mut comp = Compressor::new(-20.0, 4.0, 1e-4);
        let g = comp.next_gain(1.0);
        // 20 dB over threshold, 15 dB reduction
        assert!((g - db_to_linear(-15.0)).abs() < 1e-3);
        assert!(g <= 1.0);
    }

    #[test]
    fn test_compressor_release_is_monotonic() {
        let mut pcm = vec![1.0];
        pcm.extend(std::iter::repeat(0.01).take(10_000));
        let mut comp = Compressor::new(-20.0, 4.0, 1e-4);

        let mut gains = Vec::with_capacity(pcm.len());
        for &x in &pcm {
            gains.push(comp.next_gain(x));
        }
        assert!(gains[0] < 1.0);
        assert!(gains.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(*gains.last().unwrap(), 1.0);
    }

    #[test]
    fn test_compressor_holds_minimum_under_repeated_overshoot() {
        let mut comp = Compressor::new(-20.0, 4.0, 1e-4);
        let loud = comp.next_gain(1.0);
        let softer = comp.next_gain(0.5);
        assert_eq!(softer, loud);
    }

    #[test]
    fn test_loudness_targets_rms() {
        let mut pcm = vec![0.5, -0.5, 0.5, -0.5];
        LoudnessNormalizer::new(-16.0).process(&mut pcm);
        let rms = (pcm.iter().map(|x| x * x).sum::<f32>() / 4.0).sqrt();
        assert!((rms - db_to_linear(-16.0)).abs() < 1e-5);
    }

    #[test]
    fn test_loudness_skips_silence() {
        let mut pcm = vec![0.0; 4];
        LoudnessNormalizer::new(-16.0).process(&mut pcm);
        assert!(pcm.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_limiter_clamps_with_sign() {
        let mut limiter = Limiter::new(-6.0);
        let t = limiter.ceiling();
        let mut pcm = vec![0.9, -0.9, 0.1, -t];
        limiter.process(&mut pcm);
        assert_eq!(pcm, vec![t, -t, 0.1, -t]);
    }
}
