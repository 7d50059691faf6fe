//! Final-stage transforms: dither and stereo imaging

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::DspStage;

/// Seeded uniform dither of one quantization step
#[derive(Debug, Clone)]
pub struct Dither {
    step: f32,
    rng: StdRng,
}

impl Dither {
    pub fn new(bits: u32, seed: u64) -> Self {
        let bits = bits.clamp(1, 32) as i32;
        Self {
            step: 2f32.powi(-bits),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Quantization step the noise is scaled to
    pub fn step(&self) -> f32 {
        self.step
    }
}

impl DspStage for Dither {
    fn name(&self) -> &'static str {
        "dither"
    }

    fn process(&mut self, pcm: &mut Vec<f32>) {
        for x in pcm.iter_mut() {
            *x += (self.rng.gen::<f32>() - 0.5) * self.step;
        }
    }
}

/// Stereo width control; mono buffers pass through unchanged
#[derive(Debug, Clone)]
pub struct StereoImage {
    width: f32,
}

impl StereoImage {
    pub fn new(width: f32) -> Self {
        Self { width }
    }
}

impl DspStage for StereoImage {
    fn name(&self) -> &'static str {
        "stereo"
    }

    fn process(&mut self, _pcm: &mut Vec<f32>) {
        debug!("Stereo width {} ignored for mono signal", self.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dither_is_small_and_seeded() {
        let mut a = vec![0.0f32; 1000];
        let mut b = a.clone();
        Dither::new(16, 7).process(&mut a);
        Dither::new(16, 7).process(&mut b);
        assert_eq!(a, b);
        let step = 1.0 / 65536.0;
        assert!(a.iter().all(|x| x.abs() <= step / 2.0));
        assert!(a.iter().any(|&x| x != 0.0));
    }

    #[test]
    fn test_dither_bits_scale() {
        assert_eq!(Dither::new(8, 0).step(), 1.0 / 256.0);
    }

    #[test]
    fn test_stereo_is_mono_noop() {
        let mut pcm = vec![0.1, 0.2];
        StereoImage::new(1.5).process(&mut pcm);
        assert_eq!(pcm, vec![0.1, 0.2]);
    }
}
