//! Single-band parametric EQ (RBJ peaking biquad)

use std::f64::consts::PI;

use super::DspStage;
use crate::config::EqPreset;

/// Peaking band parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqBand {
    pub frequency: f64,
    pub gain_db: f64,
    pub q: f64,
}

impl EqBand {
    /// Band for a preset; `None` for neutral
    pub fn for_preset(preset: EqPreset) -> Option<Self> {
        match preset {
            EqPreset::Neutral => None,
            EqPreset::Narration => Some(Self {
                frequency: 300.0,
                gain_db: 2.0,
                q: 1.0,
            }),
            EqPreset::Podcast => Some(Self {
                frequency: 5000.0,
                gain_db: -1.0,
                q: 2.0,
            }),
        }
    }
}

/// Direct form I biquad section
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    /// Peaking filter from the audio EQ cookbook
    pub fn peaking(band: EqBand, sample_rate: u32) -> Self {
        let a = 10f64.powf(band.gain_db / 40.0);
        let w0 = 2.0 * PI * band.frequency / sample_rate as f64;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * band.q.max(1e-3));

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_w0) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha / a) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    #[inline]
    pub fn tick(&mut self, x: f32) -> f32 {
        let x = x as f64;
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y as f32
    }
}

/// Preset-driven EQ stage; neutral passes audio through untouched
#[derive(Debug, Clone)]
pub struct ParametricEq {
    filter: Option<Biquad>,
}

impl ParametricEq {
    pub fn from_preset(preset: EqPreset, sample_rate: u32) -> Self {
        Self {
            filter: EqBand::for_preset(preset).map(|band| Biquad::peaking(band, sample_rate)),
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.filter.is_none()
    }
}

impl DspStage for ParametricEq {
    fn name(&self) -> &'static str {
        "eq"
    }

    fn process(&mut self, pcm: &mut Vec<f32>) {
        let Some(filter) = self.filter.as_mut() else {
            return;
        };
        for x in pcm.iter_mut() {
            *x = filter.tick(*x);
        }
    }
}
