//! Output quality diagnostics

use std::fmt;

/// Peak/RMS/SNR summary of a finished buffer
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QualityReport {
    pub has_clipping: bool,
    /// `20 log10(peak / rms)`, 0 when RMS is 0
    pub snr_db: f32,
    pub peak_level: f32,
    pub rms_level: f32,
}

impl QualityReport {
    /// Analyze a mono buffer; empty input yields the all-zero report
    pub fn analyze(pcm: &[f32]) -> Self {
        if pcm.is_empty() {
            return Self::default();
        }

        let peak = pcm.iter().fold(0.0f32, |m, x| m.max(x.abs()));
        let mean_square = pcm.iter().map(|&x| x as f64 * x as f64).sum::<f64>() / pcm.len() as f64;
        let rms = mean_square.sqrt() as f32;
        let snr_db = if rms > 0.0 {
            20.0 * (peak / rms).log10()
        } else {
            0.0
        };

        Self {
            has_clipping: peak >= 1.0,
            snr_db,
            peak_level: peak,
            rms_level: rms,
        }
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Audio Quality Analysis:")?;
        writeln!(f, "  Peak Level: {:.4}", self.peak_level)?;
        writeln!(f, "  RMS Level: {:.4}", self.rms_level)?;
        writeln!(f, "  SNR: {:.2} dB", self.snr_db)?;
        write!(f, "  Clipping: {}", if self.has_clipping { "Yes" } else { "No" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(QualityReport::analyze(&[]), QualityReport::default());
    }

    #[test]
    fn test_full_scale_square() {
        let r = QualityReport::analyze(&[1.0, -1.0, 1.0, -1.0]);
        assert_eq!(r.peak_level, 1.0);
        assert_eq!(r.rms_level, 1.0);
        assert!(r.has_clipping);
        assert_eq!(r.snr_db, 0.0);
    }

    #[test]
    fn test_silence_has_zero_snr() {
        let r = QualityReport::analyze(&[0.0; 16]);
        assert_eq!(r.snr_db, 0.0);
        assert!(!r.has_clipping);
    }

    #[test]
    fn test_peak_to_rms() {
        let r = QualityReport::analyze(&[0.5, 0.0, 0.0, 0.0]);
        assert_eq!(r.peak_level, 0.5);
        assert!((r.rms_level - 0.25).abs() < 1e-6);
        assert!((r.snr_db - 6.0206).abs() < 1e-3);
    }

    #[test]
    fn test_display() {
        let text = QualityReport::analyze(&[0.5, -0.5]).to_string();
        assert!(text.contains("Peak Level: 0.5000"));
        assert!(text.contains("Clipping: No"));
    }
}
