//! Subtitle and chapter serialization
//!
//! - SRT-style: `index`, `start --> end`, unit, blank line
//! - VTT-style: `WEBVTT` header, then `start --> end`, unit, blank line
//! - Chapters: `;FFMETADATA1` with fixed-length `[CHAPTER]` stanzas in milliseconds
//!
//! Times are seconds with three decimals.

use std::fmt::Write as _;
use std::path::Path;

use tracing::debug;

use super::aligner::Timestamp;
use crate::core::error::{Result, TtsError};

/// Sidecar subtitle flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Vtt,
}

impl SubtitleFormat {
    /// Pick the format from a `.srt` / `.vtt` extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "srt" => Some(SubtitleFormat::Srt),
            "vtt" => Some(SubtitleFormat::Vtt),
            _ => None,
        }
    }

    pub fn render(self, timestamps: &[Timestamp]) -> String {
        match self {
            SubtitleFormat::Srt => to_srt(timestamps),
            SubtitleFormat::Vtt => to_vtt(timestamps),
        }
    }
}

pub fn to_srt(timestamps: &[Timestamp]) -> String {
    let mut out = String::new();
    for (i, ts) in timestamps.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{:.3} --> {:.3}\n{}\n\n",
            i + 1,
            ts.start_time,
            ts.end_time,
            ts.unit
        );
    }
    out
}

pub fn to_vtt(timestamps: &[Timestamp]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for ts in timestamps {
        let _ = write!(out, "{:.3} --> {:.3}\n{}\n\n", ts.start_time, ts.end_time, ts.unit);
    }
    out
}

/// Shortest chapter accepted; anything below is raised to this
pub const MIN_CHAPTER_SECS: f64 = 0.001;

/// Upper bound on emitted stanzas; longer inputs get proportionally longer chapters
pub const MAX_CHAPTERS: u64 = 10_000;

/// Fixed-length chapters covering `[0, last end time)`
pub fn to_chapters(timestamps: &[Timestamp], chapter_length_secs: f64) -> String {
    let mut out = String::from(";FFMETADATA1\n");
    let end = timestamps.last().map(|t| t.end_time).unwrap_or(0.0);
    if !(chapter_length_secs > 0.0) || !end.is_finite() || end <= 0.0 {
        return out;
    }

    let length = chapter_length_secs
        .max(MIN_CHAPTER_SECS)
        .max(end / MAX_CHAPTERS as f64);
    if length > chapter_length_secs {
        debug!("Chapter length {}s raised to {}s", chapter_length_secs, length);
    }
    let count = ((end / length).ceil() as u64).clamp(1, MAX_CHAPTERS);

    for i in 0..count {
        let start = i as f64 * length;
        if start >= end {
            break;
        }
        let chapter_end = if i + 1 == count {
            end
        } else {
            ((i + 1) as f64 * length).min(end)
        };
        let _ = write!(
            out,
            "[CHAPTER]\nTIMEBASE=1/1000\nSTART={}\nEND={}\ntitle=Chapter {}\n\n",
            (start * 1000.0) as u64,
            (chapter_end * 1000.0) as u64,
            i + 1
        );
    }
    out
}

/// Write subtitles, choosing the format from the file extension
pub fn write_subtitles(timestamps: &[Timestamp], path: &Path) -> Result<SubtitleFormat> {
    let format = SubtitleFormat::from_path(path).ok_or_else(|| TtsError::Validation {
        message: format!("Unsupported subtitle extension: {}", path.display()),
        field: Some("subtitle".to_string()),
    })?;
    std::fs::write(path, format.render(timestamps))
        .map_err(|e| TtsError::io_at(e, path))?;
    debug!("Wrote {} cues to {:?} as {:?}", timestamps.len(), path, format);
    Ok(format)
}

/// Write a chapter metadata file
pub fn write_chapters(timestamps: &[Timestamp], path: &Path, chapter_length_secs: f64) -> Result<()> {
    std::fs::write(path, to_chapters(timestamps, chapter_length_secs))
        .map_err(|e| TtsError::io_at(e, path))?;
    debug!("Wrote chapters to {:?}", path);
    Ok(())
}
