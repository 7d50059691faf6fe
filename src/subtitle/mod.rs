//! Subtitle timing and sidecar export

mod aligner;
mod export;

pub use aligner::{duration_secs, realign_to_duration, split_into_phonemes, Timestamp, TimestampAligner};
pub use export::{
    to_chapters, to_srt, to_vtt, write_chapters, write_subtitles, SubtitleFormat, MAX_CHAPTERS,
    MIN_CHAPTER_SECS,
};
