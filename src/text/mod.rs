//! Text processing modules
//!
//! - Markup segmentation (break / prosody / emphasis / breath)
//! - Pronunciation dictionary substitution
//! - Locale vocabulary tokenization

mod dictionary;
mod segmenter;
mod tokenizer;

pub use dictionary::PronunciationDictionary;
pub use segmenter::{MarkupSegmenter, TextSegment, DEFAULT_BREAK_SECS};
pub use tokenizer::{
    grapheme_to_phoneme, TokenUnit, Tokenizer, Vocabulary, VocabularyTokenizer, UNKNOWN_TOKEN,
};
