//! Structured error handling for the voiceover pipeline
//!
//! Provides a hierarchical error type with enough context to tell recoverable
//! lookups (missing voice, bad checksum) apart from hard failures at the
//! orchestrator boundary.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias with TtsError
pub type Result<T> = std::result::Result<T, TtsError>;

/// Main error type for the voiceover pipeline
#[derive(Error, Debug, Clone)]
pub enum TtsError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Malformed markup; callers treat the fragment as plain text
    #[error("Parse error: {message} (near {fragment:?})")]
    Parse {
        message: String,
        fragment: String,
    },

    /// A named resource could not be found
    #[error("{resource} not found: {name} ({message})")]
    Lookup {
        resource: ResourceType,
        name: String,
        message: String,
    },

    /// Stored data does not match its recorded checksum
    #[error("Checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// A model runner failed
    #[error("Inference error in runner '{runner}': {message}")]
    Inference {
        runner: String,
        message: String,
        recoverable: bool,
    },

    /// Audio encoding errors
    #[error("Audio error: {message}")]
    Audio {
        message: String,
        path: Option<PathBuf>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// Internal/bug errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        location: Option<String>,
    },
}

impl TtsError {
    /// Shorthand for a lookup failure
    pub fn not_found(resource: ResourceType, name: impl Into<String>, message: impl Into<String>) -> Self {
        TtsError::Lookup {
            resource,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an I/O failure tied to a path
    pub fn io_at(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        TtsError::Io {
            message: format!("{}: {}", path.display(), err),
            path: Some(path),
        }
    }

    /// Whether a documented fallback exists for this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            TtsError::Parse { .. } | TtsError::Lookup { .. } | TtsError::ChecksumMismatch { .. } => true,
            TtsError::Inference { recoverable, .. } => *recoverable,
            _ => false,
        }
    }
}

/// Resource types that can be looked up by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Voice,
    Embedding,
    Dictionary,
    Vocabulary,
    InputFile,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Voice => write!(f, "voice"),
            ResourceType::Embedding => write!(f, "embedding"),
            ResourceType::Dictionary => write!(f, "dictionary"),
            ResourceType::Vocabulary => write!(f, "vocabulary"),
            ResourceType::InputFile => write!(f, "input file"),
        }
    }
}

/// Convert from anyhow::Error
impl From<anyhow::Error> for TtsError {
    fn from(err: anyhow::Error) -> Self {
        TtsError::Internal {
            message: err.to_string(),
            location: None,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for TtsError {
    fn from(err: std::io::Error) -> Self {
        TtsError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_yaml::Error> for TtsError {
    fn from(err: serde_yaml::Error) -> Self {
        TtsError::Config {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for TtsError {
    fn from(err: serde_json::Error) -> Self {
        TtsError::Config {
            message: format!("Invalid JSON: {}", err),
            path: None,
        }
    }
}

impl From<hound::Error> for TtsError {
    fn from(err: hound::Error) -> Self {
        TtsError::Audio {
            message: err.to_string(),
            path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TtsError::Config {
            message: "Invalid chunk size".to_string(),
            path: Some(PathBuf::from("pipeline.yaml")),
        };
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Invalid chunk size"));
    }

    #[test]
    fn test_lookup_and_checksum_are_distinct() {
        let lookup = TtsError::not_found(ResourceType::Voice, "narrator", "no metadata");
        let checksum = TtsError::ChecksumMismatch {
            name: "narrator".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert!(matches!(lookup, TtsError::Lookup { resource: ResourceType::Voice, .. }));
        assert!(matches!(checksum, TtsError::ChecksumMismatch { .. }));
        assert!(lookup.to_string().starts_with("voice not found"));
        assert!(lookup.is_recoverable());
        assert!(checksum.is_recoverable());
    }

    #[test]
    fn test_recoverability() {
        let fatal = TtsError::Io { message: "disk full".into(), path: None };
        assert!(!fatal.is_recoverable());

        let soft = TtsError::Inference {
            runner: "onnx".into(),
            message: "session unavailable".into(),
            recoverable: true,
        };
        assert!(soft.is_recoverable());
    }

    #[test]
    fn test_resource_type_display() {
        assert_eq!(ResourceType::InputFile.to_string(), "input file");
    }
}
