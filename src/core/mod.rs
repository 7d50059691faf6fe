//! Core abstractions shared by every pipeline stage
//!
//! - `error`: structured error handling with recoverability classification

pub mod error;

pub use error::{ResourceType, Result, TtsError};
