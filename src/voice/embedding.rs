//! Voice identity vectors

use std::ops::Deref;

/// Length of the constant fallback vector
pub const EMBEDDING_DIM: usize = 256;

/// Value every element of the fallback vector takes
pub const FALLBACK_VALUE: f32 = 0.5;

/// Fixed-length voice identity vector
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Deterministic default used whenever a voice cannot be loaded
    pub fn fallback() -> Self {
        Self(vec![FALLBACK_VALUE; EMBEDDING_DIM])
    }

    /// Decode a raw little-endian f32 byte vector; trailing partial words are ignored
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        Self(
            bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Interpolate toward `other`: `self * (1 - t) + other * t`
    ///
    /// `t` is clamped to `[0, 1]`; the result covers the common length.
    /// Neither input is modified.
    pub fn blend(&self, other: &Embedding, t: f32) -> Embedding {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        Embedding(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a * (1.0 - t) + b * t)
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl Deref for Embedding {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}
