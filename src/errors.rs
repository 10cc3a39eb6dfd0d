//! Error types for rapid_pathinfer
//!
//! Only configuration-level and I/O problems surface as [`InferenceError`].
//! A path that cannot be reconstructed is not an error: the decoder reports
//! it as an empty distribution together with a
//! [`DecodeFailure`](crate::decoding::DecodeFailure).

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, InferenceError>;

/// Main error type for rapid_pathinfer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// Input path or dictionary is empty where content is required
    #[error("Empty input: {message}")]
    EmptyInput { message: String },

    /// Configuration validation failed
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Encoded content does not fit in the fixed sequence length
    #[error("Sequence overflow: {required} positions required, max_len is {max_len}")]
    SequenceOverflow { required: usize, max_len: usize },

    /// A feature vector or token index falls outside the vocabulary
    #[error("Unknown token index {index} (vocabulary size {vocab_size})")]
    UnknownToken { index: usize, vocab_size: usize },

    /// Encoder, decoder, network and predictor disagree on the token mapping
    #[error("Malformed vocabulary mapping: expected {expected}, found {found}")]
    MalformedVocabulary { expected: usize, found: usize },

    /// A segment id is not part of the network
    #[error("Unknown segment {segment}")]
    UnknownSegment { segment: u32 },

    /// A path index is absent from a dictionary
    #[error("No path recorded for index {index}")]
    MissingPath { index: usize },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Reading or writing a persisted artifact failed
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl InferenceError {
    /// Create an empty input error
    pub fn empty_input(message: impl Into<String>) -> Self {
        Self::EmptyInput {
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a sequence overflow error
    pub fn sequence_overflow(required: usize, max_len: usize) -> Self {
        Self::SequenceOverflow { required, max_len }
    }

    /// Create a malformed vocabulary error
    pub fn malformed_vocabulary(expected: usize, found: usize) -> Self {
        Self::MalformedVocabulary { expected, found }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Check if this error is a fatal vocabulary disagreement
    /// (must be fixed at startup, never retried per path)
    pub fn is_vocabulary_mismatch(&self) -> bool {
        matches!(self, Self::MalformedVocabulary { .. })
    }
}

impl From<serde_json::Error> for InferenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for InferenceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}
