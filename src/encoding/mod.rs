//! Token vocabulary and sequence encoding
//!
//! - [`vocab`]: segment ids plus the four control tokens.
//! - [`encoder`]: fixed-length source/target sequences and feature layouts.
//! - [`training`]: shifted decoder-input/label pairs for training.

pub mod encoder;
pub mod training;
pub mod vocab;

pub use encoder::{EncodedSequence, SequenceEncoder};
pub use training::{build_training_set, TrainingSample};
pub use vocab::{ControlToken, Token, TokenIndex, TokenVocabulary};
