//! Batch execution and decode instrumentation
//!
//! - [`observer`]: per-step hooks into the greedy decoder.
//! - [`runner`]: decodes a whole [`SparseDictionary`](crate::dataset::SparseDictionary).

pub mod observer;
pub mod runner;

pub use observer::{DecodeObserver, DecodeTrace, NoopObserver, RecordingObserver};
pub use runner::{BatchReport, InferenceRunner};
