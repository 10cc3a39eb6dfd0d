//! Decode observer hooks
//!
//! A [`DecodeObserver`] receives a callback for every greedy step, once when
//! the greedy search stops, and once if stitching runs. All methods default
//! to no-ops, so an observer implements only what it needs.
//!
//! - [`NoopObserver`]: zero-sized default, compiled away.
//! - [`RecordingObserver`]: captures a [`DecodeTrace`] for debugging and tests.

use crate::decoding::{DecodeFailure, StepDecision, Termination};
use crate::types::{Path, SegmentId};
use serde::{Deserialize, Serialize};

/// Callbacks fired while a single path is decoded
pub trait DecodeObserver {
    /// A token was committed (or the search stopped) at `step`
    fn on_step(&mut self, _step: usize, _decision: &StepDecision) {}

    /// The greedy search stopped; `path` excludes the `Begin` token
    fn on_terminate(&mut self, _termination: Termination, _path: &[SegmentId]) {}

    /// Shortest-path stitching produced `path`, leaving `gaps` unbridged
    fn on_fallback(&mut self, _path: &[SegmentId], _gaps: &[DecodeFailure]) {}
}

/// Observer that ignores every callback
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DecodeObserver for NoopObserver {}

/// Everything a [`RecordingObserver`] saw
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodeTrace {
    pub decisions: Vec<StepDecision>,
    pub termination: Option<Termination>,
    pub greedy_path: Option<Path>,
    pub fallback: Option<Path>,
    pub gaps: Vec<DecodeFailure>,
}

/// Observer that records a [`DecodeTrace`]
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    trace: DecodeTrace,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trace(&self) -> &DecodeTrace {
        &self.trace
    }

    pub fn into_trace(self) -> DecodeTrace {
        self.trace
    }

    /// Number of segments the predictor chose (as opposed to forced anchors)
    pub fn predicted_steps(&self) -> usize {
        self.trace
            .decisions
            .iter()
            .filter(|d| matches!(d, StepDecision::Predicted(_)))
            .count()
    }
}

impl DecodeObserver for RecordingObserver {
    fn on_step(&mut self, _step: usize, decision: &StepDecision) {
        self.trace.decisions.push(*decision);
    }

    fn on_terminate(&mut self, termination: Termination, path: &[SegmentId]) {
        self.trace.termination = Some(termination);
        self.trace.greedy_path = Some(path.to_vec());
    }

    fn on_fallback(&mut self, path: &[SegmentId], gaps: &[DecodeFailure]) {
        self.trace.fallback = Some(path.to_vec());
        self.trace.gaps = gaps.to_vec();
    }
}
