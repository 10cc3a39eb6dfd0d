//! Batch inference runner
//!
//! [`InferenceRunner`] decodes every requested observation of a
//! [`SparseDictionary`] with one [`Decoder`]. Paths are independent, so with
//! [`ExecutionMode::Parallel`](crate::types::ExecutionMode) they are spread
//! over the rayon pool; results land in a `BTreeMap` keyed by path index so
//! the report does not depend on scheduling.
//!
//! A path that fails to decode, or whose observation cannot be encoded,
//! contributes an empty distribution and is counted as failed. Only a
//! vocabulary mismatch aborts the whole batch.

use crate::dataset::SparseDictionary;
use crate::decoding::{DecodeOutcome, Decoder, Predictor};
use crate::errors::{InferenceError, Result};
use crate::graph::NetworkTopology;
use crate::pipeline::observer::{DecodeTrace, RecordingObserver};
use crate::types::{PathDistribution, Predictions, SegmentId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Enter an `info` span for a batch stage
macro_rules! trace_stage {
    ($name:expr) => {
        let _span = tracing::info_span!("pipeline_stage", stage = $name).entered();
    };
}

// ============================================================================
// BatchReport
// ============================================================================

/// Outcome of decoding a batch of observations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// One distribution per requested index, empty for failed paths
    pub predictions: Predictions,
    /// Paths that produced a prediction
    pub completed: usize,
    /// Paths that did not
    pub failed: usize,
    /// Completed paths whose prediction came from stitching
    pub fallback_used: usize,
    /// Occurrences of each [`DecodeFailure`](crate::decoding::DecodeFailure) kind
    pub failure_tallies: BTreeMap<String, usize>,
    /// Paths rejected before decoding, with the reason
    pub errors: BTreeMap<usize, String>,
}

impl BatchReport {
    /// Number of decoded paths
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }

    /// Completed paths over all paths, 0 for an empty batch
    pub fn completion_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.completed as f64 / total as f64,
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn record(&mut self, idx: usize, result: Result<DecodeOutcome>) -> Result<()> {
        match result {
            Ok(outcome) => {
                for failure in &outcome.failures {
                    *self.failure_tallies.entry(failure.name().to_string()).or_insert(0) += 1;
                }
                if outcome.is_complete() {
                    self.completed += 1;
                    if outcome.used_fallback {
                        self.fallback_used += 1;
                    }
                } else {
                    self.failed += 1;
                }
                self.predictions.insert(idx, outcome.distribution);
            }
            Err(err) if err.is_vocabulary_mismatch() => return Err(err),
            Err(err) => {
                tracing::debug!(path = idx, error = %err, "path rejected");
                self.failed += 1;
                self.errors.insert(idx, err.to_string());
                self.predictions.insert(idx, PathDistribution::empty());
            }
        }
        Ok(())
    }
}

// ============================================================================
// InferenceRunner
// ============================================================================

/// Runs a [`Decoder`] over many observations
#[derive(Debug, Clone)]
pub struct InferenceRunner<'g, G: ?Sized, P> {
    decoder: Decoder<'g, G, P>,
}

impl<'g, G, P> InferenceRunner<'g, G, P>
where
    G: NetworkTopology + Sync + ?Sized,
    P: Predictor + Sync,
{
    pub fn new(decoder: Decoder<'g, G, P>) -> Self {
        Self { decoder }
    }

    pub fn decoder(&self) -> &Decoder<'g, G, P> {
        &self.decoder
    }

    fn decode_one(&self, idx: usize, sparse: &[SegmentId]) -> Result<DecodeOutcome> {
        let _span = tracing::debug_span!("path", index = idx).entered();
        self.decoder.decode(sparse)
    }

    /// Decode the observations at `idxs` (all of them when `None`).
    ///
    /// Repeated indices are decoded once. Returns
    /// [`InferenceError::MissingPath`] if a requested index has no
    /// observation.
    pub fn run(&self, sparse: &SparseDictionary, idxs: Option<&[usize]>) -> Result<BatchReport> {
        let results = self.decode_batch(sparse, idxs)?;
        Self::assemble(results)
    }

    fn decode_batch<'s>(
        &self,
        sparse: &'s SparseDictionary,
        idxs: Option<&[usize]>,
    ) -> Result<Vec<(usize, Result<DecodeOutcome>)>> {
        trace_stage!("decode_batch");

        let work: Vec<(usize, &'s [SegmentId])> = match idxs {
            Some(idxs) => idxs
                .iter()
                .copied()
                .collect::<BTreeSet<usize>>()
                .into_iter()
                .map(|idx| {
                    sparse
                        .get(idx)
                        .map(|path| (idx, path.as_slice()))
                        .ok_or(InferenceError::MissingPath { index: idx })
                })
                .collect::<Result<_>>()?,
            None => sparse.iter().map(|(idx, path)| (idx, path.as_slice())).collect(),
        };

        let results = if self.decoder.config().execution.is_parallel() {
            work.par_iter()
                .map(|&(idx, path)| (idx, self.decode_one(idx, path)))
                .collect()
        } else {
            work.iter()
                .map(|&(idx, path)| (idx, self.decode_one(idx, path)))
                .collect()
        };
        Ok(results)
    }

    fn assemble(results: Vec<(usize, Result<DecodeOutcome>)>) -> Result<BatchReport> {
        trace_stage!("assemble_report");

        let mut report = BatchReport::default();
        for (idx, result) in results {
            report.record(idx, result)?;
        }

        tracing::info!(
            total = report.total(),
            completed = report.completed,
            failed = report.failed,
            fallback = report.fallback_used,
            "batch decoded"
        );
        Ok(report)
    }

    /// Decode a single observation and capture its step trace
    pub fn trace(&self, sparse: &SparseDictionary, idx: usize) -> Result<(DecodeOutcome, DecodeTrace)> {
        let path = sparse.get(idx).ok_or(InferenceError::MissingPath { index: idx })?;
        let mut observer = RecordingObserver::new();
        let outcome = self.decoder.decode_with_observer(path, &mut observer)?;
        Ok((outcome, observer.into_trace()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::{FnPredictor, UniformPredictor};
    use crate::encoding::{EncodedSequence, TokenIndex, TokenVocabulary};
    use crate::graph::builder::RoadNetwork;
    use crate::types::{ExecutionMode, InferenceConfig};

    fn cycle() -> RoadNetwork {
        RoadNetwork::from_segments(&[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 0, 1.0)]).unwrap()
    }

    fn observations() -> SparseDictionary {
        let mut sparse = SparseDictionary::new();
        sparse.insert(0, vec![0, 3]);
        sparse.insert(1, vec![1, 2]);
        sparse.insert(2, vec![0, 2, 0, 2]);
        sparse
    }

    fn runner(network: &RoadNetwork, config: InferenceConfig) -> InferenceRunner<'_, RoadNetwork, UniformPredictor> {
        let predictor = UniformPredictor::new(&TokenVocabulary::for_network(network));
        InferenceRunner::new(Decoder::new(network, predictor, config).unwrap())
    }

    #[test]
    fn test_run_all_paths() {
        let network = cycle();
        let runner = runner(&network, InferenceConfig::default());
        let report = runner.run(&observations(), None).unwrap();

        assert_eq!(report.predictions.len(), 3);
        assert_eq!(report.predictions[&0].most_likely().map(|h| h.path.clone()), Some(vec![0, 1, 2, 3]));
        assert_eq!(report.predictions[&1].most_likely().map(|h| h.path.clone()), Some(vec![1, 2]));
        assert_eq!(report.total(), 3);
        assert!(report.completed >= 2);
    }

    #[test]
    fn test_overflow_counts_as_failed_path() {
        let network = cycle();
        let config = InferenceConfig::default().with_max_len(4);
        let runner = runner(&network, config);
        let report = runner.run(&observations(), Some(&[1, 2])).unwrap();

        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 1);
        assert!(report.errors.contains_key(&2));
        assert!(report.predictions[&2].is_empty());
        assert!((report.completion_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let network = cycle();
        let sparse = observations();
        let parallel = runner(&network, InferenceConfig::default()).run(&sparse, None).unwrap();
        let sequential = runner(
            &network,
            InferenceConfig::default().with_execution(ExecutionMode::Sequential),
        )
        .run(&sparse, None)
        .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_failure_tallies() {
        let mut network = cycle();
        network.set_downstream(2, Vec::new()).unwrap();
        let mut sparse = SparseDictionary::new();
        sparse.insert(0, vec![0, 3]);

        let report = runner(&network, InferenceConfig::default()).run(&sparse, None).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.failure_tallies.get("connectivity_gap"), Some(&1));
        assert_eq!(report.failure_tallies.get("validation_failure"), Some(&1));

        let fallback = InferenceConfig::default().with_shortest_path_fallback(true);
        let report = runner(&network, fallback).run(&sparse, None).unwrap();
        assert_eq!(report.completed, 1);
        assert_eq!(report.fallback_used, 1);
    }

    #[test]
    fn test_repeated_index_decoded_once() {
        let network = cycle();
        let report = runner(&network, InferenceConfig::default())
            .run(&observations(), Some(&[0, 0, 1, 0]))
            .unwrap();

        assert_eq!(report.predictions.len(), 2);
        assert_eq!(report.completed, 2);
        assert_eq!(report.total(), report.predictions.len());
        assert!((report.completion_rate() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_index_is_error() {
        let network = cycle();
        let err = runner(&network, InferenceConfig::default())
            .run(&observations(), Some(&[0, 42]))
            .unwrap_err();
        assert_eq!(err, InferenceError::MissingPath { index: 42 });
    }

    #[test]
    fn test_vocabulary_mismatch_aborts_batch() {
        let network = cycle();
        let predictor = FnPredictor::new(|_: &EncodedSequence, _: &[TokenIndex]| vec![1.0; 4]);
        let decoder = Decoder::new(&network, predictor, InferenceConfig::default()).unwrap();
        let err = InferenceRunner::new(decoder).run(&observations(), None).unwrap_err();
        assert!(err.is_vocabulary_mismatch());
    }

    #[test]
    fn test_trace_single_path() {
        let network = cycle();
        let (outcome, trace) = runner(&network, InferenceConfig::default())
            .trace(&observations(), 0)
            .unwrap();
        assert!(outcome.is_complete());
        assert_eq!(trace.greedy_path, Some(vec![0, 1, 2, 3]));
    }
}
