//! Graph-constrained path decoding
//!
//! A [`Decoder`] turns one sparse observation into a [`PathDistribution`]
//! holding either a single path with mass `1.0` or nothing at all. Per-path
//! problems (dead ends, unreachable observations) never surface as errors:
//! they are listed as [`DecodeFailure`]s on the returned [`DecodeOutcome`].
//! Only configuration problems (a predictor or network that disagrees with
//! the vocabulary, a sequence that does not fit `max_len`) return `Err`.
//!
//! - [`predictor`]: the [`Predictor`] capability and stub implementations.
//! - [`subsequence`]: the in-order containment check that decides success.

pub mod predictor;
pub mod subsequence;

mod greedy;
mod stitch;

pub use predictor::{FnPredictor, Predictor, UniformPredictor};
pub use subsequence::is_subsequence;

use crate::encoding::{SequenceEncoder, TokenVocabulary};
use crate::errors::{InferenceError, Result};
use crate::graph::NetworkTopology;
use crate::pipeline::observer::{DecodeObserver, NoopObserver};
use crate::types::{DecodingStrategy, InferenceConfig, NodeId, PathDistribution, SegmentId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Outcome types
// ============================================================================

/// Token committed by one greedy step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDecision {
    /// An observed segment, forced
    Anchor(SegmentId),
    /// The best-scoring admissible segment
    Predicted(SegmentId),
    /// Every observation is covered
    End,
    /// No admissible continuation
    DeadEnd,
}

/// How the greedy search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Completed,
    Truncated,
    BudgetExhausted,
}

/// A non-fatal reason a path could not be (fully) reconstructed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeFailure {
    #[error("no admissible continuation after segment {segment}")]
    ConnectivityGap { segment: SegmentId },

    #[error("decoded path does not contain every observed segment")]
    ValidationFailure,

    #[error("no route from node {from_node} to node {to_node}")]
    FallbackUnavailable { from_node: NodeId, to_node: NodeId },

    #[error("step budget of {max_len} exhausted")]
    StepBudgetExhausted { max_len: usize },
}

impl DecodeFailure {
    /// Stable name for tallies and logs
    pub fn name(&self) -> &'static str {
        match self {
            DecodeFailure::ConnectivityGap { .. } => "connectivity_gap",
            DecodeFailure::ValidationFailure => "validation_failure",
            DecodeFailure::FallbackUnavailable { .. } => "fallback_unavailable",
            DecodeFailure::StepBudgetExhausted { .. } => "step_budget_exhausted",
        }
    }
}

/// Everything a decode produced for one observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeOutcome {
    /// `{path: 1.0}` on success, empty otherwise
    pub distribution: PathDistribution,
    /// How the greedy search stopped (`None` when it did not run)
    pub termination: Option<Termination>,
    /// Problems met on the way, in order
    pub failures: Vec<DecodeFailure>,
    /// Greedy steps taken
    pub steps: usize,
    /// Whether the result came from shortest-path stitching
    pub used_fallback: bool,
}

impl DecodeOutcome {
    /// Whether a path was produced
    pub fn is_complete(&self) -> bool {
        !self.distribution.is_empty()
    }

    /// The predicted path, if any
    pub fn path(&self) -> Option<&[SegmentId]> {
        self.distribution.most_likely().map(|h| h.path.as_slice())
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// Decodes sparse observations on one network with one predictor.
///
/// The vocabulary is fixed at construction and checked against both the
/// network and (when it reports one) the predictor's output size.
#[derive(Debug, Clone)]
pub struct Decoder<'g, G: ?Sized, P> {
    graph: &'g G,
    predictor: P,
    encoder: SequenceEncoder,
    config: InferenceConfig,
}

impl<'g, G, P> Decoder<'g, G, P>
where
    G: NetworkTopology + ?Sized,
    P: Predictor,
{
    /// Create a decoder whose vocabulary is sized from the network
    pub fn new(graph: &'g G, predictor: P, config: InferenceConfig) -> Result<Self> {
        let vocab = TokenVocabulary::for_network(graph);
        Self::with_vocabulary(graph, predictor, vocab, config)
    }

    /// Create a decoder with an explicit vocabulary
    pub fn with_vocabulary(
        graph: &'g G,
        predictor: P,
        vocab: TokenVocabulary,
        config: InferenceConfig,
    ) -> Result<Self> {
        config.validate()?;
        vocab.check_network(graph)?;
        if let Some(size) = predictor.vocab_size() {
            if size != vocab.size() {
                return Err(InferenceError::malformed_vocabulary(vocab.size(), size));
            }
        }
        let encoder = SequenceEncoder::new(vocab, config.max_len).with_layout(config.feature_layout);
        Ok(Self {
            graph,
            predictor,
            encoder,
            config,
        })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn encoder(&self) -> &SequenceEncoder {
        &self.encoder
    }

    pub fn vocab(&self) -> &TokenVocabulary {
        self.encoder.vocab()
    }

    pub fn graph(&self) -> &'g G {
        self.graph
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    /// Decode one sparse observation
    pub fn decode(&self, sparse: &[SegmentId]) -> Result<DecodeOutcome> {
        self.decode_with_observer(sparse, &mut NoopObserver)
    }

    /// Decode one sparse observation, reporting each step to `observer`
    pub fn decode_with_observer<O>(&self, sparse: &[SegmentId], observer: &mut O) -> Result<DecodeOutcome>
    where
        O: DecodeObserver + ?Sized,
    {
        let _span = tracing::debug_span!(
            "decode_path",
            sparse_len = sparse.len(),
            strategy = ?self.config.strategy
        )
        .entered();

        if sparse.is_empty() {
            return Err(InferenceError::empty_input("sparse observation has no segments"));
        }
        if let Some(&segment) = sparse.iter().find(|&&s| !self.vocab().is_segment(s)) {
            return Err(InferenceError::UnknownSegment { segment });
        }

        match self.config.strategy {
            DecodingStrategy::GreedyAnchored => self.decode_greedy(sparse, observer),
            DecodingStrategy::ShortestPathOnly => {
                let mut outcome = DecodeOutcome {
                    distribution: PathDistribution::empty(),
                    termination: None,
                    failures: Vec::new(),
                    steps: 0,
                    used_fallback: false,
                };
                self.apply_fallback(sparse, &mut outcome, observer);
                Ok(outcome)
            }
        }
    }

    fn decode_greedy<O>(&self, sparse: &[SegmentId], observer: &mut O) -> Result<DecodeOutcome>
    where
        O: DecodeObserver + ?Sized,
    {
        let source = self.encoder.encode(sparse, self.graph)?;
        let run = greedy::run(
            self.graph,
            &self.predictor,
            self.vocab(),
            &source,
            sparse,
            self.config.max_len,
            observer,
        )?;

        let mut outcome = DecodeOutcome {
            distribution: PathDistribution::empty(),
            termination: Some(run.termination),
            failures: Vec::new(),
            steps: run.steps,
            used_fallback: false,
        };

        if is_subsequence(sparse, &run.path) {
            outcome.distribution = PathDistribution::single(run.path);
            return Ok(outcome);
        }

        match run.termination {
            Termination::Truncated => {
                if let Some(&segment) = run.path.last() {
                    outcome.failures.push(DecodeFailure::ConnectivityGap { segment });
                }
            }
            Termination::BudgetExhausted => {
                outcome.failures.push(DecodeFailure::StepBudgetExhausted {
                    max_len: self.config.max_len,
                });
            }
            Termination::Completed => {}
        }
        outcome.failures.push(DecodeFailure::ValidationFailure);

        if self.config.use_shortest_path {
            self.apply_fallback(sparse, &mut outcome, observer);
        } else {
            tracing::debug!(path_len = run.path.len(), "greedy path rejected, no fallback");
        }
        Ok(outcome)
    }

    fn apply_fallback<O>(&self, sparse: &[SegmentId], outcome: &mut DecodeOutcome, observer: &mut O)
    where
        O: DecodeObserver + ?Sized,
    {
        let stitched = stitch::stitch(self.graph, sparse);
        observer.on_fallback(&stitched.path, &stitched.gaps);
        tracing::debug!(
            path_len = stitched.path.len(),
            gaps = stitched.gaps.len(),
            "stitched observations with shortest paths"
        );

        outcome.failures.extend(stitched.gaps);
        if is_subsequence(sparse, &stitched.path) {
            outcome.distribution = PathDistribution::single(stitched.path);
            outcome.used_fallback = true;
        }
    }
}
