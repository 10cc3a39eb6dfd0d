//! # rapid_pathinfer
//!
//! Reconstructs full vehicle trajectories on a road network from sparse
//! observations of the segments they traversed.
//!
//! A sparse observation (an ordered subset of a trip's segments) is encoded
//! into a fixed-length token sequence, then decoded one segment at a time by
//! a pluggable [`Predictor`]. Decoding is constrained to the network's
//! downstream adjacency and forced through every observed segment in order.
//! When the greedy search cannot connect the observations, a shortest-path
//! stitch over the network can fill the gaps instead.
//!
//! ## Modules
//!
//! - [`graph`]: road network, adjacency contract, shortest paths, synthetic grids
//! - [`encoding`]: token vocabulary, sequence encoder, training pairs
//! - [`decoding`]: predictor capability, greedy decoder, stitching fallback
//! - [`observation`]: masking policies, detector simulation, dataset splits
//! - [`dataset`]: persisted path dictionaries and adjacency maps
//! - [`metrics`]: BLEU-1, edit distance, TLLA and JSD
//! - [`pipeline`]: batch runner and decode observers

pub mod dataset;
pub mod decoding;
pub mod encoding;
pub mod errors;
pub mod graph;
pub mod metrics;
pub mod observation;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use errors::{InferenceError, Result};
pub use types::{
    DecodingStrategy, EvaluationConfig, ExecutionMode, FeatureLayout, InferenceConfig, MaskRatio,
    NodeId, ObservationConfig, Path, PathDistribution, PathHypothesis, Predictions, SegmentId,
};

// Re-export main functionality
pub use dataset::{AdjacencyMap, PathDictionary, SparseDictionary};
pub use decoding::{
    is_subsequence, DecodeFailure, DecodeOutcome, Decoder, FnPredictor, Predictor, StepDecision,
    Termination, UniformPredictor,
};
pub use encoding::{EncodedSequence, SequenceEncoder, TokenIndex, TokenVocabulary};
pub use graph::builder::{NetworkBuilder, RoadNetwork};
pub use graph::{AdjacencyOrder, NetworkTopology, RouteMetric};
pub use metrics::{Evaluator, MetricsReport};
pub use observation::SparseObservation;
pub use pipeline::{BatchReport, DecodeObserver, InferenceRunner, NoopObserver, RecordingObserver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
