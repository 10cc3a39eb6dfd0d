//! Core types for rapid_pathinfer
//!
//! This module defines the fundamental data structures used throughout the library,
//! including segment and node identifiers, path distributions, and configuration.

use crate::errors::{InferenceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a directed network segment (link).
///
/// Segment ids are dense: a network with `n` segments uses ids `0..n`, which is
/// what lets them double as token indices in the vocabulary.
pub type SegmentId = u32;

/// Identifier of a network node (intersection).
pub type NodeId = u32;

/// An ordered sequence of segment ids.
pub type Path = Vec<SegmentId>;

// ============================================================================
// Path distribution
// ============================================================================

/// One candidate path and the probability mass assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathHypothesis {
    /// The candidate path (order-significant)
    pub path: Path,
    /// Probability mass in `[0, 1]`
    pub probability: f64,
}

/// Mapping from candidate paths to probability mass.
///
/// Insertion order is preserved so that iteration (and therefore every
/// probability-weighted metric) is deterministic. The greedy decoder produces
/// at most one hypothesis with mass `1.0`; an empty distribution means
/// "no prediction available".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathDistribution {
    hypotheses: Vec<PathHypothesis>,
}

impl PathDistribution {
    /// Create an empty distribution (total prediction failure)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a single-hypothesis distribution with mass `1.0`
    pub fn single(path: Path) -> Self {
        Self {
            hypotheses: vec![PathHypothesis {
                path,
                probability: 1.0,
            }],
        }
    }

    /// Add mass to a path, merging with an existing identical path
    pub fn insert(&mut self, path: Path, probability: f64) {
        if let Some(existing) = self.hypotheses.iter_mut().find(|h| h.path == path) {
            existing.probability += probability;
            return;
        }
        self.hypotheses.push(PathHypothesis { path, probability });
    }

    /// Iterate over `(path, probability)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&[SegmentId], f64)> {
        self.hypotheses
            .iter()
            .map(|h| (h.path.as_slice(), h.probability))
    }

    /// All hypotheses in insertion order
    pub fn hypotheses(&self) -> &[PathHypothesis] {
        &self.hypotheses
    }

    /// The hypothesis with the largest mass (first one wins ties)
    pub fn most_likely(&self) -> Option<&PathHypothesis> {
        self.hypotheses.iter().fold(None, |best, h| match best {
            Some(b) if b.probability >= h.probability => Some(b),
            _ => Some(h),
        })
    }

    /// Sum of all probability mass
    pub fn total_mass(&self) -> f64 {
        self.hypotheses.iter().map(|h| h.probability).sum()
    }

    /// Number of distinct hypotheses
    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    /// Check if no prediction is available
    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }
}

impl FromIterator<(Path, f64)> for PathDistribution {
    fn from_iter<I: IntoIterator<Item = (Path, f64)>>(iter: I) -> Self {
        let mut dist = PathDistribution::empty();
        for (path, probability) in iter {
            dist.insert(path, probability);
        }
        dist
    }
}

/// Predicted distributions keyed by path index
pub type Predictions = BTreeMap<usize, PathDistribution>;

// ============================================================================
// Decoding strategy
// ============================================================================

/// How a committed path is produced from a sparse observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodingStrategy {
    /// Autoregressive argmax over graph-admissible segments with
    /// observation-anchor forcing.
    #[default]
    GreedyAnchored,
    /// Skip the predictor and stitch observations with shortest paths.
    ShortestPathOnly,
}

impl std::str::FromStr for DecodingStrategy {
    type Err = InferenceError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "argmax" | "greedy" | "greedy_anchored" => Ok(DecodingStrategy::GreedyAnchored),
            "shortest_path" | "shortest_path_only" | "shortest" => {
                Ok(DecodingStrategy::ShortestPathOnly)
            }
            other => Err(InferenceError::invalid_config(format!(
                "unknown path generation method '{other}'"
            ))),
        }
    }
}

// ============================================================================
// Feature layout
// ============================================================================

/// Per-position representation of an encoded sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLayout {
    /// `[token_index, 0.0]`: the index followed by a reserved attribute slot.
    #[default]
    IndexWithAttribute,
    /// One-hot over the vocabulary followed by the reserved attribute slot.
    OneHot,
}

impl FeatureLayout {
    /// Width of one position's feature vector
    pub fn width(self, vocab_size: usize) -> usize {
        match self {
            FeatureLayout::IndexWithAttribute => 2,
            FeatureLayout::OneHot => vocab_size + 1,
        }
    }
}

// ============================================================================
// Execution mode
// ============================================================================

/// Controls whether batch inference fans out over a thread pool.
///
/// Paths are independent, so both modes produce identical results; results
/// are always keyed by path index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Decode paths on the rayon thread pool.
    #[default]
    Parallel,
    /// Decode paths one after another on the calling thread.
    Sequential,
}

impl ExecutionMode {
    /// Returns `true` when paths are decoded in parallel.
    pub fn is_parallel(self) -> bool {
        matches!(self, ExecutionMode::Parallel)
    }
}

// ============================================================================
// Mask ratio
// ============================================================================

/// Masking policy used to thin a ground-truth path into a sparse observation.
///
/// Serialized as a number (`0.3`) or the string `"OD"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MaskRatioRepr", into = "MaskRatioRepr")]
pub enum MaskRatio {
    /// Fraction of the path to mask; origin and destination are always kept.
    Ratio(f64),
    /// Keep only origin and destination.
    OriginDestination,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum MaskRatioRepr {
    Ratio(f64),
    Named(String),
}

impl TryFrom<MaskRatioRepr> for MaskRatio {
    type Error = String;

    fn try_from(repr: MaskRatioRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            MaskRatioRepr::Ratio(r) if (0.0..=1.0).contains(&r) => Ok(MaskRatio::Ratio(r)),
            MaskRatioRepr::Ratio(r) => Err(format!("mask ratio must be in [0, 1], got {r}")),
            MaskRatioRepr::Named(name) if name.eq_ignore_ascii_case("od") => {
                Ok(MaskRatio::OriginDestination)
            }
            MaskRatioRepr::Named(name) => Err(format!("unknown mask ratio '{name}'")),
        }
    }
}

impl From<MaskRatio> for MaskRatioRepr {
    fn from(ratio: MaskRatio) -> Self {
        match ratio {
            MaskRatio::Ratio(r) => MaskRatioRepr::Ratio(r),
            MaskRatio::OriginDestination => MaskRatioRepr::Named("OD".to_string()),
        }
    }
}

impl std::fmt::Display for MaskRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaskRatio::Ratio(r) => write!(f, "{r}"),
            MaskRatio::OriginDestination => f.write_str("OD"),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for encoding and decoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Fixed sequence length; also the decoder's step budget
    #[serde(default = "default_max_len")]
    pub max_len: usize,
    /// Path generation method
    #[serde(default)]
    pub strategy: DecodingStrategy,
    /// Stitch observations with shortest paths when greedy decoding fails
    #[serde(default)]
    pub use_shortest_path: bool,
    /// Feature representation handed to the predictor
    #[serde(default)]
    pub feature_layout: FeatureLayout,
    /// Batch execution mode
    #[serde(default)]
    pub execution: ExecutionMode,
}

fn default_max_len() -> usize {
    30
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_len: default_max_len(),
            strategy: DecodingStrategy::GreedyAnchored,
            use_shortest_path: false,
            feature_layout: FeatureLayout::IndexWithAttribute,
            execution: ExecutionMode::Parallel,
        }
    }
}

impl InferenceConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // begin + at least one segment + end
        if self.max_len < 3 {
            return Err(InferenceError::invalid_config(format!(
                "max_len must be >= 3, got {}",
                self.max_len
            )));
        }
        Ok(())
    }

    /// Builder method: set the sequence length / step budget
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Builder method: set the decoding strategy
    pub fn with_strategy(mut self, strategy: DecodingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder method: enable or disable the shortest-path fallback
    pub fn with_shortest_path_fallback(mut self, enabled: bool) -> Self {
        self.use_shortest_path = enabled;
        self
    }

    /// Builder method: set the feature layout
    pub fn with_feature_layout(mut self, layout: FeatureLayout) -> Self {
        self.feature_layout = layout;
        self
    }

    /// Builder method: set the execution mode
    pub fn with_execution(mut self, mode: ExecutionMode) -> Self {
        self.execution = mode;
        self
    }
}

/// Configuration for metric evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Score against the full trip (`true`) or only the span covered by
    /// the sparse observation (`false`)
    #[serde(default = "default_true")]
    pub is_global_path: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            is_global_path: true,
        }
    }
}

impl EvaluationConfig {
    /// Builder method: choose global or clipped scoring
    pub fn with_global_path(mut self, is_global_path: bool) -> Self {
        self.is_global_path = is_global_path;
        self
    }
}

/// Configuration for observation simulation and dataset splitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationConfig {
    /// Mask ratios used to build training observations
    #[serde(default = "default_mask_ratios")]
    pub mask_ratios: Vec<MaskRatio>,
    /// Fraction of segments carrying a detector
    #[serde(default = "default_detector_coverage")]
    pub detector_coverage: f64,
    /// Fraction of paths assigned to the training split
    #[serde(default = "default_train_ratio")]
    pub train_ratio: f64,
    /// Seed for reproducible sampling (entropy-seeded when absent)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_mask_ratios() -> Vec<MaskRatio> {
    vec![
        MaskRatio::Ratio(0.1),
        MaskRatio::Ratio(0.3),
        MaskRatio::Ratio(0.5),
        MaskRatio::Ratio(0.7),
        MaskRatio::Ratio(0.9),
        MaskRatio::OriginDestination,
    ]
}

fn default_detector_coverage() -> f64 {
    0.4
}

fn default_train_ratio() -> f64 {
    0.8
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            mask_ratios: default_mask_ratios(),
            detector_coverage: default_detector_coverage(),
            train_ratio: default_train_ratio(),
            seed: None,
        }
    }
}

impl ObservationConfig {
    /// Parse a config from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detector_coverage) {
            return Err(InferenceError::invalid_config(format!(
                "detector_coverage must be between 0 and 1, got {}",
                self.detector_coverage
            )));
        }
        if !(self.train_ratio > 0.0 && self.train_ratio <= 1.0) {
            return Err(InferenceError::invalid_config(format!(
                "train_ratio must be in (0, 1], got {}",
                self.train_ratio
            )));
        }
        if self.mask_ratios.is_empty() {
            return Err(InferenceError::invalid_config(
                "mask_ratios must not be empty",
            ));
        }
        Ok(())
    }

    /// Builder method: set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method: set detector coverage
    pub fn with_detector_coverage(mut self, coverage: f64) -> Self {
        self.detector_coverage = coverage;
        self
    }
}
