//! Path reconstruction metrics
//!
//! Per-path scores are probability-weighted over the hypotheses of a
//! [`PathDistribution`] and then averaged across paths. An empty
//! distribution scores the worst case for each metric (BLEU 0, edit
//! distance 1, TLLA 0), and any NaN from a degenerate reference is replaced
//! by that same worst case before averaging.
//!
//! - [`bleu`]: unigram sentence BLEU.
//! - [`edit_distance`]: Levenshtein distance, normalized by reference length.
//! - [`tlla`]: total link-length accuracy.
//! - [`jsd`]: Jensen–Shannon divergence between route distributions.

pub mod bleu;
pub mod edit_distance;
pub mod jsd;
pub mod tlla;

pub use bleu::bleu1;
pub use edit_distance::{levenshtein_distance, normalized_edit_distance};
pub use jsd::{js_divergence, RouteFrequencies, RouteKey};
pub use tlla::tlla;

use crate::dataset::{PathDictionary, SparseDictionary};
use crate::errors::Result;
use crate::graph::NetworkTopology;
use crate::observation::align_to_ground_truth;
use crate::types::{EvaluationConfig, PathDistribution, Predictions, SegmentId};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const WORST_BLEU: f64 = 0.0;
const WORST_EDIT_DISTANCE: f64 = 1.0;
const WORST_TLLA: f64 = 0.0;
const WORST_JSD: f64 = 1.0;

fn or_worst(value: f64, worst: f64) -> f64 {
    if value.is_nan() {
        worst
    } else {
        value
    }
}

fn mean_or(values: &[f64], empty: f64) -> f64 {
    if values.is_empty() {
        empty
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

// ─── Per-path weighted scores ───────────────────────────────────────────────

/// Probability-weighted BLEU-1 of a distribution against one reference
pub fn weighted_bleu(reference: &[SegmentId], predicted: &PathDistribution) -> f64 {
    if predicted.is_empty() {
        return WORST_BLEU;
    }
    let score = predicted
        .iter()
        .map(|(path, p)| p * bleu1(reference, path))
        .sum();
    or_worst(score, WORST_BLEU)
}

/// Probability-weighted normalized edit distance of a distribution
pub fn weighted_edit_distance(reference: &[SegmentId], predicted: &PathDistribution) -> f64 {
    if predicted.is_empty() {
        return WORST_EDIT_DISTANCE;
    }
    let score = predicted
        .iter()
        .map(|(path, p)| p * normalized_edit_distance(reference, path))
        .sum();
    or_worst(score, WORST_EDIT_DISTANCE)
}

/// Probability-weighted TLLA of a distribution
pub fn weighted_tlla<G>(graph: &G, reference: &[SegmentId], predicted: &PathDistribution) -> f64
where
    G: NetworkTopology + ?Sized,
{
    if predicted.is_empty() {
        return WORST_TLLA;
    }
    let score = predicted
        .iter()
        .map(|(path, p)| p * tlla(graph, reference, path))
        .sum();
    or_worst(score, WORST_TLLA)
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// Aggregate scores over a set of evaluated paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub bleu: f64,
    pub ed: f64,
    pub tlla: f64,
    /// JSD with failed paths pooled into an "unseen" route
    pub jsd: f64,
    /// JSD over completed predictions only
    pub jsd_without_unseen: f64,
    /// Completed paths over evaluated paths
    pub completion_rate: f64,
    /// Requested paths with ground truth, or every predicted path when no
    /// indices are given
    pub total_paths: usize,
    pub completed_paths: usize,
}

impl MetricsReport {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ─── Evaluator ──────────────────────────────────────────────────────────────

/// Scores predictions against a ground-truth dictionary.
///
/// With `is_global_path = false` each reference is clipped to the span
/// between the first and last observed segment. The span comes from the
/// sparse dictionary's recorded ground-truth positions, or from an in-order
/// alignment when none were recorded.
#[derive(Debug, Clone)]
pub struct Evaluator<'a, G: ?Sized> {
    graph: &'a G,
    ground_truth: &'a PathDictionary,
    sparse: &'a SparseDictionary,
    config: EvaluationConfig,
}

impl<'a, G> Evaluator<'a, G>
where
    G: NetworkTopology + ?Sized,
{
    pub fn new(graph: &'a G, ground_truth: &'a PathDictionary, sparse: &'a SparseDictionary) -> Self {
        Self {
            graph,
            ground_truth,
            sparse,
            config: EvaluationConfig::default(),
        }
    }

    /// Builder method: set the evaluation config
    pub fn with_config(mut self, config: EvaluationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Reference path for one index, clipped when scoring locally
    pub fn reference(&self, idx: usize) -> Option<&'a [SegmentId]> {
        let gt = self.ground_truth.get(idx)?.as_slice();
        if self.config.is_global_path {
            return Some(gt);
        }

        let span = |positions: &[usize]| positions.first().copied().zip(positions.last().copied());
        let bounds = match self.sparse.gt_indices(idx) {
            Some(positions) => span(positions),
            None => self
                .sparse
                .get(idx)
                .and_then(|observed| align_to_ground_truth(observed, gt))
                .and_then(|positions| span(&positions)),
        };

        match bounds {
            Some((first, last)) if first <= last && last < gt.len() => Some(&gt[first..=last]),
            _ => {
                tracing::warn!(path = idx, "observation not aligned with ground truth, scoring full path");
                Some(gt)
            }
        }
    }

    /// Paths to score: prediction keys, filtered by `idxs`, that have a reference
    fn selected<'p>(
        &self,
        predictions: &'p Predictions,
        idxs: Option<&[usize]>,
    ) -> Vec<(usize, &'a [SegmentId], &'p PathDistribution)> {
        let wanted: Option<FxHashSet<usize>> = idxs.map(|i| i.iter().copied().collect());
        predictions
            .iter()
            .filter(|(idx, _)| wanted.as_ref().map_or(true, |w| w.contains(idx)))
            .filter_map(|(&idx, dist)| match self.reference(idx) {
                Some(reference) => Some((idx, reference, dist)),
                None => {
                    tracing::warn!(path = idx, "no ground truth for path, skipped");
                    None
                }
            })
            .collect()
    }

    /// Mean probability-weighted BLEU-1
    pub fn bleu(&self, predictions: &Predictions, idxs: Option<&[usize]>) -> f64 {
        let scores: Vec<f64> = self
            .selected(predictions, idxs)
            .into_iter()
            .map(|(_, reference, dist)| weighted_bleu(reference, dist))
            .collect();
        mean_or(&scores, WORST_BLEU)
    }

    /// Mean probability-weighted normalized edit distance
    pub fn edit_distance(&self, predictions: &Predictions, idxs: Option<&[usize]>) -> f64 {
        let scores: Vec<f64> = self
            .selected(predictions, idxs)
            .into_iter()
            .map(|(_, reference, dist)| weighted_edit_distance(reference, dist))
            .collect();
        mean_or(&scores, WORST_EDIT_DISTANCE)
    }

    /// Mean probability-weighted TLLA
    pub fn tlla(&self, predictions: &Predictions, idxs: Option<&[usize]>) -> f64 {
        let scores: Vec<f64> = self
            .selected(predictions, idxs)
            .into_iter()
            .map(|(_, reference, dist)| weighted_tlla(self.graph, reference, dist))
            .collect();
        mean_or(&scores, WORST_TLLA)
    }

    /// JSD between the ground-truth and predicted route distributions.
    ///
    /// Undefined divergences (nothing evaluated, or no predicted mass) score
    /// the worst case 1.
    pub fn jsd(&self, predictions: &Predictions, idxs: Option<&[usize]>, include_unseen: bool) -> f64 {
        let mut routes = RouteFrequencies::new();
        for (_, reference, dist) in self.selected(predictions, idxs) {
            routes.add(reference, dist, include_unseen);
        }
        or_worst(routes.divergence(), WORST_JSD)
    }

    /// Every metric at once
    pub fn evaluate_all(&self, predictions: &Predictions, idxs: Option<&[usize]>) -> MetricsReport
    where
        G: Sync,
    {
        let selected = self.selected(predictions, idxs);

        let per_path: Vec<(f64, f64, f64)> = selected
            .par_iter()
            .map(|&(_, reference, dist)| {
                (
                    weighted_bleu(reference, dist),
                    weighted_edit_distance(reference, dist),
                    weighted_tlla(self.graph, reference, dist),
                )
            })
            .collect();
        let bleu: Vec<f64> = per_path.iter().map(|s| s.0).collect();
        let ed: Vec<f64> = per_path.iter().map(|s| s.1).collect();
        let tlla: Vec<f64> = per_path.iter().map(|s| s.2).collect();

        let mut with_unseen = RouteFrequencies::new();
        let mut without_unseen = RouteFrequencies::new();
        for &(_, reference, dist) in &selected {
            with_unseen.add(reference, dist, true);
            without_unseen.add(reference, dist, false);
        }

        // requested paths with no prediction count as not completed
        let (total_paths, completed_paths) = match idxs {
            Some(idxs) => {
                let requested: BTreeSet<usize> = idxs
                    .iter()
                    .copied()
                    .filter(|&idx| self.ground_truth.get(idx).is_some())
                    .collect();
                let completed = requested
                    .iter()
                    .filter(|idx| predictions.get(idx).is_some_and(|d| !d.is_empty()))
                    .count();
                (requested.len(), completed)
            }
            None => (
                selected.len(),
                selected.iter().filter(|(_, _, d)| !d.is_empty()).count(),
            ),
        };
        let completion_rate = if total_paths == 0 {
            0.0
        } else {
            completed_paths as f64 / total_paths as f64
        };

        let report = MetricsReport {
            bleu: mean_or(&bleu, WORST_BLEU),
            ed: mean_or(&ed, WORST_EDIT_DISTANCE),
            tlla: mean_or(&tlla, WORST_TLLA),
            jsd: or_worst(with_unseen.divergence(), WORST_JSD),
            jsd_without_unseen: or_worst(without_unseen.divergence(), WORST_JSD),
            completion_rate,
            total_paths,
            completed_paths,
        };
        tracing::info!(
            total = report.total_paths,
            completed = report.completed_paths,
            bleu = report.bleu,
            ed = report.ed,
            tlla = report.tlla,
            jsd = report.jsd,
            "evaluation finished"
        );
        report
    }
}
