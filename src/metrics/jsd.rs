//! Jensen–Shannon divergence between route distributions
//!
//! Routes are compared by identity: the ground-truth side counts how often
//! each distinct reference path occurs, the predicted side accumulates the
//! probability mass of each distinct predicted path. Paths with no
//! prediction can be pooled into a synthetic "unseen" route.

use crate::types::{PathDistribution, SegmentId};
use std::collections::BTreeMap;

/// Identity of a route in the comparison
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteKey {
    Path(Vec<SegmentId>),
    /// Pooled mass of paths that received no prediction
    Unseen,
}

/// Ground-truth frequency and predicted mass per route
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteFrequencies {
    routes: BTreeMap<RouteKey, (f64, f64)>,
}

impl RouteFrequencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one evaluated path
    pub fn add(&mut self, reference: &[SegmentId], predicted: &PathDistribution, include_unseen: bool) {
        self.routes
            .entry(RouteKey::Path(reference.to_vec()))
            .or_default()
            .0 += 1.0;

        if predicted.is_empty() && include_unseen {
            self.routes.entry(RouteKey::Unseen).or_default().1 += 1.0;
        }
        for (path, probability) in predicted.iter() {
            self.routes
                .entry(RouteKey::Path(path.to_vec()))
                .or_default()
                .1 += probability;
        }
    }

    /// Number of distinct routes on either side
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Divergence between the normalized ground-truth and predicted sides.
    ///
    /// NaN when either side carries no mass.
    pub fn divergence(&self) -> f64 {
        let (p, q): (Vec<f64>, Vec<f64>) = self.routes.values().copied().unzip();
        js_divergence(&p, &q)
    }
}

/// Jensen–Shannon divergence (log base 2) of two weight vectors.
///
/// Both inputs are normalized first; NaN when either sums to zero or the
/// lengths differ.
pub fn js_divergence(p: &[f64], q: &[f64]) -> f64 {
    if p.len() != q.len() {
        return f64::NAN;
    }
    let p_total: f64 = p.iter().sum();
    let q_total: f64 = q.iter().sum();
    if p_total <= 0.0 || q_total <= 0.0 {
        return f64::NAN;
    }

    let mut divergence = 0.0;
    for (&pi, &qi) in p.iter().zip(q) {
        let pi = pi / p_total;
        let qi = qi / q_total;
        let mi = 0.5 * (pi + qi);
        if pi > 0.0 {
            divergence += 0.5 * pi * (pi / mi).log2();
        }
        if qi > 0.0 {
            divergence += 0.5 * qi * (qi / mi).log2();
        }
    }
    divergence
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_is_zero() {
        assert!(js_divergence(&[0.2, 0.8], &[2.0, 8.0]).abs() < 1e-12);
    }

    #[test]
    fn test_disjoint_is_one() {
        assert!((js_divergence(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric() {
        let p = [0.1, 0.4, 0.5];
        let q = [0.3, 0.3, 0.4];
        assert!((js_divergence(&p, &q) - js_divergence(&q, &p)).abs() < 1e-12);
    }

    #[test]
    fn test_undefined() {
        assert!(js_divergence(&[0.0, 0.0], &[1.0, 0.0]).is_nan());
        assert!(js_divergence(&[1.0], &[0.5, 0.5]).is_nan());
    }

    #[test]
    fn test_route_frequencies() {
        let mut freq = RouteFrequencies::new();
        freq.add(&[1, 2], &PathDistribution::single(vec![1, 2]), true);
        freq.add(&[3, 4], &PathDistribution::empty(), true);
        assert_eq!(freq.len(), 3);
        // gt {a: .5, b: .5}, pred {a: .5, unseen: .5}
        assert!((freq.divergence() - 0.5).abs() < 1e-12);

        let mut without = RouteFrequencies::new();
        without.add(&[1, 2], &PathDistribution::single(vec![1, 2]), false);
        without.add(&[3, 4], &PathDistribution::empty(), false);
        assert_eq!(without.len(), 2);
        assert!(without.divergence() > 0.0);
    }
}
