//! Anchored greedy search
//!
//! Each step asks the predictor for scores, then commits exactly one token:
//!
//! 1. right after `Begin`, the first observed segment;
//! 2. `End`, once every observed segment appears in the prefix in order;
//! 3. the next observed segment, when it is downstream of the current one;
//! 4. otherwise the best-scoring downstream segment (first one wins ties).
//!
//! The search stops on `End`, at a dead end, or when the step budget runs out.

use super::subsequence::is_subsequence;
use super::{StepDecision, Termination};
use crate::encoding::{EncodedSequence, TokenIndex, TokenVocabulary};
use crate::errors::Result;
use crate::graph::NetworkTopology;
use crate::pipeline::observer::DecodeObserver;
use crate::types::{Path, SegmentId};

use super::predictor::Predictor;

/// Result of one greedy search
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GreedyRun {
    /// Committed segments, `Begin` stripped
    pub path: Path,
    pub termination: Termination,
    pub steps: usize,
}

/// Best-scoring candidate, keeping the first of equal maxima.
///
/// Returns `None` when there are no candidates or the best score is not
/// positive.
pub(crate) fn stable_argmax(candidates: &[SegmentId], scores: &[f64]) -> Option<SegmentId> {
    let mut best: Option<(SegmentId, f64)> = None;
    for &candidate in candidates {
        let Some(&score) = scores.get(candidate as usize) else {
            continue;
        };
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((candidate, score));
        }
    }
    best.filter(|&(_, score)| score > 0.0)
        .map(|(candidate, _)| candidate)
}

pub(crate) fn run<G, P, O>(
    graph: &G,
    predictor: &P,
    vocab: &TokenVocabulary,
    source: &EncodedSequence,
    sparse: &[SegmentId],
    max_len: usize,
    observer: &mut O,
) -> Result<GreedyRun>
where
    G: NetworkTopology + ?Sized,
    P: Predictor + ?Sized,
    O: DecodeObserver + ?Sized,
{
    let begin = vocab.begin();
    let mut generated: Vec<TokenIndex> = Vec::with_capacity(max_len + 1);
    generated.push(begin);
    let mut anchor = 0;
    let mut termination = Termination::BudgetExhausted;
    let mut steps = 0;

    for step in 0..max_len {
        steps = step + 1;
        let scores = predictor.predict(source, &generated);
        vocab.check_scores(&scores)?;

        let current = generated[generated.len() - 1];
        let decision = if current == begin {
            anchor = 1;
            StepDecision::Anchor(sparse[0])
        } else if is_subsequence(sparse, &generated[1..]) {
            StepDecision::End
        } else {
            let candidates = graph.downstream(current);
            match sparse.get(anchor) {
                Some(&next) if candidates.contains(&next) => {
                    anchor += 1;
                    StepDecision::Anchor(next)
                }
                _ => match stable_argmax(candidates, &scores) {
                    Some(segment) => StepDecision::Predicted(segment),
                    None => StepDecision::DeadEnd,
                },
            }
        };
        observer.on_step(step, &decision);

        match decision {
            StepDecision::Anchor(segment) | StepDecision::Predicted(segment) => {
                generated.push(segment);
            }
            StepDecision::End => {
                termination = Termination::Completed;
                break;
            }
            StepDecision::DeadEnd => {
                tracing::debug!(segment = current, step, "no admissible continuation");
                termination = Termination::Truncated;
                break;
            }
        }
    }

    if termination == Termination::BudgetExhausted {
        tracing::debug!(max_len, "step budget exhausted");
    }

    let path: Path = generated[1..].to_vec();
    observer.on_terminate(termination, &path);
    Ok(GreedyRun {
        path,
        termination,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::predictor::{FnPredictor, UniformPredictor};
    use crate::encoding::SequenceEncoder;
    use crate::errors::InferenceError;
    use crate::graph::builder::RoadNetwork;
    use crate::pipeline::observer::{NoopObserver, RecordingObserver};

    fn cycle() -> RoadNetwork {
        RoadNetwork::from_segments(&[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 0, 1.0)]).unwrap()
    }

    #[test]
    fn test_stable_argmax() {
        let scores = [0.1, 0.5, 0.5, 0.2];
        assert_eq!(stable_argmax(&[0, 1, 2, 3], &scores), Some(1));
        assert_eq!(stable_argmax(&[2, 1], &scores), Some(2));
        assert_eq!(stable_argmax(&[], &scores), None);
        assert_eq!(stable_argmax(&[0], &[0.0]), None);
        assert_eq!(stable_argmax(&[0, 1], &[f64::NAN, 0.3]), Some(1));
        assert_eq!(stable_argmax(&[9], &scores), None);
    }

    #[test]
    fn test_anchor_forcing_on_cycle() {
        let network = cycle();
        let vocab = TokenVocabulary::for_network(&network);
        let source = SequenceEncoder::new(vocab, 10).encode(&[0, 3], &network).unwrap();
        let mut observer = RecordingObserver::new();

        let run = run(
            &network,
            &UniformPredictor::new(&vocab),
            &vocab,
            &source,
            &[0, 3],
            10,
            &mut observer,
        )
        .unwrap();

        assert_eq!(run.path, vec![0, 1, 2, 3]);
        assert_eq!(run.termination, Termination::Completed);
        assert_eq!(run.steps, 5);
        assert_eq!(
            observer.trace().decisions,
            vec![
                StepDecision::Anchor(0),
                StepDecision::Predicted(1),
                StepDecision::Predicted(2),
                StepDecision::Anchor(3),
                StepDecision::End,
            ]
        );
    }

    #[test]
    fn test_dead_end_truncates() {
        let mut network = cycle();
        network.set_downstream(2, Vec::new()).unwrap();
        let vocab = TokenVocabulary::for_network(&network);
        let source = SequenceEncoder::new(vocab, 10).encode(&[0, 3], &network).unwrap();

        let run = run(
            &network,
            &UniformPredictor::new(&vocab),
            &vocab,
            &source,
            &[0, 3],
            10,
            &mut NoopObserver,
        )
        .unwrap();
        assert_eq!(run.path, vec![0, 1, 2]);
        assert_eq!(run.termination, Termination::Truncated);
    }

    #[test]
    fn test_budget_exhausted() {
        let network = cycle();
        let vocab = TokenVocabulary::for_network(&network);
        let source = SequenceEncoder::new(vocab, 5).encode(&[0, 3], &network).unwrap();

        let run = run(
            &network,
            &UniformPredictor::new(&vocab),
            &vocab,
            &source,
            &[0, 3],
            3,
            &mut NoopObserver,
        )
        .unwrap();
        assert_eq!(run.path, vec![0, 1, 2]);
        assert_eq!(run.termination, Termination::BudgetExhausted);
    }

    #[test]
    fn test_zero_scores_truncate() {
        let network = cycle();
        let vocab = TokenVocabulary::for_network(&network);
        let source = SequenceEncoder::new(vocab, 10).encode(&[0, 3], &network).unwrap();
        let silent = FnPredictor::new(|_: &EncodedSequence, _: &[TokenIndex]| vec![0.0; 8]);

        let run = run(&network, &silent, &vocab, &source, &[0, 3], 10, &mut NoopObserver).unwrap();
        assert_eq!(run.path, vec![0]);
        assert_eq!(run.termination, Termination::Truncated);
    }

    #[test]
    fn test_wrong_score_length_is_fatal() {
        let network = cycle();
        let vocab = TokenVocabulary::for_network(&network);
        let source = SequenceEncoder::new(vocab, 10).encode(&[0, 3], &network).unwrap();
        let short = FnPredictor::new(|_: &EncodedSequence, _: &[TokenIndex]| vec![1.0; 4]);

        let err = run(&network, &short, &vocab, &source, &[0, 3], 10, &mut NoopObserver).unwrap_err();
        assert_eq!(err, InferenceError::malformed_vocabulary(8, 4));
    }
}
