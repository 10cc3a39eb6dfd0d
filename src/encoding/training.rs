//! Teacher-forcing training pairs
//!
//! The target `[Begin, path..., End, Pad...]` is split into a decoder input
//! (every position but the last) and labels (every position but the first),
//! so label `i` is the token that follows decoder input `i`.

use super::encoder::{EncodedSequence, SequenceEncoder};
use super::vocab::TokenIndex;
use crate::dataset::PathDictionary;
use crate::errors::{InferenceError, Result};
use crate::graph::NetworkTopology;
use crate::observation::discontinuous_path;
use crate::types::{MaskRatio, SegmentId};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One (source, shifted target) training example
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSample {
    /// Encoded sparse observation
    pub source: EncodedSequence,
    /// Target without its last position (`max_len - 1` tokens)
    pub decoder_input: Vec<TokenIndex>,
    /// Target without its first position (`max_len - 1` tokens)
    pub labels: Vec<TokenIndex>,
}

impl SequenceEncoder {
    /// Build a training sample from a sparse observation and its ground truth
    pub fn training_sample<G>(
        &self,
        sparse: &[SegmentId],
        ground_truth: &[SegmentId],
        graph: &G,
    ) -> Result<TrainingSample>
    where
        G: NetworkTopology + ?Sized,
    {
        let source = self.encode(sparse, graph)?;
        let target = self.encode_target(ground_truth)?;
        let tokens = target.tokens();
        let split = tokens.len().saturating_sub(1);
        Ok(TrainingSample {
            source,
            decoder_input: tokens[..split].to_vec(),
            labels: tokens[1..].to_vec(),
        })
    }
}

/// Build one sample per `(ratio, path)` pair.
///
/// Masking consumes `rng` sequentially in ratio-major order so a seeded run
/// is reproducible; encoding then fans out over the rayon pool. Samples are
/// returned ratio-major, paths in the order of `idxs`.
pub fn build_training_set<G, R>(
    encoder: &SequenceEncoder,
    graph: &G,
    ground_truth: &PathDictionary,
    ratios: &[MaskRatio],
    idxs: &[usize],
    rng: &mut R,
) -> Result<Vec<TrainingSample>>
where
    G: NetworkTopology + Sync + ?Sized,
    R: Rng + ?Sized,
{
    let mut pairs = Vec::with_capacity(ratios.len() * idxs.len());
    for &ratio in ratios {
        for &idx in idxs {
            let path = ground_truth
                .get(idx)
                .ok_or(InferenceError::MissingPath { index: idx })?;
            let observation = discontinuous_path(path, ratio, rng)?;
            pairs.push((observation.segments, path.as_slice()));
        }
        tracing::debug!(%ratio, paths = idxs.len(), "masked training observations");
    }

    let samples = pairs
        .par_iter()
        .map(|(sparse, path)| encoder.training_sample(sparse, path, graph))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        samples = samples.len(),
        ratios = ratios.len(),
        "built training set"
    );
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::vocab::TokenVocabulary;
    use crate::graph::builder::RoadNetwork;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cycle() -> RoadNetwork {
        RoadNetwork::from_segments(&[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 0, 1.0)]).unwrap()
    }

    #[test]
    fn test_training_sample_shift() {
        let network = cycle();
        let enc = SequenceEncoder::new(TokenVocabulary::new(4), 7);
        let sample = enc.training_sample(&[0, 3], &[0, 1, 2, 3], &network).unwrap();

        // target: [4, 0, 1, 2, 3, 5, 7]
        assert_eq!(sample.decoder_input, vec![4, 0, 1, 2, 3, 5]);
        assert_eq!(sample.labels, vec![0, 1, 2, 3, 5, 7]);
        assert_eq!(sample.source.tokens(), &[4, 0, 6, 3, 5, 7, 7]);
    }

    #[test]
    fn test_build_training_set_counts() {
        let network = cycle();
        let enc = SequenceEncoder::new(TokenVocabulary::new(4), 8);
        let gt: PathDictionary = vec![(0, vec![0, 1, 2, 3]), (1, vec![1, 2, 3, 0])]
            .into_iter()
            .collect();
        let ratios = [MaskRatio::Ratio(0.5), MaskRatio::OriginDestination];
        let mut rng = StdRng::seed_from_u64(11);

        let samples = build_training_set(&enc, &network, &gt, &ratios, &[0, 1], &mut rng).unwrap();
        assert_eq!(samples.len(), 4);
        for sample in &samples {
            assert_eq!(sample.decoder_input.len(), 7);
            assert_eq!(sample.labels.len(), 7);
        }
        // OD sample for path 1 keeps only origin and destination
        assert_eq!(enc.decode_tokens(samples[3].source.tokens()), vec![1, 0]);
    }

    #[test]
    fn test_build_training_set_missing_path() {
        let network = cycle();
        let enc = SequenceEncoder::new(TokenVocabulary::new(4), 8);
        let gt = PathDictionary::new();
        let mut rng = StdRng::seed_from_u64(1);
        let err = build_training_set(&enc, &network, &gt, &[MaskRatio::OriginDestination], &[3], &mut rng)
            .unwrap_err();
        assert_eq!(err, InferenceError::MissingPath { index: 3 });
    }
}
