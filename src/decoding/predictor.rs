//! Next-token predictor capability
//!
//! The decoder never looks inside the model: it asks for one score vector per
//! step and combines it with graph constraints. Anything that can produce
//! such a vector (a neural network adapter, a lookup table, a test stub)
//! implements [`Predictor`].

use crate::encoding::{EncodedSequence, TokenIndex, TokenVocabulary};
use std::sync::Arc;

/// Scores the next token given an encoded source and the generated prefix.
///
/// # Contract
///
/// - **Input**: the encoded sparse observation and the committed prefix,
///   which always starts with the `Begin` token.
/// - **Output**: one score per vocabulary entry, aligned to the
///   [`TokenVocabulary`] index mapping. Scores need not sum to 1 but must be
///   comparable; only their order among graph-admissible segments matters.
/// - **Thread safety**: batch inference shares one predictor across
///   workers, so parallel runs additionally require `Sync`.
pub trait Predictor {
    /// Score every vocabulary entry as the next token.
    fn predict(&self, source: &EncodedSequence, prefix: &[TokenIndex]) -> Vec<f64>;

    /// Vocabulary size this predictor was built for, when known up front.
    ///
    /// A known size is checked once when a decoder is constructed.
    fn vocab_size(&self) -> Option<usize> {
        None
    }
}

impl<P: Predictor + ?Sized> Predictor for &P {
    fn predict(&self, source: &EncodedSequence, prefix: &[TokenIndex]) -> Vec<f64> {
        (**self).predict(source, prefix)
    }

    fn vocab_size(&self) -> Option<usize> {
        (**self).vocab_size()
    }
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn predict(&self, source: &EncodedSequence, prefix: &[TokenIndex]) -> Vec<f64> {
        (**self).predict(source, prefix)
    }

    fn vocab_size(&self) -> Option<usize> {
        (**self).vocab_size()
    }
}

impl<P: Predictor + ?Sized> Predictor for Arc<P> {
    fn predict(&self, source: &EncodedSequence, prefix: &[TokenIndex]) -> Vec<f64> {
        (**self).predict(source, prefix)
    }

    fn vocab_size(&self) -> Option<usize> {
        (**self).vocab_size()
    }
}

/// Equal score for every token.
///
/// With uniform scores the decoder follows anchors where possible and
/// otherwise takes the first admissible neighbor in adjacency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformPredictor {
    vocab_size: usize,
}

impl UniformPredictor {
    pub fn new(vocab: &TokenVocabulary) -> Self {
        Self {
            vocab_size: vocab.size(),
        }
    }
}

impl Predictor for UniformPredictor {
    fn predict(&self, _source: &EncodedSequence, _prefix: &[TokenIndex]) -> Vec<f64> {
        vec![1.0 / self.vocab_size as f64; self.vocab_size]
    }

    fn vocab_size(&self) -> Option<usize> {
        Some(self.vocab_size)
    }
}

/// Adapter turning a closure into a [`Predictor`]
pub struct FnPredictor<F> {
    func: F,
}

impl<F> FnPredictor<F>
where
    F: Fn(&EncodedSequence, &[TokenIndex]) -> Vec<f64>,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Predictor for FnPredictor<F>
where
    F: Fn(&EncodedSequence, &[TokenIndex]) -> Vec<f64>,
{
    fn predict(&self, source: &EncodedSequence, prefix: &[TokenIndex]) -> Vec<f64> {
        (self.func)(source, prefix)
    }
}

impl<F> std::fmt::Debug for FnPredictor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPredictor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::SequenceEncoder;
    use crate::graph::builder::RoadNetwork;

    #[test]
    fn test_uniform_predictor() {
        let vocab = TokenVocabulary::new(6);
        let network = RoadNetwork::from_segments(&[(0, 1, 1.0); 6]).unwrap();
        let source = SequenceEncoder::new(vocab, 6).encode(&[0], &network).unwrap();

        let predictor = UniformPredictor::new(&vocab);
        let scores = predictor.predict(&source, &[vocab.begin()]);
        assert_eq!(scores.len(), 10);
        assert!((scores.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(predictor.vocab_size(), Some(10));
    }

    #[test]
    fn test_fn_predictor_and_blanket_impls() {
        let vocab = TokenVocabulary::new(2);
        let network = RoadNetwork::from_segments(&[(0, 1, 1.0), (1, 0, 1.0)]).unwrap();
        let source = SequenceEncoder::new(vocab, 5).encode(&[0, 1], &network).unwrap();

        let predictor = FnPredictor::new(|_: &EncodedSequence, prefix: &[TokenIndex]| {
            vec![prefix.len() as f64; 6]
        });
        assert_eq!(predictor.predict(&source, &[4, 0])[0], 2.0);
        assert_eq!(predictor.vocab_size(), None);

        let shared: Arc<dyn Predictor> = Arc::new(UniformPredictor::new(&vocab));
        assert_eq!(shared.vocab_size(), Some(6));
        let boxed: Box<dyn Predictor> = Box::new(predictor);
        assert_eq!((&boxed).predict(&source, &[4])[5], 1.0);
    }
}
