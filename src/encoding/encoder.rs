//! Fixed-length sequence encoder
//!
//! A sparse observation `[s0, s1, ..., sk]` becomes
//! `[Begin, s0, (Mask), s1, ..., sk, End, Pad, ...]`, where a discontinuity
//! marker sits between every consecutive pair that is not downstream-adjacent.
//! Ground-truth targets are framed the same way without markers.

use super::vocab::{TokenIndex, TokenVocabulary};
use crate::errors::{InferenceError, Result};
use crate::graph::NetworkTopology;
use crate::types::{FeatureLayout, Path, SegmentId};
use serde::{Deserialize, Serialize};

/// A token sequence of exactly `max_len` positions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedSequence {
    tokens: Vec<TokenIndex>,
    content_len: usize,
}

impl EncodedSequence {
    /// All positions, padding included
    pub fn tokens(&self) -> &[TokenIndex] {
        &self.tokens
    }

    /// Number of positions before padding
    pub fn content_len(&self) -> usize {
        self.content_len
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Count of discontinuity markers in the sequence
    pub fn mask_count(&self, vocab: &TokenVocabulary) -> usize {
        let mask = vocab.mask();
        self.tokens.iter().filter(|&&t| t == mask).count()
    }
}

/// Encoder bound to one vocabulary, sequence length and feature layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceEncoder {
    vocab: TokenVocabulary,
    max_len: usize,
    layout: FeatureLayout,
}

impl SequenceEncoder {
    pub fn new(vocab: TokenVocabulary, max_len: usize) -> Self {
        Self {
            vocab,
            max_len,
            layout: FeatureLayout::default(),
        }
    }

    /// Builder method: set the per-position feature layout
    pub fn with_layout(mut self, layout: FeatureLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn vocab(&self) -> &TokenVocabulary {
        &self.vocab
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn layout(&self) -> FeatureLayout {
        self.layout
    }

    /// Encode a sparse observation.
    ///
    /// Fails with [`InferenceError::SequenceOverflow`] when the framed
    /// observation plus its discontinuity markers does not fit in `max_len`.
    pub fn encode<G>(&self, sparse: &[SegmentId], graph: &G) -> Result<EncodedSequence>
    where
        G: NetworkTopology + ?Sized,
    {
        if sparse.is_empty() {
            return Err(InferenceError::empty_input("sparse observation has no segments"));
        }
        self.check_segments(sparse)?;

        let mut tokens = Vec::with_capacity(self.max_len.max(sparse.len() + 2));
        tokens.push(self.vocab.begin());
        for (i, &segment) in sparse.iter().enumerate() {
            tokens.push(segment);
            if let Some(&next) = sparse.get(i + 1) {
                if !graph.is_adjacent(segment, next) {
                    tokens.push(self.vocab.mask());
                }
            }
        }
        tokens.push(self.vocab.end());

        self.pad(tokens)
    }

    /// Encode a ground-truth path as `[Begin, path..., End, Pad...]`
    pub fn encode_target(&self, path: &[SegmentId]) -> Result<EncodedSequence> {
        if path.is_empty() {
            return Err(InferenceError::empty_input("ground-truth path has no segments"));
        }
        self.check_segments(path)?;

        let mut tokens = Vec::with_capacity(self.max_len.max(path.len() + 2));
        tokens.push(self.vocab.begin());
        tokens.extend_from_slice(path);
        tokens.push(self.vocab.end());

        self.pad(tokens)
    }

    /// Recover the segment path of an encoded sequence
    pub fn decode_tokens(&self, tokens: &[TokenIndex]) -> Path {
        self.vocab.decode_tokens(tokens)
    }

    /// Per-position feature vectors in the configured layout
    pub fn features(&self, sequence: &EncodedSequence) -> Vec<Vec<f64>> {
        let width = self.layout.width(self.vocab.size());
        sequence
            .tokens()
            .iter()
            .map(|&token| {
                let mut row = vec![0.0; width];
                match self.layout {
                    FeatureLayout::IndexWithAttribute => row[0] = f64::from(token),
                    FeatureLayout::OneHot => row[token as usize] = 1.0,
                }
                row
            })
            .collect()
    }

    /// Rebuild a sequence from feature vectors produced by [`features`](Self::features)
    pub fn from_features(&self, rows: &[Vec<f64>]) -> Result<EncodedSequence> {
        let width = self.layout.width(self.vocab.size());
        let mut tokens = Vec::with_capacity(rows.len());

        for row in rows {
            if row.len() != width {
                return Err(InferenceError::malformed_vocabulary(width, row.len()));
            }
            let index = match self.layout {
                FeatureLayout::IndexWithAttribute => {
                    let value = row[0];
                    let whole = value.is_finite() && value >= 0.0 && value.fract() == 0.0;
                    // range check before the cast so large values cannot wrap
                    if !whole || value >= self.vocab.size() as f64 {
                        return Err(InferenceError::UnknownToken {
                            index: if whole { value as usize } else { usize::MAX },
                            vocab_size: self.vocab.size(),
                        });
                    }
                    value as usize
                }
                FeatureLayout::OneHot => {
                    let hot: Vec<usize> = row[..self.vocab.size()]
                        .iter()
                        .enumerate()
                        .filter(|(_, &v)| v != 0.0)
                        .map(|(i, _)| i)
                        .collect();
                    match hot.as_slice() {
                        [single] if row[*single] == 1.0 => *single,
                        _ => {
                            return Err(InferenceError::UnknownToken {
                                index: hot.first().copied().unwrap_or(usize::MAX),
                                vocab_size: self.vocab.size(),
                            })
                        }
                    }
                }
            };
            tokens.push(index as TokenIndex);
        }

        let content_len = tokens
            .iter()
            .position(|&t| t == self.vocab.pad())
            .unwrap_or(tokens.len());
        Ok(EncodedSequence {
            tokens,
            content_len,
        })
    }

    fn check_segments(&self, path: &[SegmentId]) -> Result<()> {
        match path.iter().find(|&&s| !self.vocab.is_segment(s)) {
            Some(&segment) => Err(InferenceError::UnknownSegment { segment }),
            None => Ok(()),
        }
    }

    fn pad(&self, mut tokens: Vec<TokenIndex>) -> Result<EncodedSequence> {
        let content_len = tokens.len();
        if content_len > self.max_len {
            return Err(InferenceError::sequence_overflow(content_len, self.max_len));
        }
        tokens.resize(self.max_len, self.vocab.pad());
        Ok(EncodedSequence {
            tokens,
            content_len,
        })
    }
}
