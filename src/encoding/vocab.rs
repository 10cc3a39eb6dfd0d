//! Token vocabulary: segment ids plus four control tokens
//!
//! Segments occupy indices `0..num_segments`; the control tokens follow in a
//! fixed order (`Begin`, `End`, `MaskDiscontinuity`, `Pad`). The mapping is
//! fixed once from the network size and shared by the encoder, the decoder
//! and every predictor adapter.

use crate::errors::{InferenceError, Result};
use crate::graph::NetworkTopology;
use crate::types::{Path, SegmentId};
use serde::{Deserialize, Serialize};

/// Index of a token in the vocabulary
pub type TokenIndex = u32;

/// Reserved non-segment tokens, in index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlToken {
    Begin,
    End,
    MaskDiscontinuity,
    Pad,
}

impl ControlToken {
    /// All control tokens in vocabulary order
    pub const ALL: [ControlToken; 4] = [
        ControlToken::Begin,
        ControlToken::End,
        ControlToken::MaskDiscontinuity,
        ControlToken::Pad,
    ];

    fn offset(self) -> u32 {
        match self {
            ControlToken::Begin => 0,
            ControlToken::End => 1,
            ControlToken::MaskDiscontinuity => 2,
            ControlToken::Pad => 3,
        }
    }
}

/// A decoded vocabulary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Segment(SegmentId),
    Control(ControlToken),
}

/// Immutable token-index mapping for one network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenVocabulary {
    num_segments: usize,
}

impl TokenVocabulary {
    /// Number of reserved control tokens
    pub const CONTROL_TOKENS: usize = ControlToken::ALL.len();

    pub fn new(num_segments: usize) -> Self {
        Self { num_segments }
    }

    /// Vocabulary sized for a network
    pub fn for_network<G: NetworkTopology + ?Sized>(network: &G) -> Self {
        Self::new(network.num_segments())
    }

    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    /// Total number of tokens (segments + control tokens)
    pub fn size(&self) -> usize {
        self.num_segments + Self::CONTROL_TOKENS
    }

    /// Index of a control token
    pub fn control(&self, token: ControlToken) -> TokenIndex {
        self.num_segments as TokenIndex + token.offset()
    }

    pub fn begin(&self) -> TokenIndex {
        self.control(ControlToken::Begin)
    }

    pub fn end(&self) -> TokenIndex {
        self.control(ControlToken::End)
    }

    pub fn mask(&self) -> TokenIndex {
        self.control(ControlToken::MaskDiscontinuity)
    }

    pub fn pad(&self) -> TokenIndex {
        self.control(ControlToken::Pad)
    }

    /// Index of any token
    pub fn index_of(&self, token: Token) -> TokenIndex {
        match token {
            Token::Segment(id) => id,
            Token::Control(c) => self.control(c),
        }
    }

    /// Token at an index, failing outside the vocabulary
    pub fn token(&self, index: TokenIndex) -> Result<Token> {
        let idx = index as usize;
        if idx < self.num_segments {
            return Ok(Token::Segment(index));
        }
        ControlToken::ALL
            .get(idx - self.num_segments)
            .map(|&c| Token::Control(c))
            .ok_or(InferenceError::UnknownToken {
                index: idx,
                vocab_size: self.size(),
            })
    }

    /// Whether an index denotes a segment
    pub fn is_segment(&self, index: TokenIndex) -> bool {
        (index as usize) < self.num_segments
    }

    /// Check that a network has exactly the segments this vocabulary maps
    pub fn check_network<G: NetworkTopology + ?Sized>(&self, network: &G) -> Result<()> {
        if network.num_segments() != self.num_segments {
            return Err(InferenceError::malformed_vocabulary(
                self.size(),
                network.num_segments() + Self::CONTROL_TOKENS,
            ));
        }
        Ok(())
    }

    /// Check that a score vector covers the whole vocabulary
    pub fn check_scores(&self, scores: &[f64]) -> Result<()> {
        if scores.len() != self.size() {
            return Err(InferenceError::malformed_vocabulary(self.size(), scores.len()));
        }
        Ok(())
    }

    /// Recover the segment path from a token sequence.
    ///
    /// A leading `Begin` is dropped, reading stops at the first `End`, and
    /// discontinuity markers and padding are skipped.
    pub fn decode_tokens(&self, tokens: &[TokenIndex]) -> Path {
        let body = match tokens.first() {
            Some(&first) if first == self.begin() => &tokens[1..],
            _ => tokens,
        };
        body.iter()
            .take_while(|&&t| t != self.end())
            .copied()
            .filter(|&t| self.is_segment(t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_token_indices() {
        let vocab = TokenVocabulary::new(100);
        assert_eq!(vocab.size(), 104);
        assert_eq!(vocab.begin(), 100);
        assert_eq!(vocab.end(), 101);
        assert_eq!(vocab.mask(), 102);
        assert_eq!(vocab.pad(), 103);
    }

    #[test]
    fn test_token_lookup() {
        let vocab = TokenVocabulary::new(4);
        assert_eq!(vocab.token(3).unwrap(), Token::Segment(3));
        assert_eq!(vocab.token(6).unwrap(), Token::Control(ControlToken::MaskDiscontinuity));
        assert!(matches!(
            vocab.token(8),
            Err(InferenceError::UnknownToken { index: 8, vocab_size: 8 })
        ));
        for token in ControlToken::ALL {
            let idx = vocab.index_of(Token::Control(token));
            assert_eq!(vocab.token(idx).unwrap(), Token::Control(token));
        }
    }

    #[test]
    fn test_decode_tokens() {
        let vocab = TokenVocabulary::new(10);
        let tokens = [vocab.begin(), 0, vocab.mask(), 3, vocab.end(), vocab.pad(), 7];
        assert_eq!(vocab.decode_tokens(&tokens), vec![0, 3]);
        assert_eq!(vocab.decode_tokens(&[4, 5]), vec![4, 5]);
        assert!(vocab.decode_tokens(&[]).is_empty());
    }

    #[test]
    fn test_check_scores() {
        let vocab = TokenVocabulary::new(4);
        assert!(vocab.check_scores(&[0.0; 8]).is_ok());
        let err = vocab.check_scores(&[0.0; 4]).unwrap_err();
        assert!(err.is_vocabulary_mismatch());
    }
}
