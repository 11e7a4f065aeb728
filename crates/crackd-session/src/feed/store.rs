use crackd_core::models::{CandidateCard, CaptionCard};
use std::sync::Arc;

/// Ordered cards of one feed session and the position of the card on screen.
///
/// The card list is immutable once loaded; only the cursor moves, and only forward.
#[derive(Debug, Clone)]
pub struct FeedStore {
    cards: Arc<[CaptionCard]>,
    cursor: usize,
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FeedStore {
    pub fn new(cards: Vec<CaptionCard>) -> Self {
        Self {
            cards: Arc::from(cards),
            cursor: 0,
        }
    }

    /// Keep the candidates that have both text and an image, in source order.
    pub fn from_candidates(candidates: Vec<CandidateCard>) -> Self {
        Self::new(
            candidates
                .into_iter()
                .filter_map(CandidateCard::qualify)
                .collect(),
        )
    }

    pub fn cards(&self) -> &[CaptionCard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&CaptionCard> {
        self.cards.get(self.cursor)
    }

    /// Every card has been passed.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.cards.len()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.cursor)
    }

    /// Move past the current card. Returns false if there was none.
    pub fn advance(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.cursor += 1;
        true
    }
}
