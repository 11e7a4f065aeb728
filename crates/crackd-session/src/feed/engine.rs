use crackd_core::models::{
    CaptionCard, FeedStatus, SwipeDirection, VoteDecision, VoteResolution, VoteState, VoteValue,
};
use crackd_core::{
    AuthTokenProvider, ErrorMetadata, FeedConfig, FeedError, FeedSource, VoteApi, VoteError,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use super::store::FeedStore;
use crate::log_failure;

/// Why an input did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No session is loaded or every card has been passed
    NoCurrentCard,
    /// The current card is already on its way out
    Advancing,
    VotePending,
    AlreadyDecided,
    /// A vote was refused for lack of credentials; voting stays off until a reload
    SignInRequired,
}

/// Result of a decide, skip or key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Voted { card_id: Uuid, value: VoteValue },
    Skipped { card_id: Uuid },
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TransientError {
    seq: u64,
    message: String,
}

/// Everything the engine knows about the current session.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    generation: u64,
    phase: Phase,
    store: FeedStore,
    decisions: HashMap<Uuid, VoteDecision>,
    leaving: Option<SwipeDirection>,
    transient_error: Option<TransientError>,
    error_seq: u64,
    sign_in_required: bool,
}

impl FeedState {
    pub fn status(&self) -> FeedStatus {
        match &self.phase {
            Phase::NotLoaded => FeedStatus::NotLoaded,
            Phase::Loading => FeedStatus::Loading,
            Phase::Failed(message) => FeedStatus::Failed {
                message: message.clone(),
            },
            Phase::Loaded if self.store.is_empty() => FeedStatus::Empty,
            Phase::Loaded if self.store.is_exhausted() => FeedStatus::Complete,
            Phase::Loaded => FeedStatus::Active,
        }
    }

    pub fn current(&self) -> Option<&CaptionCard> {
        match self.phase {
            Phase::Loaded => self.store.current(),
            _ => None,
        }
    }

    pub fn cursor(&self) -> usize {
        self.store.cursor()
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    pub fn decision(&self, card_id: &Uuid) -> Option<&VoteDecision> {
        self.decisions.get(card_id)
    }

    pub fn vote_state(&self, card_id: &Uuid) -> VoteState {
        self.decisions
            .get(card_id)
            .map(|d| d.state)
            .unwrap_or_default()
    }

    pub fn leaving(&self) -> Option<SwipeDirection> {
        self.leaving
    }

    pub fn transient_error(&self) -> Option<&str> {
        self.transient_error.as_ref().map(|e| e.message.as_str())
    }

    pub fn sign_in_required(&self) -> bool {
        self.sign_in_required
    }

    pub fn has_pending_votes(&self) -> bool {
        self.decisions
            .values()
            .any(|d| d.state == VoteState::Pending)
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let current = self.current().cloned();
        let current_vote = current
            .as_ref()
            .and_then(|card| self.decisions.get(&card.id))
            .cloned();
        FeedSnapshot {
            status: self.status(),
            position: self.store.cursor(),
            total: self.store.len(),
            current,
            current_vote,
            leaving: self.leaving,
            transient_error: self.transient_error().map(str::to_string),
            sign_in_required: self.sign_in_required,
        }
    }

    /// The card an input would act on.
    fn target(&self) -> Result<Uuid, IgnoreReason> {
        self.current()
            .map(|card| card.id)
            .ok_or(IgnoreReason::NoCurrentCard)
    }
}

/// Render-ready view of [`FeedState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedSnapshot {
    #[serde(flatten)]
    pub status: FeedStatus,
    pub position: usize,
    pub total: usize,
    pub current: Option<CaptionCard>,
    pub current_vote: Option<VoteDecision>,
    pub leaving: Option<SwipeDirection>,
    pub transient_error: Option<String>,
    pub sign_in_required: bool,
}

/// Drives a feed session: optimistic votes, fixed-delay advance, and reconciliation of
/// vote responses that arrive whenever the network allows.
///
/// Inputs are synchronous; network work runs on spawned tasks. Every state change goes
/// through the watch channel, and each spawned task carries the session generation it
/// was started in so results from an older session are dropped.
#[derive(Clone)]
pub struct FeedAdvancementEngine {
    auth: Arc<dyn AuthTokenProvider>,
    votes: Arc<dyn VoteApi>,
    source: Arc<dyn FeedSource>,
    config: FeedConfig,
    state: Arc<watch::Sender<FeedState>>,
}

impl FeedAdvancementEngine {
    pub fn new(
        auth: Arc<dyn AuthTokenProvider>,
        votes: Arc<dyn VoteApi>,
        source: Arc<dyn FeedSource>,
        config: FeedConfig,
    ) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            auth,
            votes,
            source,
            config,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.state.borrow().snapshot()
    }

    pub fn status(&self) -> FeedStatus {
        self.state.borrow().status()
    }

    pub fn cursor(&self) -> usize {
        self.state.borrow().cursor()
    }

    pub fn current(&self) -> Option<CaptionCard> {
        self.state.borrow().current().cloned()
    }

    pub fn vote_state(&self, card_id: &Uuid) -> VoteState {
        self.state.borrow().vote_state(card_id)
    }

    pub fn decision(&self, card_id: &Uuid) -> Option<VoteDecision> {
        self.state.borrow().decision(card_id).cloned()
    }

    /// Start a new session, discarding the previous one and anything still in flight
    /// for it. Returns the number of qualifying cards.
    pub async fn load_session(&self) -> Result<usize, FeedError> {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = state.generation + 1;
            *state = FeedState {
                generation,
                phase: Phase::Loading,
                ..FeedState::default()
            };
        });
        tracing::debug!(generation, "Loading feed session");

        match self.source.fetch_cards().await {
            Ok(candidates) => {
                let fetched = candidates.len();
                let store = FeedStore::from_candidates(candidates);
                let qualified = store.len();
                let applied = self.state.send_if_modified(|state| {
                    if state.generation != generation {
                        return false;
                    }
                    state.store = store;
                    state.phase = Phase::Loaded;
                    true
                });
                if applied {
                    tracing::info!(fetched, qualified, "Feed session loaded");
                } else {
                    tracing::debug!(generation, "Superseded feed load discarded");
                }
                Ok(qualified)
            }
            Err(err) => {
                log_failure(&err, "Feed load failed");
                let message = err.client_message();
                self.state.send_if_modified(|state| {
                    if state.generation != generation {
                        return false;
                    }
                    state.phase = Phase::Failed(message);
                    true
                });
                Err(err)
            }
        }
    }

    /// Record a vote on the current card and schedule the advance.
    ///
    /// The vote is marked pending before this returns; the request itself runs in the
    /// background and never delays the advance.
    pub fn decide(&self, value: VoteValue) -> Action {
        let mut action = Action::Ignored(IgnoreReason::NoCurrentCard);
        let mut scheduled = None;
        self.state.send_if_modified(|state| {
            let card_id = match state.target() {
                Ok(id) => id,
                Err(reason) => {
                    action = Action::Ignored(reason);
                    return false;
                }
            };
            let reason = match state.vote_state(&card_id) {
                VoteState::Pending => Some(IgnoreReason::VotePending),
                VoteState::Committed => Some(IgnoreReason::AlreadyDecided),
                VoteState::None if state.leaving.is_some() => Some(IgnoreReason::Advancing),
                VoteState::None if state.sign_in_required => Some(IgnoreReason::SignInRequired),
                VoteState::None => None,
            };
            if let Some(reason) = reason {
                action = Action::Ignored(reason);
                return false;
            }

            state
                .decisions
                .insert(card_id, VoteDecision::pending(card_id, value));
            state.leaving = Some(value.direction());
            scheduled = Some((state.generation, state.store.cursor()));
            action = Action::Voted { card_id, value };
            true
        });

        if let (Some((generation, cursor)), Action::Voted { card_id, .. }) = (scheduled, action)
        {
            tracing::debug!(%card_id, value = %value, "Vote recorded as pending");
            self.spawn_vote(generation, card_id, value);
            self.schedule_advance(generation, cursor);
        } else {
            tracing::debug!(?action, "Decision ignored");
        }
        action
    }

    /// Pass the current card without voting.
    pub fn skip(&self) -> Action {
        let mut action = Action::Ignored(IgnoreReason::NoCurrentCard);
        let mut scheduled = None;
        self.state.send_if_modified(|state| {
            let card_id = match state.target() {
                Ok(id) => id,
                Err(reason) => {
                    action = Action::Ignored(reason);
                    return false;
                }
            };
            if state.leaving.is_some() {
                action = Action::Ignored(IgnoreReason::Advancing);
                return false;
            }
            state.leaving = Some(SwipeDirection::Down);
            scheduled = Some((state.generation, state.store.cursor()));
            action = Action::Skipped { card_id };
            true
        });

        match scheduled {
            Some((generation, cursor)) => {
                tracing::debug!(?action, "Card skipped");
                self.schedule_advance(generation, cursor);
            }
            None => tracing::debug!(?action, "Skip ignored"),
        }
        action
    }

    /// Keyboard and swipe input share this entry point.
    pub fn handle_key(&self, direction: SwipeDirection) -> Action {
        match direction {
            SwipeDirection::Left => self.decide(VoteValue::Reject),
            SwipeDirection::Right => self.decide(VoteValue::Approve),
            SwipeDirection::Down => self.skip(),
        }
    }

    /// Wait until no vote is pending and no card is leaving.
    pub async fn settle(&self) {
        let mut rx = self.subscribe();
        let _ = rx
            .wait_for(|state| !state.has_pending_votes() && state.leaving.is_none())
            .await;
    }

    fn schedule_advance(&self, generation: u64, cursor: usize) {
        let delay = self.config.advance_delay;
        if delay.is_zero() {
            self.finish_advance(generation, cursor);
            return;
        }
        let engine = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.finish_advance(generation, cursor);
        });
    }

    /// Move past the card at `cursor`, if it is still the one on screen.
    fn finish_advance(&self, generation: u64, cursor: usize) {
        let moved = self.state.send_if_modified(|state| {
            if state.generation != generation || state.store.cursor() != cursor {
                return false;
            }
            state.leaving = None;
            state.store.advance()
        });
        if moved {
            tracing::debug!(from = cursor, "Feed advanced");
        }
    }

    fn spawn_vote(&self, generation: u64, card_id: Uuid, value: VoteValue) {
        let engine = self.clone();
        tokio::spawn(async move {
            let outcome = match engine.auth.access_token().await {
                Some(token) => engine
                    .votes
                    .submit_vote(&token, card_id, value)
                    .await
                    .map_err(|e| e.classify(&engine.config.conflict_markers)),
                None => Err(VoteError::AuthRequired),
            };
            engine.reconcile(generation, card_id, outcome);
        });
    }

    /// Apply a vote response to the decision it belongs to.
    fn reconcile(&self, generation: u64, card_id: Uuid, outcome: Result<(), VoteError>) {
        let mut clear_after = None;
        let applied = self.state.send_if_modified(|state| {
            if state.generation != generation || state.vote_state(&card_id) != VoteState::Pending {
                return false;
            }
            let resolution = match &outcome {
                Ok(()) => Some(VoteResolution::Accepted),
                Err(VoteError::Conflict { .. }) => Some(VoteResolution::AlreadyRecorded),
                Err(_) => None,
            };
            match (resolution, &outcome) {
                (Some(resolution), _) => {
                    if let Some(decision) = state.decisions.get_mut(&card_id) {
                        decision.commit(resolution);
                    }
                }
                (None, Err(VoteError::AuthRequired)) => {
                    state.decisions.remove(&card_id);
                    state.sign_in_required = true;
                }
                (None, Err(err)) => {
                    state.decisions.remove(&card_id);
                    state.error_seq += 1;
                    state.transient_error = Some(TransientError {
                        seq: state.error_seq,
                        message: err.client_message(),
                    });
                    clear_after = Some(state.error_seq);
                }
                (None, Ok(())) => {}
            }
            true
        });

        if !applied {
            tracing::debug!(%card_id, "Stale vote response discarded");
            return;
        }
        match &outcome {
            Ok(()) => tracing::info!(%card_id, "Vote saved"),
            Err(err) => log_failure(err, "Vote not saved"),
        }
        if let Some(seq) = clear_after {
            self.schedule_error_clear(seq);
        }
    }

    fn schedule_error_clear(&self, seq: u64) {
        let engine = self.clone();
        let delay = self.config.error_clear_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.state.send_if_modified(|state| {
                if state.transient_error.as_ref().map(|e| e.seq) != Some(seq) {
                    return false;
                }
                state.transient_error = None;
                true
            });
        });
    }
}
