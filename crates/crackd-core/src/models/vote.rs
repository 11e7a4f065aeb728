use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use super::feed::SwipeDirection;

/// A vote on a caption. Serialized as `1` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum VoteValue {
    Approve,
    Reject,
}

impl VoteValue {
    pub fn as_i8(&self) -> i8 {
        match self {
            VoteValue::Approve => 1,
            VoteValue::Reject => -1,
        }
    }

    pub fn direction(&self) -> SwipeDirection {
        match self {
            VoteValue::Approve => SwipeDirection::Right,
            VoteValue::Reject => SwipeDirection::Left,
        }
    }
}

impl From<VoteValue> for i8 {
    fn from(value: VoteValue) -> Self {
        value.as_i8()
    }
}

impl TryFrom<i8> for VoteValue {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteValue::Approve),
            -1 => Ok(VoteValue::Reject),
            other => Err(format!("Invalid vote value: {}", other)),
        }
    }
}

impl Display for VoteValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:+}", self.as_i8())
    }
}

/// Local lifecycle of a vote on one card.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteState {
    #[default]
    None,
    Pending,
    Committed,
}

/// How the server settled a committed vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteResolution {
    /// The vote was stored by this request
    Accepted,
    /// The store already held a vote for this card and voter
    AlreadyRecorded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteDecision {
    pub card_id: Uuid,
    pub value: VoteValue,
    pub state: VoteState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<VoteResolution>,
    pub decided_at: DateTime<Utc>,
}

impl VoteDecision {
    pub fn pending(card_id: Uuid, value: VoteValue) -> Self {
        Self {
            card_id,
            value,
            state: VoteState::Pending,
            resolution: None,
            decided_at: Utc::now(),
        }
    }

    pub fn commit(&mut self, resolution: VoteResolution) {
        self.state = VoteState::Committed;
        self.resolution = Some(resolution);
    }

    /// Committed decisions never change for the rest of the session.
    pub fn is_final(&self) -> bool {
        self.state == VoteState::Committed
    }
}
