use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

/// A caption that qualifies for the feed: it has display text and an image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptionCard {
    pub id: Uuid,
    pub content: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A caption as returned by the feed source, before qualification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateCard {
    pub id: Uuid,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl CandidateCard {
    /// `None` when the content is blank or the image cannot be resolved.
    pub fn qualify(self) -> Option<CaptionCard> {
        let content = self.content.filter(|c| !c.trim().is_empty())?;
        let image_url = self.image_url.filter(|u| !u.trim().is_empty())?;
        Some(CaptionCard {
            id: self.id,
            content,
            image_url,
            created_at: self.created_at,
        })
    }
}

/// Observable state of a feed session.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedStatus {
    #[default]
    NotLoaded,
    Loading,
    Active,
    /// The session loaded but no card qualified
    Empty,
    /// Every card of the session has been passed
    Complete,
    Failed { message: String },
}

impl FeedStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FeedStatus::Empty | FeedStatus::Complete | FeedStatus::Failed { .. }
        )
    }
}

impl Display for FeedStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FeedStatus::NotLoaded => write!(f, "not_loaded"),
            FeedStatus::Loading => write!(f, "loading"),
            FeedStatus::Active => write!(f, "active"),
            FeedStatus::Empty => write!(f, "empty"),
            FeedStatus::Complete => write!(f, "complete"),
            FeedStatus::Failed { .. } => write!(f, "failed"),
        }
    }
}

/// Direction cue of a card leaving the screen; also the keyboard input that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    /// Reject
    Left,
    /// Approve
    Right,
    /// Skip
    Down,
}

impl SwipeDirection {
    /// Map a key name to a direction. Accepts browser key names, plain words and the
    /// vi-style letters.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "arrowleft" | "left" | "h" => Some(SwipeDirection::Left),
            "arrowright" | "right" | "l" => Some(SwipeDirection::Right),
            "arrowdown" | "down" | "j" => Some(SwipeDirection::Down),
            _ => None,
        }
    }
}

impl Display for SwipeDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SwipeDirection::Left => write!(f, "left"),
            SwipeDirection::Right => write!(f, "right"),
            SwipeDirection::Down => write!(f, "down"),
        }
    }
}
