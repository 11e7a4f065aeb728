//! Error types module
//!
//! Failures are grouped by the operation that produces them: the upload pipeline
//! (`PipelineError`), vote submission (`VoteError`), feed loading (`FeedError`) and file
//! selection (`ValidationError`). Every error knows how it should be presented to the
//! user through [`ErrorMetadata`].

use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::config::ConflictMarkers;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for user-facing error presentation
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "STEP_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether the user can recover by repeating the action
    fn is_recoverable(&self) -> bool;

    /// Human-readable message shown to the user
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// The remote calls that make up one upload attempt, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Presign,
    Upload,
    Register,
    Generate,
}

impl PipelineStep {
    /// Name used in user-facing failure messages.
    pub fn title(&self) -> &'static str {
        match self {
            PipelineStep::Presign => "Presign",
            PipelineStep::Upload => "Upload",
            PipelineStep::Register => "Register",
            PipelineStep::Generate => "Caption generation",
        }
    }
}

impl Display for PipelineStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PipelineStep::Presign => write!(f, "presign"),
            PipelineStep::Upload => write!(f, "upload"),
            PipelineStep::Register => write!(f, "register"),
            PipelineStep::Generate => write!(f, "generate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("You must be signed in to upload images.")]
    AuthRequired,

    #[error("{} failed: {status}", .step.title())]
    Step {
        step: PipelineStep,
        status: u16,
        body: Option<String>,
    },

    #[error("{} failed: {message}", .step.title())]
    Transport { step: PipelineStep, message: String },

    #[error("{} returned an unreadable response: {message}", .step.title())]
    Decode { step: PipelineStep, message: String },
}

impl PipelineError {
    /// The step that failed, if the failure happened after a network call was issued.
    pub fn step(&self) -> Option<PipelineStep> {
        match self {
            PipelineError::AuthRequired => None,
            PipelineError::Step { step, .. }
            | PipelineError::Transport { step, .. }
            | PipelineError::Decode { step, .. } => Some(*step),
        }
    }

    /// HTTP status of the failed call, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            PipelineError::Step { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl ErrorMetadata for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            PipelineError::AuthRequired => "AUTH_REQUIRED",
            PipelineError::Step { .. } => "STEP_FAILED",
            PipelineError::Transport { .. } => "TRANSPORT_ERROR",
            PipelineError::Decode { .. } => "DECODE_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Every pipeline failure ends the attempt; the user may resubmit.
        !matches!(self, PipelineError::AuthRequired)
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::AuthRequired => LogLevel::Debug,
            PipelineError::Step { status, .. } if *status < 500 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VoteError {
    #[error("Please log in to vote.")]
    AuthRequired,

    #[error("Vote already recorded")]
    Conflict { message: String },

    #[error("Error: {message}")]
    Rejected { status: u16, message: String },

    #[error("Error: {message}")]
    Transport { message: String },
}

impl VoteError {
    /// Reclassify a server rejection as a conflict when its message carries one of the
    /// uniqueness-violation markers.
    pub fn classify(self, markers: &ConflictMarkers) -> Self {
        match self {
            VoteError::Rejected { message, .. } if markers.matches(&message) => {
                VoteError::Conflict { message }
            }
            other => other,
        }
    }
}

impl ErrorMetadata for VoteError {
    fn error_code(&self) -> &'static str {
        match self {
            VoteError::AuthRequired => "AUTH_REQUIRED",
            VoteError::Conflict { .. } => "VOTE_CONFLICT",
            VoteError::Rejected { .. } => "VOTE_REJECTED",
            VoteError::Transport { .. } => "TRANSPORT_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, VoteError::Rejected { .. } | VoteError::Transport { .. })
    }

    fn client_message(&self) -> String {
        match self {
            // A conflict means the vote is already stored, which the user sees as success.
            VoteError::Conflict { .. } => "Saved!".to_string(),
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            VoteError::AuthRequired | VoteError::Conflict { .. } => LogLevel::Debug,
            VoteError::Rejected { .. } => LogLevel::Warn,
            VoteError::Transport { .. } => LogLevel::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedError {
    #[error("Failed to load captions: {message}")]
    Load {
        status: Option<u16>,
        message: String,
    },

    #[error("Feed source is not configured: {0}")]
    NotConfigured(String),
}

impl ErrorMetadata for FeedError {
    fn error_code(&self) -> &'static str {
        match self {
            FeedError::Load { .. } => "LOAD_FAILED",
            FeedError::NotConfigured(_) => "NOT_CONFIGURED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Error
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unsupported file type: {0}")]
    UnsupportedContentType(String),

    #[error("The selected file is empty")]
    EmptyFile,

    #[error("An upload is already in progress")]
    Busy,
}

impl ErrorMetadata for ValidationError {
    fn error_code(&self) -> &'static str {
        match self {
            ValidationError::UnsupportedContentType(_) => "UNSUPPORTED_CONTENT_TYPE",
            ValidationError::EmptyFile => "EMPTY_FILE",
            ValidationError::Busy => "BUSY",
        }
    }

    fn is_recoverable(&self) -> bool {
        true
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}
