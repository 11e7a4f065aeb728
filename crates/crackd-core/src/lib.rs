//! crackd Core Library
//!
//! This crate provides the domain models, error types, configuration and collaborator
//! traits shared by the HTTP client, the session controllers and the CLI.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types
pub use auth::{AuthTokenProvider, SessionToken};
pub use config::{ClientConfig, ConflictMarkers, FeedConfig, UploadConfig};
pub use error::{
    ErrorMetadata, FeedError, LogLevel, PipelineError, PipelineStep, ValidationError, VoteError,
};
pub use traits::{FeedSource, PipelineApi, VoteApi};
