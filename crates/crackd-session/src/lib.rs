//! Client-side state machines for crackd.
//!
//! - [`upload`]: the upload pipeline controller (presign → upload → register → generate).
//! - [`feed`]: the feed advancement engine (optimistic votes over an ordered card queue).
//!
//! Both controllers publish their state through a `tokio::sync::watch` channel. A UI
//! subscribes, renders snapshots, and forwards user input back as method calls.

pub mod feed;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use feed::{Action, FeedAdvancementEngine, FeedSnapshot, FeedState, FeedStore, IgnoreReason};
pub use upload::{Submission, UploadPipelineController};

use crackd_core::{ErrorMetadata, LogLevel};

/// Log a failure at the level the error asks for.
pub(crate) fn log_failure<E>(err: &E, context: &str)
where
    E: ErrorMetadata + std::fmt::Display,
{
    let code = err.error_code();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(error = %err, code, "{}", context),
        LogLevel::Warn => tracing::warn!(error = %err, code, "{}", context),
        LogLevel::Error => tracing::error!(error = %err, code, "{}", context),
    }
}
