//! Boundaries to the remote services.
//!
//! The controllers depend only on these traits. `crackd-api-client` implements them over
//! HTTP; tests implement them in memory.

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::error::{FeedError, PipelineError, VoteError};
use crate::models::{CandidateCard, Caption, ImageId, PresignedTarget, VoteValue};

/// The captioning pipeline: presign, raw upload, register, generate.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Request a write target for a file of the given content type.
    async fn presign(&self, token: &str, content_type: &str)
        -> Result<PresignedTarget, PipelineError>;

    /// Write the raw bytes to a presigned target. The target is pre-authorized, so no
    /// bearer credential is sent.
    async fn upload_bytes(
        &self,
        target: &PresignedTarget,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), PipelineError>;

    /// Register a publicly reachable image with the pipeline.
    async fn register(&self, token: &str, image_url: &str) -> Result<ImageId, PipelineError>;

    /// Generate captions for a registered image.
    async fn generate(&self, token: &str, image_id: &ImageId)
        -> Result<Vec<Caption>, PipelineError>;
}

/// The vote endpoint.
#[async_trait]
pub trait VoteApi: Send + Sync {
    /// Rejections are returned as [`VoteError::Rejected`] with the server's message;
    /// deciding whether a rejection is a conflict is left to the caller.
    async fn submit_vote(&self, token: &str, card_id: Uuid, value: VoteValue)
        -> Result<(), VoteError>;
}

/// Read side of the caption store.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// All candidate cards, newest first.
    async fn fetch_cards(&self) -> Result<Vec<CandidateCard>, FeedError>;
}
