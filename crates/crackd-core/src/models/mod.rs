pub mod caption;
pub mod feed;
pub mod upload;
pub mod vote;

pub use caption::{normalize_captions, Caption};
pub use feed::{CandidateCard, CaptionCard, FeedStatus, SwipeDirection};
pub use upload::{
    FileSummary, ImageId, PresignedTarget, SelectedFile, UploadSnapshot, UploadStage, UploadTask,
};
pub use vote::{VoteDecision, VoteResolution, VoteState, VoteValue};
