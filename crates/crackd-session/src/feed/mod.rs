//! Feed advancement engine
//!
//! Cards are shown one at a time. A decision marks the vote pending, fires it in the
//! background, and advances the cursor after a short delay whatever the network does.

mod engine;
mod store;

pub use engine::{Action, FeedAdvancementEngine, FeedSnapshot, FeedState, IgnoreReason};
pub use store::FeedStore;
