use crackd_core::models::{SwipeDirection, VoteValue};
use crackd_session::FeedSnapshot;
use std::path::Path;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Guess an image content type from the file extension.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

/// Parse a vote argument: up/down, approve/reject, or 1/-1.
pub fn parse_vote(value: &str) -> anyhow::Result<VoteValue> {
    match value.trim().to_ascii_lowercase().as_str() {
        "up" | "approve" | "1" | "+1" => Ok(VoteValue::Approve),
        "down" | "reject" | "-1" => Ok(VoteValue::Reject),
        other => Err(anyhow::anyhow!(
            "Invalid vote: {} (expected up or down)",
            other
        )),
    }
}

/// One line typed during a feed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedInput {
    Swipe(SwipeDirection),
    Quit,
}

pub fn parse_feed_input(line: &str) -> Option<FeedInput> {
    match line.trim().to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => Some(FeedInput::Quit),
        key => SwipeDirection::from_key(key).map(FeedInput::Swipe),
    }
}

/// Text shown for the card on screen, or for the session outcome when there is none.
pub fn render_snapshot(snapshot: &FeedSnapshot) -> String {
    let mut out = match &snapshot.current {
        Some(card) => format!(
            "[{}/{}] {}\n    {}",
            snapshot.position + 1,
            snapshot.total,
            truncate_string(&card.content, 120),
            card.image_url
        ),
        None => format!("({})", snapshot.status),
    };
    if let Some(error) = &snapshot.transient_error {
        out.push_str(&format!("\n    ! {}", error));
    }
    if snapshot.sign_in_required {
        out.push_str("\n    ! Please log in to vote. Skipping still works.");
    }
    out
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
