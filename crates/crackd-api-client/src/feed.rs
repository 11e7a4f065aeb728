//! Caption feed read from the caption store's REST interface.
//!
//! Captions are joined with their image, restricted to rows with text and an image, and
//! ordered newest first by the store. Qualification is repeated by the feed engine.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use crackd_core::models::CandidateCard;
use crackd_core::{FeedError, FeedSource};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error_text, ApiClient};

const CAPTIONS_PATH: &str = "/rest/v1/captions";

/// Query parameters of the feed read.
const FEED_QUERY: [(&str, &str); 4] = [
    ("select", "id,content,created_datetime_utc,images!inner(url)"),
    ("content", "not.is.null"),
    ("images.url", "not.is.null"),
    ("order", "created_datetime_utc.desc"),
];

/// One caption row with its embedded image.
#[derive(Debug, Deserialize)]
pub struct FeedRow {
    pub id: Uuid,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created_datetime_utc: Option<String>,
    #[serde(default)]
    pub images: Option<ImageEmbed>,
}

/// The embedded image comes back as an object or, for to-many joins, a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ImageEmbed {
    One(ImageRef),
    Many(Vec<ImageRef>),
}

#[derive(Debug, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub url: Option<String>,
}

impl ImageEmbed {
    fn url(self) -> Option<String> {
        match self {
            ImageEmbed::One(image) => image.url,
            ImageEmbed::Many(images) => images.into_iter().find_map(|i| i.url),
        }
    }
}

impl FeedRow {
    pub fn into_candidate(self) -> CandidateCard {
        CandidateCard {
            id: self.id,
            content: self.content,
            image_url: self.images.and_then(ImageEmbed::url),
            created_at: self.created_datetime_utc.as_deref().and_then(parse_timestamp),
        }
    }
}

/// Accepts RFC 3339 timestamps and zone-less timestamps (read as UTC).
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[async_trait]
impl FeedSource for ApiClient {
    async fn fetch_cards(&self) -> Result<Vec<CandidateCard>, FeedError> {
        let endpoint = self.feed_endpoint().ok_or_else(|| {
            FeedError::NotConfigured("set CRACKD_FEED_URL and CRACKD_FEED_API_KEY".to_string())
        })?;

        let url = format!("{}{}", endpoint.url, CAPTIONS_PATH);
        let request = Self::apply_bearer(
            self.client
                .get(&url)
                .header("apikey", endpoint.api_key.as_str())
                .query(&FEED_QUERY),
            &endpoint.api_key,
        );

        let response = request.send().await.map_err(|e| FeedError::Load {
            status: None,
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Load {
                status: Some(status.as_u16()),
                message: error_text(response).await,
            });
        }

        let rows: Vec<FeedRow> = response.json().await.map_err(|e| FeedError::Load {
            status: None,
            message: format!("unreadable feed response: {}", e),
        })?;

        tracing::debug!(rows = rows.len(), "Fetched feed rows");
        Ok(rows.into_iter().map(FeedRow::into_candidate).collect())
    }
}
