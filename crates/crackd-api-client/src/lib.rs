//! Shared HTTP client for the captioning services.
//!
//! One [`ApiClient`] talks to three places: the caption pipeline (presign, register,
//! generate), the application's vote endpoint, and the caption store's REST interface
//! for the feed. It implements the `crackd-core` collaborator traits so the session
//! controllers can drive it directly.

pub mod feed;
pub mod pipeline;
pub mod vote;

use anyhow::{Context, Result};
use crackd_core::ClientConfig;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// Connection details for the caption store's REST interface.
#[derive(Clone, Debug)]
pub struct FeedEndpoint {
    pub url: String,
    pub api_key: String,
}

/// HTTP client for the captioning services.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    pipeline_url: String,
    app_url: String,
    feed: Option<FeedEndpoint>,
}

impl ApiClient {
    pub fn new(pipeline_url: String, app_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            pipeline_url: pipeline_url.trim_end_matches('/').to_string(),
            app_url: app_url.trim_end_matches('/').to_string(),
            feed: None,
        })
    }

    /// Attach the caption store used by [`FeedSource`](crackd_core::FeedSource).
    pub fn with_feed(mut self, url: String, api_key: String) -> Self {
        self.feed = Some(FeedEndpoint {
            url: url.trim_end_matches('/').to_string(),
            api_key,
        });
        self
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = Self::new(
            config.pipeline_url.clone(),
            config.app_url.clone(),
            config.http_timeout,
        )?;

        Ok(match (&config.feed_url, &config.feed_api_key) {
            (Some(url), Some(key)) => client.with_feed(url.clone(), key.clone()),
            _ => client,
        })
    }

    pub fn pipeline_url(&self, path: &str) -> String {
        format!("{}{}", self.pipeline_url, path)
    }

    pub fn app_url(&self, path: &str) -> String {
        format!("{}{}", self.app_url, path)
    }

    pub fn feed_endpoint(&self) -> Option<&FeedEndpoint> {
        self.feed.as_ref()
    }

    fn apply_bearer(request: RequestBuilder, token: &str) -> RequestBuilder {
        request.header("Authorization", format!("Bearer {}", token))
    }

    /// Raw client for custom requests.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Body of a failed response, or a generic message when it cannot be read.
async fn error_text(response: Response) -> String {
    response
        .text()
        .await
        .ok()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Unknown error".to_string())
}

pub use feed::FeedRow;
pub use pipeline::{GenerateRequest, PresignRequest, RegisterRequest, RegisterResponse};
pub use vote::VoteRequest;
