//! Vote submission endpoint.

use async_trait::async_trait;
use crackd_core::models::VoteValue;
use crackd_core::{VoteApi, VoteError};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error_text, ApiClient};

const VOTE_PATH: &str = "/api/vote";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub card_id: Uuid,
    pub value: VoteValue,
}

#[derive(Debug, Deserialize)]
struct VoteErrorBody {
    error: Option<String>,
}

#[async_trait]
impl VoteApi for ApiClient {
    async fn submit_vote(
        &self,
        token: &str,
        card_id: Uuid,
        value: VoteValue,
    ) -> Result<(), VoteError> {
        let url = self.app_url(VOTE_PATH);
        let request = Self::apply_bearer(
            self.client.post(&url).json(&VoteRequest { card_id, value }),
            token,
        );

        let response = request
            .send()
            .await
            .map_err(|e| VoteError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(VoteError::AuthRequired);
        }
        if !status.is_success() {
            let text = error_text(response).await;
            let message = serde_json::from_str::<VoteErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(text);
            return Err(VoteError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(card_id = %card_id, value = %value, "Vote stored");
        Ok(())
    }
}
