//! Caption pipeline endpoints.
//!
//! Each call is tagged with its [`PipelineStep`] so a failure always says which phase of
//! the upload broke.

use async_trait::async_trait;
use bytes::Bytes;
use crackd_core::models::{normalize_captions, Caption, ImageId, PresignedTarget};
use crackd_core::{PipelineApi, PipelineError, PipelineStep};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error_text, ApiClient};

const PRESIGN_PATH: &str = "/pipeline/generate-presigned-url";
const REGISTER_PATH: &str = "/pipeline/upload-image-from-url";
const GENERATE_PATH: &str = "/pipeline/generate-captions";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest<'a> {
    pub content_type: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub image_url: &'a str,
    pub is_common_use: bool,
}

/// The image id may arrive as a string or a number.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(default)]
    pub image_id: Value,
}

impl RegisterResponse {
    fn into_image_id(self) -> Option<ImageId> {
        match self.image_id {
            Value::String(s) if !s.is_empty() => Some(ImageId(s)),
            Value::Number(n) => Some(ImageId(n.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest<'a> {
    pub image_id: &'a str,
}

impl ApiClient {
    /// POST a JSON body to a pipeline endpoint and decode the JSON answer.
    async fn post_step<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        step: PipelineStep,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T, PipelineError> {
        let url = self.pipeline_url(path);
        let request = Self::apply_bearer(self.client.post(&url).json(body), token);

        tracing::debug!(step = %step, url = %url, "Calling pipeline");

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::Transport {
                step,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = error_text(response).await;
            tracing::warn!(step = %step, status = status.as_u16(), body = %body, "Pipeline step failed");
            return Err(PipelineError::Step {
                step,
                status: status.as_u16(),
                body: Some(body),
            });
        }

        response.json::<T>().await.map_err(|e| PipelineError::Decode {
            step,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl PipelineApi for ApiClient {
    async fn presign(
        &self,
        token: &str,
        content_type: &str,
    ) -> Result<PresignedTarget, PipelineError> {
        self.post_step(
            PipelineStep::Presign,
            PRESIGN_PATH,
            token,
            &PresignRequest { content_type },
        )
        .await
    }

    async fn upload_bytes(
        &self,
        target: &PresignedTarget,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), PipelineError> {
        let step = PipelineStep::Upload;
        let size = data.len();

        let response = self
            .client
            .put(&target.upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| PipelineError::Transport {
                step,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = error_text(response).await;
            tracing::warn!(status = status.as_u16(), body = %body, "Raw upload rejected");
            return Err(PipelineError::Step {
                step,
                status: status.as_u16(),
                body: Some(body),
            });
        }

        tracing::debug!(bytes = size, "Raw upload accepted");
        Ok(())
    }

    async fn register(&self, token: &str, image_url: &str) -> Result<ImageId, PipelineError> {
        let step = PipelineStep::Register;
        let response: RegisterResponse = self
            .post_step(
                step,
                REGISTER_PATH,
                token,
                &RegisterRequest {
                    image_url,
                    is_common_use: false,
                },
            )
            .await?;

        response.into_image_id().ok_or_else(|| PipelineError::Decode {
            step,
            message: "response has no imageId".to_string(),
        })
    }

    async fn generate(
        &self,
        token: &str,
        image_id: &ImageId,
    ) -> Result<Vec<Caption>, PipelineError> {
        let value: Value = self
            .post_step(
                PipelineStep::Generate,
                GENERATE_PATH,
                token,
                &GenerateRequest {
                    image_id: &image_id.0,
                },
            )
            .await?;

        Ok(normalize_captions(value))
    }
}
