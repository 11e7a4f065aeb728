//! In-memory collaborators for controller tests.
//!
//! These mocks let the controllers run without any network. Each one records the calls
//! it receives so tests can assert on ordering and on what was never called.

use async_trait::async_trait;
use bytes::Bytes;
use crackd_core::models::{
    normalize_captions, CandidateCard, Caption, ImageId, PresignedTarget, UploadStage, UploadTask,
    VoteValue,
};
use crackd_core::{FeedError, FeedSource, PipelineApi, PipelineError, PipelineStep, VoteApi, VoteError};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use uuid::Uuid;

/// Pipeline mock that records, for every call, the stage the controller had published
/// at the moment the call started.
pub struct MockPipeline {
    calls: Mutex<Vec<(PipelineStep, Option<UploadStage>)>>,
    observer: Mutex<Option<watch::Receiver<UploadTask>>>,
    failures: Mutex<Vec<PipelineError>>,
    generate_response: Mutex<Value>,
    presign_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockPipeline {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            observer: Mutex::new(None),
            failures: Mutex::new(Vec::new()),
            generate_response: Mutex::new(json!([
                {"id": "c1", "content": "first caption"},
                {"id": "c2", "content": "second caption"}
            ])),
            presign_gate: Mutex::new(None),
        }
    }

    pub fn observe(&self, receiver: watch::Receiver<UploadTask>) {
        *self.observer.lock().unwrap() = Some(receiver);
    }

    /// Fail the next call to `step` with `status`. Each queued failure is used once.
    pub fn fail_once(&self, step: PipelineStep, status: u16) {
        self.failures.lock().unwrap().push(PipelineError::Step {
            step,
            status,
            body: None,
        });
    }

    pub fn fail_transport_once(&self, step: PipelineStep, message: &str) {
        self.failures.lock().unwrap().push(PipelineError::Transport {
            step,
            message: message.to_string(),
        });
    }

    pub fn set_generate_response(&self, value: Value) {
        *self.generate_response.lock().unwrap() = value;
    }

    /// Make presign wait until the returned handle is notified.
    pub fn hold_presign(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.presign_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<(PipelineStep, Option<UploadStage>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn steps(&self) -> Vec<PipelineStep> {
        self.calls().into_iter().map(|(step, _)| step).collect()
    }

    fn record(&self, step: PipelineStep) -> Result<(), PipelineError> {
        let observed = self
            .observer
            .lock()
            .unwrap()
            .as_ref()
            .map(|rx| rx.borrow().stage);
        self.calls.lock().unwrap().push((step, observed));

        let mut failures = self.failures.lock().unwrap();
        match failures.iter().position(|f| f.step() == Some(step)) {
            Some(index) => Err(failures.remove(index)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PipelineApi for MockPipeline {
    async fn presign(
        &self,
        _token: &str,
        content_type: &str,
    ) -> Result<PresignedTarget, PipelineError> {
        let gate = self.presign_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.record(PipelineStep::Presign)?;
        let n = self.steps().len();
        Ok(PresignedTarget {
            upload_url: format!("https://s3.test/put/{}?type={}", n, content_type),
            cdn_url: format!("https://cdn.test/{}.png", n),
        })
    }

    async fn upload_bytes(
        &self,
        _target: &PresignedTarget,
        _content_type: &str,
        _data: Bytes,
    ) -> Result<(), PipelineError> {
        self.record(PipelineStep::Upload)
    }

    async fn register(&self, _token: &str, _image_url: &str) -> Result<ImageId, PipelineError> {
        self.record(PipelineStep::Register)?;
        Ok(ImageId("img-1".to_string()))
    }

    async fn generate(
        &self,
        _token: &str,
        _image_id: &ImageId,
    ) -> Result<Vec<Caption>, PipelineError> {
        self.record(PipelineStep::Generate)?;
        Ok(normalize_captions(self.generate_response.lock().unwrap().clone()))
    }
}

/// Vote mock with scripted outcomes and an optional network latency.
pub struct MockVoteApi {
    calls: Mutex<Vec<(Uuid, VoteValue)>>,
    responses: Mutex<VecDeque<Result<(), VoteError>>>,
    latency: Duration,
}

impl MockVoteApi {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            latency,
        }
    }

    /// Queue the outcome of the next vote. Unscripted votes succeed.
    pub fn respond(&self, outcome: Result<(), VoteError>) {
        self.responses.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> Vec<(Uuid, VoteValue)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoteApi for MockVoteApi {
    async fn submit_vote(
        &self,
        _token: &str,
        card_id: Uuid,
        value: VoteValue,
    ) -> Result<(), VoteError> {
        self.calls.lock().unwrap().push((card_id, value));
        let outcome = self.responses.lock().unwrap().pop_front().unwrap_or(Ok(()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        outcome
    }
}

/// Feed source returning a fixed batch (or a fixed failure).
pub struct MockFeedSource {
    result: Mutex<Result<Vec<CandidateCard>, FeedError>>,
}

impl MockFeedSource {
    pub fn with_cards(cards: Vec<CandidateCard>) -> Self {
        Self {
            result: Mutex::new(Ok(cards)),
        }
    }

    pub fn failing(error: FeedError) -> Self {
        Self {
            result: Mutex::new(Err(error)),
        }
    }

    pub fn set_cards(&self, cards: Vec<CandidateCard>) {
        *self.result.lock().unwrap() = Ok(cards);
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    async fn fetch_cards(&self) -> Result<Vec<CandidateCard>, FeedError> {
        self.result.lock().unwrap().clone()
    }
}

/// A qualifying candidate with the given text.
pub fn card(content: &str) -> CandidateCard {
    CandidateCard {
        id: Uuid::new_v4(),
        content: Some(content.to_string()),
        image_url: Some(format!("https://cdn.test/{}.png", content.replace(' ', "-"))),
        created_at: None,
    }
}

/// A candidate whose image could not be resolved.
pub fn card_without_image(content: &str) -> CandidateCard {
    CandidateCard {
        image_url: None,
        ..card(content)
    }
}
