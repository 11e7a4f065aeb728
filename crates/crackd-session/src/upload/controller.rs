use bytes::Bytes;
use crackd_core::models::{Caption, SelectedFile, UploadSnapshot, UploadStage, UploadTask};
use crackd_core::{
    AuthTokenProvider, ErrorMetadata, PipelineApi, PipelineError, UploadConfig, ValidationError,
};
use std::sync::Arc;
use tokio::sync::watch;

use crate::log_failure;

/// Outcome of a call to [`UploadPipelineController::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Nothing was started: no file is selected or an attempt is already running.
    Ignored,
    Completed(Vec<Caption>),
    Failed(PipelineError),
}

/// Owns the single upload attempt shown to the user.
///
/// State lives in a watch channel. Every guard and transition goes through
/// `send_if_modified`, so a check and the change it allows happen under the same lock.
#[derive(Clone)]
pub struct UploadPipelineController {
    auth: Arc<dyn AuthTokenProvider>,
    pipeline: Arc<dyn PipelineApi>,
    config: UploadConfig,
    state: Arc<watch::Sender<UploadTask>>,
}

impl UploadPipelineController {
    pub fn new(
        auth: Arc<dyn AuthTokenProvider>,
        pipeline: Arc<dyn PipelineApi>,
        config: UploadConfig,
    ) -> Self {
        let (state, _) = watch::channel(UploadTask::default());
        Self {
            auth,
            pipeline,
            config,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadTask> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        self.state.borrow().snapshot()
    }

    /// Full copy of the task, including the file bytes.
    pub fn task(&self) -> UploadTask {
        self.state.borrow().clone()
    }

    pub fn stage(&self) -> UploadStage {
        self.state.borrow().stage
    }

    /// Replace the selected file and clear the previous attempt.
    ///
    /// Refused while an attempt is in flight.
    pub fn select_file(&self, file: SelectedFile) -> Result<(), ValidationError> {
        if file.data.is_empty() {
            return Err(ValidationError::EmptyFile);
        }
        if !self.config.accepts(&file.content_type) {
            return Err(ValidationError::UnsupportedContentType(
                file.content_type.clone(),
            ));
        }

        let summary = file.summary();
        let mut busy = false;
        self.state.send_if_modified(|task| {
            if task.is_busy() {
                busy = true;
                return false;
            }
            task.reset_derived();
            task.file = Some(file);
            true
        });

        if busy {
            let err = ValidationError::Busy;
            log_failure(&err, "File selection refused");
            return Err(err);
        }

        tracing::info!(
            name = %summary.name,
            content_type = %summary.content_type,
            size = summary.size,
            "File selected"
        );
        Ok(())
    }

    /// Drop the file and any results. Returns false while an attempt is in flight.
    pub fn reset(&self) -> bool {
        let cleared = self.state.send_if_modified(|task| {
            if task.is_busy() {
                return false;
            }
            *task = UploadTask::default();
            true
        });
        if cleared {
            tracing::debug!("Upload task reset");
        }
        cleared
    }

    /// Run one attempt for the selected file.
    ///
    /// Only starts from `Idle` or `Error` with a file selected; any other call returns
    /// [`Submission::Ignored`] without touching state or the network.
    pub async fn submit(&self) -> Submission {
        if !self.accepts_submit() {
            tracing::debug!(stage = %self.stage(), "Submit ignored");
            return Submission::Ignored;
        }

        let token = self.auth.access_token().await;

        // Recheck and claim under the lock: another submit may have started while the
        // token was being resolved.
        let mut claimed: Option<SelectedFile> = None;
        self.state.send_if_modified(|task| {
            let Some(file) = task.file.clone() else {
                return false;
            };
            if !task.stage.accepts_submit() {
                return false;
            }
            task.reset_derived();
            let next = if token.is_some() {
                UploadStage::Uploading
            } else {
                UploadStage::Error
            };
            if !enter(task, next) {
                return false;
            }
            if token.is_none() {
                task.error_message = Some(PipelineError::AuthRequired.client_message());
            }
            claimed = Some(file);
            true
        });

        let Some(file) = claimed else {
            tracing::debug!("Submit ignored after recheck");
            return Submission::Ignored;
        };

        let Some(token) = token else {
            let err = PipelineError::AuthRequired;
            log_failure(&err, "Upload refused");
            return Submission::Failed(err);
        };

        match self.run_steps(&token, file).await {
            Ok(captions) => {
                let count = captions.len();
                let published = captions.clone();
                self.advance(UploadStage::Done, move |task| task.captions = published);
                tracing::info!(captions = count, "Upload pipeline finished");
                Submission::Completed(captions)
            }
            Err(err) => {
                log_failure(&err, "Upload pipeline failed");
                let message = err.client_message();
                self.advance(UploadStage::Error, move |task| {
                    task.error_message = Some(message)
                });
                Submission::Failed(err)
            }
        }
    }

    fn accepts_submit(&self) -> bool {
        let task = self.state.borrow();
        task.file.is_some() && task.stage.accepts_submit()
    }

    /// The four remote calls. `Uploading` is already published when this starts.
    async fn run_steps(
        &self,
        token: &str,
        file: SelectedFile,
    ) -> Result<Vec<Caption>, PipelineError> {
        let content_type = file.content_type.clone();
        let data: Bytes = file.data;

        let target = self.pipeline.presign(token, &content_type).await?;
        tracing::debug!(cdn_url = %target.cdn_url, "Presigned upload target issued");
        let recorded = target.clone();
        self.record(move |task| task.presigned_target = Some(recorded));

        self.pipeline
            .upload_bytes(&target, &content_type, data)
            .await?;

        self.advance(UploadStage::Registering, |_| {});
        let image_id = self.pipeline.register(token, &target.cdn_url).await?;
        tracing::debug!(image_id = %image_id, "Image registered");
        let recorded = image_id.clone();
        self.record(move |task| task.image_id = Some(recorded));

        self.advance(UploadStage::Generating, |_| {});
        self.pipeline.generate(token, &image_id).await
    }

    fn advance(&self, next: UploadStage, update: impl FnOnce(&mut UploadTask)) {
        self.state.send_if_modified(|task| {
            if !enter(task, next) {
                return false;
            }
            update(task);
            true
        });
    }

    fn record(&self, update: impl FnOnce(&mut UploadTask)) {
        self.state.send_modify(update);
    }
}

fn enter(task: &mut UploadTask, next: UploadStage) -> bool {
    if !task.stage.can_transition_to(next) {
        tracing::warn!(from = %task.stage, to = %next, "Refusing out-of-order stage change");
        return false;
    }
    tracing::debug!(from = %task.stage, to = %next, "Upload stage changed");
    task.stage = next;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockPipeline;
    use crackd_core::{PipelineStep, SessionToken};
    use serde_json::json;

    fn png() -> SelectedFile {
        SelectedFile::new("cat.png", "image/png", vec![0x89u8, b'P', b'N', b'G'])
    }

    fn setup(token: Option<&str>) -> (UploadPipelineController, Arc<MockPipeline>) {
        let pipeline = Arc::new(MockPipeline::new());
        let auth = Arc::new(SessionToken::new(token.map(str::to_string)));
        let controller =
            UploadPipelineController::new(auth, pipeline.clone(), UploadConfig::default());
        pipeline.observe(controller.subscribe());
        (controller, pipeline)
    }

    #[tokio::test]
    async fn stages_are_published_before_each_call() {
        let (controller, pipeline) = setup(Some("token"));
        controller.select_file(png()).unwrap();

        let outcome = controller.submit().await;

        assert!(matches!(outcome, Submission::Completed(ref c) if c.len() == 2));
        assert_eq!(
            pipeline.calls(),
            vec![
                (PipelineStep::Presign, Some(UploadStage::Uploading)),
                (PipelineStep::Upload, Some(UploadStage::Uploading)),
                (PipelineStep::Register, Some(UploadStage::Registering)),
                (PipelineStep::Generate, Some(UploadStage::Generating)),
            ]
        );
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.label, Some("Done!"));
        assert!(!snapshot.is_busy);
        assert_eq!(snapshot.file.map(|f| f.name), Some("cat.png".to_string()));
        let task = controller.task();
        assert_eq!(task.stage, UploadStage::Done);
        assert_eq!(task.captions[0].text, "first caption");
        assert!(task.presigned_target.is_some());
        assert_eq!(task.image_id.map(|id| id.0), Some("img-1".to_string()));
        assert!(task.error_message.is_none());
    }

    #[tokio::test]
    async fn submit_without_file_is_ignored() {
        let (controller, pipeline) = setup(Some("token"));

        assert_eq!(controller.submit().await, Submission::Ignored);
        assert_eq!(controller.stage(), UploadStage::Idle);
        assert!(pipeline.calls().is_empty());
    }

    #[tokio::test]
    async fn signed_out_submit_fails_without_network() {
        let (controller, pipeline) = setup(None);
        controller.select_file(png()).unwrap();

        let outcome = controller.submit().await;

        assert_eq!(outcome, Submission::Failed(PipelineError::AuthRequired));
        let task = controller.task();
        assert_eq!(task.stage, UploadStage::Error);
        assert!(task.error_message.unwrap().contains("must be signed in"));
        assert!(pipeline.calls().is_empty());
    }

    #[tokio::test]
    async fn presign_failure_stops_the_attempt() {
        let (controller, pipeline) = setup(Some("token"));
        pipeline.fail_once(PipelineStep::Presign, 500);
        controller.select_file(png()).unwrap();

        let outcome = controller.submit().await;

        assert!(matches!(
            outcome,
            Submission::Failed(PipelineError::Step { status: 500, .. })
        ));
        assert_eq!(pipeline.steps(), vec![PipelineStep::Presign]);
        let task = controller.task();
        assert_eq!(task.stage, UploadStage::Error);
        assert_eq!(task.error_message.as_deref(), Some("Presign failed: 500"));
        assert!(task.captions.is_empty());
    }

    #[tokio::test]
    async fn register_failure_skips_generation() {
        let (controller, pipeline) = setup(Some("token"));
        pipeline.fail_once(PipelineStep::Register, 502);
        controller.select_file(png()).unwrap();

        controller.submit().await;

        assert_eq!(
            pipeline.steps(),
            vec![
                PipelineStep::Presign,
                PipelineStep::Upload,
                PipelineStep::Register
            ]
        );
        let task = controller.task();
        assert_eq!(task.error_message.as_deref(), Some("Register failed: 502"));
        assert!(task.image_id.is_none());
    }

    #[tokio::test]
    async fn transport_failure_during_upload_reports_step() {
        let (controller, pipeline) = setup(Some("token"));
        pipeline.fail_transport_once(PipelineStep::Upload, "connection reset");
        controller.select_file(png()).unwrap();

        controller.submit().await;

        let task = controller.task();
        assert_eq!(task.stage, UploadStage::Error);
        assert_eq!(
            task.error_message.as_deref(),
            Some("Upload failed: connection reset")
        );
    }

    #[tokio::test]
    async fn single_caption_object_becomes_one_caption() {
        let (controller, pipeline) = setup(Some("token"));
        pipeline.set_generate_response(json!({"id": "only", "content": "a lone caption"}));
        controller.select_file(png()).unwrap();

        let outcome = controller.submit().await;

        match outcome {
            Submission::Completed(captions) => {
                assert_eq!(captions.len(), 1);
                assert_eq!(captions[0].text, "a lone caption");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn resubmit_after_error_starts_over() {
        let (controller, pipeline) = setup(Some("token"));
        pipeline.fail_once(PipelineStep::Generate, 500);
        controller.select_file(png()).unwrap();

        controller.submit().await;
        assert_eq!(controller.stage(), UploadStage::Error);

        let outcome = controller.submit().await;

        assert!(matches!(outcome, Submission::Completed(_)));
        let presigns = pipeline
            .steps()
            .into_iter()
            .filter(|s| *s == PipelineStep::Presign)
            .count();
        assert_eq!(presigns, 2);
        let task = controller.task();
        assert_eq!(task.stage, UploadStage::Done);
        assert!(task.error_message.is_none());
    }

    #[tokio::test]
    async fn submit_after_done_is_ignored() {
        let (controller, pipeline) = setup(Some("token"));
        controller.select_file(png()).unwrap();
        controller.submit().await;

        assert_eq!(controller.submit().await, Submission::Ignored);
        assert_eq!(pipeline.steps().len(), 4);
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_ignored() {
        let (controller, pipeline) = setup(Some("token"));
        let gate = pipeline.hold_presign();
        controller.select_file(png()).unwrap();

        let running = controller.clone();
        let first = tokio::spawn(async move { running.submit().await });

        let mut rx = controller.subscribe();
        rx.wait_for(|task| task.stage == UploadStage::Uploading)
            .await
            .unwrap();

        assert_eq!(controller.submit().await, Submission::Ignored);
        assert_eq!(controller.select_file(png()), Err(ValidationError::Busy));
        assert!(!controller.reset());

        gate.notify_one();
        let outcome = first.await.unwrap();

        assert!(matches!(outcome, Submission::Completed(_)));
        assert_eq!(pipeline.steps().len(), 4);
    }

    #[tokio::test]
    async fn selecting_a_new_file_clears_previous_results() {
        let (controller, _pipeline) = setup(Some("token"));
        controller.select_file(png()).unwrap();
        controller.submit().await;

        controller
            .select_file(SelectedFile::new("dog.jpg", "image/jpeg", vec![1u8, 2]))
            .unwrap();

        let task = controller.task();
        assert_eq!(task.stage, UploadStage::Idle);
        assert!(task.captions.is_empty());
        assert!(task.presigned_target.is_none());
        assert_eq!(task.file.map(|f| f.name), Some("dog.jpg".to_string()));
    }

    #[tokio::test]
    async fn file_validation() {
        let (controller, _pipeline) = setup(Some("token"));

        assert_eq!(
            controller.select_file(SelectedFile::new("a.pdf", "application/pdf", vec![1u8])),
            Err(ValidationError::UnsupportedContentType(
                "application/pdf".to_string()
            ))
        );
        assert_eq!(
            controller.select_file(SelectedFile::new("a.png", "image/png", Vec::<u8>::new())),
            Err(ValidationError::EmptyFile)
        );
        assert!(controller.task().file.is_none());
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let (controller, _pipeline) = setup(Some("token"));
        controller.select_file(png()).unwrap();
        controller.submit().await;

        assert!(controller.reset());

        let task = controller.task();
        assert!(task.file.is_none());
        assert_eq!(task.stage, UploadStage::Idle);
    }
}
