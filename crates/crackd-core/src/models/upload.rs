use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::caption::Caption;

/// Progress of one upload attempt.
///
/// The forward path is `Idle → Uploading → Registering → Generating → Done`. `Error` can be
/// entered from any in-flight stage, and from `Idle` when no credential is available.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    #[default]
    Idle,
    Uploading,
    Registering,
    Generating,
    Done,
    Error,
}

impl UploadStage {
    /// Progress text for the stage, if the stage shows one.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            UploadStage::Idle | UploadStage::Error => None,
            UploadStage::Uploading => Some("Uploading image…"),
            UploadStage::Registering => Some("Registering with pipeline…"),
            UploadStage::Generating => Some("Generating captions…"),
            UploadStage::Done => Some("Done!"),
        }
    }

    /// A network call belonging to this attempt may be outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            UploadStage::Uploading | UploadStage::Registering | UploadStage::Generating
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStage::Done | UploadStage::Error)
    }

    /// Stages from which `submit` starts a new attempt.
    pub fn accepts_submit(&self) -> bool {
        matches!(self, UploadStage::Idle | UploadStage::Error)
    }

    pub fn can_transition_to(&self, next: UploadStage) -> bool {
        use UploadStage::*;
        matches!(
            (self, next),
            (Idle, Uploading)
                | (Uploading, Registering)
                | (Registering, Generating)
                | (Generating, Done)
                | (Idle | Uploading | Registering | Generating, Error)
                | (Idle | Done | Error, Idle)
        )
    }
}

impl Display for UploadStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStage::Idle => write!(f, "idle"),
            UploadStage::Uploading => write!(f, "uploading"),
            UploadStage::Registering => write!(f, "registering"),
            UploadStage::Generating => write!(f, "generating"),
            UploadStage::Done => write!(f, "done"),
            UploadStage::Error => write!(f, "error"),
        }
    }
}

impl FromStr for UploadStage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(UploadStage::Idle),
            "uploading" => Ok(UploadStage::Uploading),
            "registering" => Ok(UploadStage::Registering),
            "generating" => Ok(UploadStage::Generating),
            "done" => Ok(UploadStage::Done),
            "error" => Ok(UploadStage::Error),
            _ => Err(anyhow::anyhow!("Invalid upload stage: {}", s)),
        }
    }
}

/// Image picked by the user, held in memory until the attempt finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            size: self.size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileSummary {
    pub name: String,
    pub content_type: String,
    pub size: usize,
}

/// Write target returned by the presign step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresignedTarget {
    /// Pre-authorized URL accepting a raw PUT of the file bytes
    #[serde(rename = "presignedUrl")]
    pub upload_url: String,
    /// Public URL the file is served from once uploaded
    #[serde(rename = "cdnUrl")]
    pub cdn_url: String,
}

/// Opaque identifier the pipeline assigns to a registered image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ImageId(pub String);

impl Display for ImageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// State of the current upload attempt, as owned by the upload controller.
#[derive(Debug, Clone, Default)]
pub struct UploadTask {
    pub file: Option<SelectedFile>,
    pub stage: UploadStage,
    pub presigned_target: Option<PresignedTarget>,
    pub image_id: Option<ImageId>,
    pub captions: Vec<Caption>,
    pub error_message: Option<String>,
}

impl UploadTask {
    /// Clear everything derived from a previous attempt, keeping the selected file.
    pub fn reset_derived(&mut self) {
        self.stage = UploadStage::Idle;
        self.presigned_target = None;
        self.image_id = None;
        self.captions.clear();
        self.error_message = None;
    }

    pub fn is_busy(&self) -> bool {
        self.stage.is_busy()
    }

    pub fn label(&self) -> Option<&'static str> {
        self.stage.label()
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        UploadSnapshot {
            stage: self.stage,
            label: self.stage.label(),
            is_busy: self.stage.is_busy(),
            file: self.file.as_ref().map(SelectedFile::summary),
            presigned_target: self.presigned_target.clone(),
            image_id: self.image_id.clone(),
            captions: self.captions.clone(),
            error_message: self.error_message.clone(),
        }
    }
}

/// Render-ready view of an [`UploadTask`], without the file bytes.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadSnapshot {
    pub stage: UploadStage,
    pub label: Option<&'static str>,
    pub is_busy: bool,
    pub file: Option<FileSummary>,
    pub presigned_target: Option<PresignedTarget>,
    pub image_id: Option<ImageId>,
    pub captions: Vec<Caption>,
    pub error_message: Option<String>,
}
