//! Upload pipeline controller
//!
//! Drives one image through presign, upload, register and caption generation, publishing
//! each stage before the call that belongs to it is issued.

mod controller;

pub use controller::{Submission, UploadPipelineController};
