pub mod assembler;
pub mod cache;
pub mod chunker;
pub mod error;
pub mod maintenance;
pub mod model;
pub mod registry;
pub mod service;
pub mod similarity;
pub mod synthesizer;

pub use cache::SynthesisCache;
pub use error::ConversionError;
pub use model::{Task, TaskStatus};
pub use registry::TaskRegistry;
pub use service::{ConversionService, ConversionServiceApi, ConversionSettings, DocumentUpload};
pub use synthesizer::{ParallelSynthesizer, SynthesizerSettings};

use crate::domain::tts::LanguageCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response for an accepted conversion
#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub status_url: String,
}

/// Response for task status polls
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub progress: u8,
    pub file_size: u64,
    /// Seconds since submission
    pub elapsed_time: f64,
    /// Estimated seconds left, only while processing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<LanguageCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskStatusResponse {
    /// Status fields derivable from the task alone; text and audio URL are
    /// filled in by the service for completed tasks.
    pub fn from_task(task: &Task, now: DateTime<Utc>) -> Self {
        Self {
            task_id: task.id,
            status: task.status,
            progress: task.progress,
            file_size: task.file_size,
            elapsed_time: round_secs(task.elapsed_secs(now)),
            remaining_time: task.remaining_secs(now).map(round_secs),
            language: task.language,
            chunks: task.chunk_count,
            text: None,
            audio_url: None,
            error: task.error.clone(),
        }
    }
}

fn round_secs(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}
