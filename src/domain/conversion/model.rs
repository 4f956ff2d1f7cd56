use crate::domain::tts::LanguageCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Progress once text has been extracted
pub const PROGRESS_EXTRACTED: u8 = 30;
/// Progress once chunks are ready for dispatch; synthesis starts here
pub const PROGRESS_CHUNKED: u8 = 40;
/// Progress when every synthesis batch has finished
pub const PROGRESS_SYNTHESIZED: u8 = 90;
/// Progress after assembly, before cleanup
pub const PROGRESS_ASSEMBLED: u8 = 95;
pub const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Processing,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Processing)
    }
}

/// One document-to-audio conversion
#[derive(Debug, Clone)]
pub struct Task {
    pub id: Uuid,
    pub file_name: String,
    pub file_size: u64,
    pub status: TaskStatus,
    pub progress: u8,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub language: Option<LanguageCode>,
    /// Extracted text, dropped after the first completed status read
    pub text: Option<String>,
    pub text_delivered: bool,
    pub chunk_count: Option<usize>,
    pub audio_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl Task {
    pub fn new(id: Uuid, file_name: impl Into<String>, file_size: u64) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            file_size,
            status: TaskStatus::Processing,
            progress: 0,
            started_at: Utc::now(),
            completed_at: None,
            language: None,
            text: None,
            text_delivered: false,
            chunk_count: None,
            audio_path: None,
            error: None,
        }
    }

    /// Seconds since submission, frozen at completion time
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        let end = self.completed_at.unwrap_or(now);
        (end - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// Linear estimate of the seconds left, only while processing
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<f64> {
        if self.status != TaskStatus::Processing {
            return None;
        }
        estimate_remaining_secs(self.elapsed_secs(now), self.progress)
    }

    /// True when the task reached a terminal state before `cutoff`
    pub fn finished_before(&self, cutoff: DateTime<Utc>) -> bool {
        self.status.is_terminal() && self.completed_at.is_some_and(|done| done < cutoff)
    }
}

/// `elapsed / progress * (100 - progress)`; no estimate before any progress.
pub fn estimate_remaining_secs(elapsed_secs: f64, progress: u8) -> Option<f64> {
    if progress == 0 || progress >= PROGRESS_DONE {
        return None;
    }
    let progress = f64::from(progress);
    Some(elapsed_secs / progress * (100.0 - progress))
}

/// Map `done` of `total` steps into the `[start, end]` progress range.
pub fn scale_progress(start: u8, end: u8, done: usize, total: usize) -> u8 {
    if total == 0 || done >= total {
        return end;
    }
    let span = f64::from(end.saturating_sub(start));
    start + (span * done as f64 / total as f64).floor() as u8
}
