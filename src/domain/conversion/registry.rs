use super::model::{Task, TaskStatus, PROGRESS_DONE};
use crate::domain::tts::LanguageCode;
use crate::infrastructure::storage::{remove_file_best_effort, StorageLayout};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// In-memory store of every live task.
///
/// Each operation takes the lock once and releases it before returning;
/// callers only ever see clones, never the live map. Only the pipeline
/// running a task writes to that task's entry.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: Task) {
        self.tasks.write().insert(task.id, task);
    }

    pub fn get(&self, id: Uuid) -> Option<Task> {
        self.tasks.read().get(&id).cloned()
    }

    /// Raise progress of a processing task. Lower values are ignored so
    /// progress never moves backwards.
    pub fn update_progress(&self, id: Uuid, progress: u8) {
        self.modify_processing(id, |task| {
            task.progress = task.progress.max(progress.min(PROGRESS_DONE));
        });
    }

    pub fn set_text(&self, id: Uuid, text: String) {
        self.modify_processing(id, |task| task.text = Some(text));
    }

    pub fn set_language(&self, id: Uuid, language: LanguageCode) {
        self.modify_processing(id, |task| task.language = Some(language));
    }

    pub fn set_chunk_count(&self, id: Uuid, chunk_count: usize) {
        self.modify_processing(id, |task| task.chunk_count = Some(chunk_count));
    }

    pub fn complete(&self, id: Uuid, audio_path: PathBuf) {
        self.modify_processing(id, |task| {
            task.status = TaskStatus::Completed;
            task.progress = PROGRESS_DONE;
            task.audio_path = Some(audio_path);
            task.completed_at = Some(Utc::now());
        });
    }

    pub fn fail(&self, id: Uuid, message: impl Into<String>) {
        let message = message.into();
        self.modify_processing(id, |task| {
            task.status = TaskStatus::Error;
            task.error = Some(message);
            task.text = None;
            task.completed_at = Some(Utc::now());
        });
    }

    /// Move the extracted text out of a completed task. Returns it only on
    /// the first call; afterwards the text lives solely in the sidecar file.
    pub fn take_text(&self, id: Uuid) -> Option<String> {
        let mut tasks = self.tasks.write();
        let task = tasks.get_mut(&id)?;
        if task.status != TaskStatus::Completed || task.text_delivered {
            return None;
        }
        task.text_delivered = true;
        task.text.take()
    }

    pub fn remove(&self, id: Uuid) -> Option<Task> {
        self.tasks.write().remove(&id)
    }

    /// Copy of every task, safe to iterate while the registry changes
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_count(&self) -> usize {
        self.tasks
            .read()
            .values()
            .filter(|task| task.status == TaskStatus::Processing)
            .count()
    }

    /// Drop terminal tasks finished before `cutoff` together with their
    /// text sidecars. Assembled audio stays on disk. Returns the number of
    /// tasks removed.
    pub async fn reap_finished_before(&self, cutoff: DateTime<Utc>, storage: &StorageLayout) -> usize {
        let expired: Vec<Uuid> = self
            .snapshot()
            .into_iter()
            .filter(|task| task.finished_before(cutoff))
            .map(|task| task.id)
            .collect();

        for id in &expired {
            self.remove(*id);
            remove_file_best_effort(&storage.text_path(*id)).await;
            tracing::debug!(task_id = %id, "Expired task reaped");
        }

        expired.len()
    }

    /// Terminal states are final: updates to a finished or unknown task
    /// are dropped.
    fn modify_processing(&self, id: Uuid, apply: impl FnOnce(&mut Task)) {
        let mut tasks = self.tasks.write();
        match tasks.get_mut(&id) {
            Some(task) if task.status == TaskStatus::Processing => apply(task),
            Some(task) => {
                tracing::warn!(task_id = %id, status = ?task.status, "Ignoring update to finished task");
            }
            None => {
                tracing::warn!(task_id = %id, "Ignoring update to unknown task");
            }
        }
    }
}
