use super::assembler::assemble;
use super::chunker::split_text;
use super::error::ConversionError;
use super::model::{Task, TaskStatus, PROGRESS_ASSEMBLED, PROGRESS_CHUNKED, PROGRESS_EXTRACTED};
use super::registry::TaskRegistry;
use super::synthesizer::ParallelSynthesizer;
use super::{ConvertResponse, TaskStatusResponse};
use crate::domain::tts::{LanguageCode, LanguageSelection};
use crate::infrastructure::extraction::{document_extension, is_supported_extension, TextExtractor};
use crate::infrastructure::storage::{remove_file_best_effort, StorageLayout};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Characters of extracted text handed to language detection
const DETECTION_SAMPLE_CHARS: usize = 4000;

#[derive(Debug, Clone)]
pub struct ConversionSettings {
    pub max_upload_bytes: u64,
    pub max_chunk_length: usize,
    pub default_language: LanguageCode,
}

/// A document as received from the client
#[derive(Debug)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub language: Option<String>,
}

#[derive(Clone)]
pub struct ConversionService {
    registry: Arc<TaskRegistry>,
    extractor: Arc<dyn TextExtractor>,
    synthesizer: Arc<ParallelSynthesizer>,
    storage: StorageLayout,
    settings: ConversionSettings,
}

impl ConversionService {
    pub fn new(
        registry: Arc<TaskRegistry>,
        extractor: Arc<dyn TextExtractor>,
        synthesizer: Arc<ParallelSynthesizer>,
        storage: StorageLayout,
        settings: ConversionSettings,
    ) -> Self {
        Self {
            registry,
            extractor,
            synthesizer,
            storage,
            settings,
        }
    }
}

#[async_trait]
pub trait ConversionServiceApi: Send + Sync {
    /// Validate and persist an upload, then start converting it in the
    /// background. Returns as soon as the task is registered.
    async fn submit(&self, upload: DocumentUpload) -> Result<ConvertResponse, ConversionError>;

    async fn status(&self, task_id: Uuid) -> Result<TaskStatusResponse, ConversionError>;

    /// Tasks still processing
    fn active_tasks(&self) -> usize;
}

#[async_trait]
impl ConversionServiceApi for ConversionService {
    async fn submit(&self, upload: DocumentUpload) -> Result<ConvertResponse, ConversionError> {
        let extension = self.validate_format(&upload.file_name)?;

        let size = upload.bytes.len() as u64;
        if size > self.settings.max_upload_bytes {
            return Err(ConversionError::PayloadTooLarge {
                size,
                limit: self.settings.max_upload_bytes,
            });
        }

        let selection = LanguageSelection::parse(upload.language.as_deref(), self.settings.default_language)
            .map_err(ConversionError::UnsupportedLanguage)?;

        let task_id = Uuid::new_v4();
        let input = self.storage.upload_path(task_id, &extension);
        tokio::fs::write(&input, &upload.bytes).await?;

        self.registry.insert(Task::new(task_id, upload.file_name.clone(), size));

        tracing::info!(
            task_id = %task_id,
            file_name = %upload.file_name,
            file_size = size,
            language = ?selection,
            "Conversion task submitted"
        );

        let service = self.clone();
        tokio::spawn(async move {
            service.run(task_id, input, selection).await;
        });

        Ok(ConvertResponse {
            task_id,
            status: TaskStatus::Processing,
            status_url: format!("/status/{}", task_id),
        })
    }

    async fn status(&self, task_id: Uuid) -> Result<TaskStatusResponse, ConversionError> {
        let task = self
            .registry
            .get(task_id)
            .ok_or(ConversionError::TaskNotFound(task_id))?;

        let mut response = TaskStatusResponse::from_task(&task, Utc::now());

        if task.status == TaskStatus::Completed {
            response.text = match self.registry.take_text(task_id) {
                Some(text) => Some(text),
                None => self.read_text_sidecar(task_id).await,
            };
            response.audio_url = Some(format!(
                "/audio/{}",
                StorageLayout::output_file_name(task_id)
            ));
        }

        Ok(response)
    }

    fn active_tasks(&self) -> usize {
        self.registry.active_count()
    }
}

impl ConversionService {
    fn validate_format(&self, file_name: &str) -> Result<String, ConversionError> {
        let extension = document_extension(file_name).unwrap_or_default();
        if !is_supported_extension(&extension) {
            return Err(ConversionError::UnsupportedFormat(extension));
        }
        Ok(extension)
    }

    /// Drive a task to a terminal state. The pipeline runs in its own tokio
    /// task so that a panic inside it still ends as an `error` status.
    /// Temporary files are gone before the terminal state is published.
    async fn run(&self, task_id: Uuid, input: PathBuf, selection: LanguageSelection) {
        let pipeline = self.clone();
        let pipeline_input = input.clone();
        let outcome =
            tokio::spawn(async move { pipeline.convert(task_id, &pipeline_input, selection).await }).await;

        remove_file_best_effort(&input).await;

        match outcome {
            Ok(Ok(audio_path)) => {
                self.registry.complete(task_id, audio_path);
                if let Some(task) = self.registry.get(task_id) {
                    tracing::info!(
                        task_id = %task_id,
                        file_name = %task.file_name,
                        chunks = task.chunk_count.unwrap_or_default(),
                        elapsed_secs = task.elapsed_secs(Utc::now()),
                        "Conversion completed"
                    );
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(task_id = %task_id, error = %e, "Conversion failed");
                self.discard_artifacts(task_id).await;
                self.registry.fail(task_id, e.to_string());
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Conversion pipeline panicked");
                self.discard_artifacts(task_id).await;
                self.registry
                    .fail(task_id, "internal error while converting the document");
            }
        }
    }

    async fn convert(
        &self,
        task_id: Uuid,
        input: &Path,
        selection: LanguageSelection,
    ) -> Result<PathBuf, ConversionError> {
        let text = self.extractor.extract(input).await?;
        if text.trim().is_empty() {
            return Err(ConversionError::NoExtractableText);
        }
        self.registry.update_progress(task_id, PROGRESS_EXTRACTED);

        tokio::fs::write(self.storage.text_path(task_id), &text).await?;

        let language = resolve_language(selection, &text).await;
        let chunks = split_text(&text, self.settings.max_chunk_length);
        self.registry.set_language(task_id, language);
        self.registry.set_chunk_count(task_id, chunks.len());
        self.registry.set_text(task_id, text);
        self.registry.update_progress(task_id, PROGRESS_CHUNKED);

        tracing::debug!(
            task_id = %task_id,
            chunks = chunks.len(),
            language = %language,
            provider = self.synthesizer.backend_name(),
            "Text chunked, starting synthesis"
        );

        let registry = self.registry.clone();
        let artifacts = self
            .synthesizer
            .synthesize_all(&chunks, task_id, language, move |progress| {
                registry.update_progress(task_id, progress)
            })
            .await;

        let output = self.storage.output_path(task_id);
        let outcome = assemble(&artifacts, &output).await;
        self.registry.update_progress(task_id, PROGRESS_ASSEMBLED);
        tracing::debug!(task_id = %task_id, outcome = ?outcome, "Audio assembled");

        self.storage.remove_chunks(task_id).await;

        Ok(output)
    }

    /// Best-effort removal of everything a failed task left behind
    async fn discard_artifacts(&self, task_id: Uuid) {
        self.storage.remove_chunks(task_id).await;
        remove_file_best_effort(&self.storage.output_path(task_id)).await;
        remove_file_best_effort(&self.storage.text_path(task_id)).await;
    }

    async fn read_text_sidecar(&self, task_id: Uuid) -> Option<String> {
        let path = self.storage.text_path(task_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(task_id = %task_id, path = %path.display(), error = %e, "Failed to read text sidecar");
                None
            }
        }
    }
}

/// Detection runs on the blocking pool over a bounded sample of the text
async fn resolve_language(selection: LanguageSelection, text: &str) -> LanguageCode {
    let LanguageSelection::Auto { fallback } = selection else {
        return selection.resolve(text);
    };

    let sample: String = text.chars().take(DETECTION_SAMPLE_CHARS).collect();
    match tokio::task::spawn_blocking(move || selection.resolve(&sample)).await {
        Ok(language) => language,
        Err(e) => {
            tracing::warn!(error = %e, fallback = %fallback, "Language detection failed");
            fallback
        }
    }
}
