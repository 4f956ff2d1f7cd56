use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::conversion::{
        ConversionError, ConversionService, ConversionServiceApi, ConvertResponse, DocumentUpload,
        TaskStatusResponse,
    },
    error::{AppError, AppResult},
    infrastructure::extraction::{document_extension, is_supported_extension},
};

const FILE_FIELD: &str = "file";
const LANGUAGE_FIELDS: &[&str] = &["lang", "language"];

pub struct ConversionController {
    conversion_service: Arc<ConversionService>,
    max_upload_bytes: u64,
}

impl ConversionController {
    pub fn new(conversion_service: Arc<ConversionService>, max_upload_bytes: u64) -> Self {
        Self {
            conversion_service,
            max_upload_bytes,
        }
    }

    /// POST /convert - Upload a PDF or DOCX document for conversion
    pub async fn convert(
        State(controller): State<Arc<ConversionController>>,
        mut multipart: Multipart,
    ) -> AppResult<(StatusCode, Json<ConvertResponse>)> {
        let mut document: Option<(String, Vec<u8>)> = None;
        let mut language: Option<String> = None;

        while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == FILE_FIELD {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::BadRequest("The file field must carry a file name".to_string()))?;

                // Reject before buffering the body
                let extension = document_extension(&file_name).unwrap_or_default();
                if !is_supported_extension(&extension) {
                    return Err(ConversionError::UnsupportedFormat(extension).into());
                }

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    let size = (bytes.len() + chunk.len()) as u64;
                    if size > controller.max_upload_bytes {
                        return Err(ConversionError::PayloadTooLarge {
                            size,
                            limit: controller.max_upload_bytes,
                        }
                        .into());
                    }
                    bytes.extend_from_slice(&chunk);
                }
                document = Some((file_name, bytes));
            } else if LANGUAGE_FIELDS.contains(&name.as_str()) {
                language = Some(field.text().await.map_err(multipart_error)?);
            }
        }

        let (file_name, bytes) = document
            .ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;

        let response = controller
            .conversion_service
            .submit(DocumentUpload {
                file_name,
                bytes,
                language,
            })
            .await?;

        Ok((StatusCode::ACCEPTED, Json(response)))
    }

    /// GET /status/:task_id - Progress of a conversion task
    pub async fn status(
        State(controller): State<Arc<ConversionController>>,
        Path(task_id): Path<String>,
    ) -> AppResult<Json<TaskStatusResponse>> {
        // A malformed id can never name a task
        let task_id = Uuid::parse_str(&task_id)
            .map_err(|_| AppError::NotFound(format!("Task {}", task_id)))?;

        let response = controller.conversion_service.status(task_id).await?;
        Ok(Json(response))
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}
