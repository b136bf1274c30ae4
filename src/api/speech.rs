use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, ResponseError};
use futures::TryStreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::services::speech_service::{self, TempUpload, Transcriber, MAX_UPLOAD_BYTES};
use crate::utils::AppError;

const FILE_FIELD: &str = "file";

/// Transcription backend (absent without OPENAI_API_KEY) and temp directory.
pub struct SpeechState {
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub upload_dir: PathBuf,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TranscriptionResponse {
    pub text: String,
}

#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct AudioUpload {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

fn multipart_error(e: actix_multipart::MultipartError) -> AppError {
    AppError::InvalidRequest(format!("Malformed upload: {}", e))
}

/// Streams the `file` part into the upload directory. Other parts are skipped.
async fn store_upload(
    payload: &mut Multipart,
    upload_dir: &Path,
) -> Result<Option<TempUpload>, AppError> {
    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            while field.try_next().await.map_err(multipart_error)?.is_some() {}
            continue;
        }

        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let extension = speech_service::upload_extension(original_name.as_deref());

        let upload = TempUpload::create(upload_dir, &extension)
            .map_err(|e| AppError::UpstreamError(format!("Failed to store upload: {}", e)))?;
        let mut file = tokio::fs::File::create(upload.path())
            .await
            .map_err(|e| AppError::UpstreamError(format!("Failed to store upload: {}", e)))?;

        let mut written = 0usize;
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            written += chunk.len();
            if written > MAX_UPLOAD_BYTES {
                return Err(AppError::InvalidRequest("File too large".to_string()));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::UpstreamError(format!("Failed to store upload: {}", e)))?;
        }
        file.flush()
            .await
            .map_err(|e| AppError::UpstreamError(format!("Failed to store upload: {}", e)))?;

        log::info!("📁 Stored upload {} ({} bytes)", upload.path().display(), written);
        return Ok(Some(upload));
    }

    Ok(None)
}

#[utoipa::path(
    post,
    path = "/speech/speech-to-text",
    tag = "Speech",
    request_body(content = AudioUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Transcribed text", body = TranscriptionResponse),
        (status = 400, description = "No file provided or file too large"),
        (status = 500, description = "Transcription failed"),
        (status = 503, description = "Transcription not configured")
    )
)]
pub async fn speech_to_text(state: web::Data<SpeechState>, mut payload: Multipart) -> HttpResponse {
    log::info!("🎙️ POST /speech/speech-to-text");

    let transcriber = match &state.transcriber {
        Some(transcriber) => transcriber.clone(),
        None => {
            return AppError::Unavailable("Speech-to-text is not configured".to_string())
                .error_response();
        }
    };

    let upload = match store_upload(&mut payload, &state.upload_dir).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": "No file provided"
            }));
        }
        Err(e) => {
            log::warn!("❌ Upload rejected: {}", e);
            return e.error_response();
        }
    };

    match speech_service::transcribe_upload(transcriber.as_ref(), upload).await {
        Ok(text) => {
            log::info!("✅ Transcribed {} chars", text.len());
            HttpResponse::Ok().json(TranscriptionResponse { text })
        }
        Err(e) => e.error_response(),
    }
}
