use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::{AppConfig, AppError};

const OPENAI_TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const WHISPER_MODEL: &str = "whisper-1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_AUDIO_EXTENSION: &str = ".webm";

/// Speech-to-text backend: audio file in, text out.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, path: &Path) -> Result<String, AppError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

/// OpenAI audio transcription client
pub struct WhisperClient {
    http: reqwest::Client,
    api_key: String,
}

impl WhisperClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// None when OPENAI_API_KEY is not configured.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        match &config.openai_api_key {
            Some(key) => Some(Self::new(key.clone())),
            None => {
                log::warn!("⚠️  OPENAI_API_KEY not set - speech-to-text disabled");
                None
            }
        }
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, path: &Path) -> Result<String, AppError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::UpstreamError(format!("Failed to read upload: {}", e)))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.webm")
            .to_string();

        log::info!("🎙️ Sending {} bytes to Whisper ({})", bytes.len(), file_name);

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .text("model", WHISPER_MODEL)
            .part("file", part);

        let response = self
            .http
            .post(OPENAI_TRANSCRIPTIONS_URL)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::UpstreamError(format!("Failed to reach Whisper: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamError(format!(
                "Whisper API error: {}",
                response.status()
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamError(format!("Failed to parse Whisper response: {}", e)))?;

        Ok(parsed.text.unwrap_or_default())
    }
}

/// Extension of the uploaded file name including the dot, or `.webm`.
pub fn upload_extension(original_name: Option<&str>) -> String {
    original_name
        .map(Path::new)
        .and_then(|p| p.extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_else(|| DEFAULT_AUDIO_EXTENSION.to_string())
}

/// Upload written to the temp directory; the file is removed on drop.
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    /// Reserves `<dir>/<uuid><ext>`, creating the directory if needed.
    pub fn create(dir: &Path, extension: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}{}", uuid::Uuid::new_v4(), extension));
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("🧹 Removed temp upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::error!("❌ Failed to delete temp file {}: {}", self.path.display(), e),
        }
    }
}

/// Transcribes a stored upload. Any backend failure becomes the fixed
/// "Transcription failed" error; the upload is removed afterwards either way.
pub async fn transcribe_upload(
    transcriber: &dyn Transcriber,
    upload: TempUpload,
) -> Result<String, AppError> {
    let result = transcriber.transcribe(upload.path()).await;
    drop(upload);

    result.map_err(|e| {
        log::error!("❌ Whisper error: {}", e);
        AppError::UpstreamError("Transcription failed".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTranscriber(Result<&'static str, &'static str>);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, path: &Path) -> Result<String, AppError> {
            assert!(path.exists(), "upload must exist while transcribing");
            self.0
                .map(str::to_string)
                .map_err(|e| AppError::UpstreamError(e.to_string()))
        }
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("speech-test-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload_extension(Some("clip.MP3")), ".mp3");
        assert_eq!(upload_extension(Some("recording.wav")), ".wav");
        assert_eq!(upload_extension(Some("noext")), ".webm");
        assert_eq!(upload_extension(None), ".webm");
        assert_eq!(upload_extension(Some("evil.we/b")), ".webm");
    }

    #[test]
    fn test_temp_upload_removed_on_drop() {
        let dir = temp_dir();
        let upload = TempUpload::create(&dir, ".wav").unwrap();
        std::fs::write(upload.path(), b"RIFF").unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with(".wav"));

        drop(upload);
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_transcribe_success_cleans_up() {
        let dir = temp_dir();
        let upload = TempUpload::create(&dir, ".webm").unwrap();
        std::fs::write(upload.path(), b"audio").unwrap();
        let path = upload.path().to_path_buf();

        let text = transcribe_upload(&FixedTranscriber(Ok("hello there")), upload).await.unwrap();

        assert_eq!(text, "hello there");
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_transcribe_failure_is_fixed_error_and_cleans_up() {
        let dir = temp_dir();
        let upload = TempUpload::create(&dir, ".webm").unwrap();
        std::fs::write(upload.path(), b"audio").unwrap();
        let path = upload.path().to_path_buf();

        let err = transcribe_upload(&FixedTranscriber(Err("429 rate limited")), upload)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Upstream error: Transcription failed");
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_missing_text_field_is_empty() {
        let parsed: TranscriptionResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.text.unwrap_or_default(), "");
    }
}
