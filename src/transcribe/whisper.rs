use crate::audio::{chunk_duration_for, create_chunks, get_audio_duration, plan_chunks};
use crate::error::{LegendaError, Result};
use crate::transcribe::{
    log_segments, merge_chunk_segments, seconds_to_duration, Segment, Transcriber, Transcript,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// OpenAI API host.
const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Path of the transcription endpoint.
const TRANSCRIPTIONS_PATH: &str = "/v1/audio/transcriptions";

/// Transcription model name.
const WHISPER_MODEL: &str = "whisper-1";

/// Maximum file size for Whisper API (25 MB). Larger audio is chunked.
const MAX_FILE_SIZE: u64 = 25 * 1024 * 1024;

/// Maximum attempts for API calls.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff.
const BASE_DELAY: Duration = Duration::from_millis(1000);

/// OpenAI Whisper API client.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: Option<String>,
    retry_delay: Duration,
}

/// Outcome of one failed request.
struct ApiFailure {
    error: LegendaError,
    retryable: bool,
}

impl ApiFailure {
    /// Connection drops, timeouts and truncated bodies are worth another try.
    fn transport(error: reqwest::Error) -> Self {
        Self {
            error: error.into(),
            retryable: true,
        }
    }
}

impl WhisperClient {
    /// Create a new Whisper client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            language: None,
            retry_delay: BASE_DELAY,
        }
    }

    /// Set the source language (ISO 639-1 code).
    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    /// Point the client at another host, e.g. a proxy or a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Base delay between attempts; doubled after each failure.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    async fn build_form(&self, audio_path: &Path) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("flac") => "audio/flac",
            Some("ogg") => "audio/ogg",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        };

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", WHISPER_MODEL)
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        Ok(form)
    }

    async fn call_api(&self, form: Form) -> std::result::Result<WhisperResponse, ApiFailure> {
        let url = format!("{}{}", self.base_url, TRANSCRIPTIONS_PATH);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(ApiFailure::transport)?;

        let status = response.status();
        debug!("Whisper API response status: {}", status);

        let body = response.text().await.map_err(ApiFailure::transport)?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| ApiFailure {
                error: e.into(),
                retryable: false,
            });
        }

        let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(api_error) => format!(
                "Whisper API error ({}): {} ({})",
                status, api_error.error.message, api_error.error.r#type
            ),
            Err(_) => format!("Whisper API error ({}): {}", status, body),
        };

        Err(ApiFailure {
            error: LegendaError::Api(message),
            retryable: is_retryable(status),
        })
    }

    /// Rebuilds the form on each attempt since sending consumes it.
    async fn transcribe_with_retry(&self, audio: &Path) -> Result<WhisperResponse> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_delay * 2u32.pow(attempt - 1);
                debug!("Retry attempt {} after {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
            }

            let form = self.build_form(audio).await?;

            match self.call_api(form).await {
                Ok(response) => return Ok(response),
                Err(failure) if !failure.retryable => return Err(failure.error),
                Err(failure) => {
                    warn!("Attempt {} failed: {}", attempt + 1, failure.error);
                    last_error = Some(failure.error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LegendaError::Api("Unknown error".to_string())))
    }

    /// Split audio over the upload limit into chunks, transcribe each one and
    /// shift its segments back onto the full timeline.
    async fn transcribe_chunked(&self, audio: &Path, file_size: u64) -> Result<Transcript> {
        let total = get_audio_duration(audio)?;
        let spans = plan_chunks(total, chunk_duration_for(file_size, MAX_FILE_SIZE, total));
        info!(
            "Audio is {} bytes, over the {} byte upload limit; sending {} chunks",
            file_size,
            MAX_FILE_SIZE,
            spans.len()
        );

        let chunk_dir = tempfile::tempdir()?;
        let chunks = create_chunks(audio, &spans, chunk_dir.path())?;

        let mut language = None;
        let mut pieces = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            debug!("Transcribing chunk {}/{}", chunk.index + 1, chunks.len());
            let response = self.transcribe_with_retry(&chunk.path).await?;
            let transcript = self.parse_response(response);
            language.get_or_insert(transcript.language);
            pieces.push((chunk.start, transcript.segments));
        }

        let language = language.unwrap_or_else(|| "unknown".to_string());
        Ok(Transcript::new(language, merge_chunk_segments(pieces)))
    }

    fn parse_response(&self, response: WhisperResponse) -> Transcript {
        let segments = match response.segments {
            Some(api_segments) => api_segments
                .into_iter()
                .map(|seg| {
                    Segment::new(
                        seconds_to_duration(seg.start),
                        seconds_to_duration(seg.end),
                        seg.text,
                    )
                })
                .collect(),
            None if response.text.trim().is_empty() => Vec::new(),
            None => vec![Segment::new(
                Duration::ZERO,
                seconds_to_duration(response.duration.unwrap_or_default()),
                response.text,
            )],
        };

        let language = self
            .language
            .clone()
            .or(response.language)
            .unwrap_or_else(|| "unknown".to_string());

        Transcript::new(language, segments)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        let file_size = fs::metadata(audio).await?.len();

        info!(
            "Transcribing audio from {} with {}...",
            audio.display(),
            WHISPER_MODEL
        );

        let transcript = if file_size > MAX_FILE_SIZE {
            self.transcribe_chunked(audio, file_size).await?
        } else {
            let response = self.transcribe_with_retry(audio).await?;
            self.parse_response(response)
        };

        info!("Audio transcribed successfully.");
        log_segments(&transcript.segments);

        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Option<Vec<WhisperSegment>>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    r#type: String,
}
