#[cfg(feature = "local")]
pub mod local;
pub mod whisper;

#[cfg(feature = "local")]
pub use local::LocalWhisper;
pub use whisper::WhisperClient;

use crate::config::{Config, Provider};
use crate::error::{LegendaError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// One timed unit of recognised or translated speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

impl Segment {
    pub fn new(start: Duration, end: Duration, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Same timing, different text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            start: self.start,
            end: self.end,
            text: text.into(),
        }
    }
}

/// Segments for one full pass over the audio, in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub segments: Vec<Segment>,
    pub language: String,
}

impl Transcript {
    pub fn new(language: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            segments,
            language: language.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript>;
    fn name(&self) -> &'static str;
}

/// Convert model seconds to a timestamp, flooring to whole milliseconds.
pub fn seconds_to_duration(seconds: f64) -> Duration {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_millis((seconds * 1000.0).floor() as u64)
}

/// Join per-chunk segments into one timeline.
///
/// Each chunk's timestamps are relative to its own start; they are shifted
/// by the chunk's offset so the result lines up with the full recording.
pub fn merge_chunk_segments(chunks: Vec<(Duration, Vec<Segment>)>) -> Vec<Segment> {
    chunks
        .into_iter()
        .flat_map(|(offset, segments)| {
            segments
                .into_iter()
                .map(move |seg| Segment::new(offset + seg.start, offset + seg.end, seg.text))
        })
        .collect()
}

/// Log each recognised segment the way the pipeline reports progress.
pub(crate) fn log_segments(segments: &[Segment]) {
    for (i, segment) in segments.iter().enumerate() {
        info!("Segment {}: Transcribed text: {}", i + 1, segment.text);
    }
}

/// Build the transcriber selected in `config`.
pub fn create_transcriber(config: &Config) -> Result<Box<dyn Transcriber>> {
    match config.provider {
        Provider::OpenAi => {
            let api_key = config.openai_api_key.as_ref().ok_or_else(|| {
                LegendaError::Config(
                    "OpenAI API key not set. Set OPENAI_API_KEY environment variable."
                        .to_string(),
                )
            })?;
            Ok(Box::new(
                WhisperClient::new(api_key.clone()).with_language(config.source_language.clone()),
            ))
        }
        #[cfg(feature = "local")]
        Provider::Local => Ok(Box::new(LocalWhisper::new(
            config.model_path.clone(),
            config.threads,
            config.source_language.clone(),
        ))),
        #[cfg(not(feature = "local"))]
        Provider::Local => Err(LegendaError::Config(
            "The local provider is not compiled in. Rebuild with --features local".to_string(),
        )),
    }
}
