//! In-process Whisper inference through whisper.cpp.

use crate::audio::decode_pcm_f32;
use crate::error::{LegendaError, Result};
use crate::transcribe::{log_segments, Segment, Transcriber, Transcript};
use async_trait::async_trait;
use std::ffi::c_int;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Runs a ggml Whisper model on the CPU.
///
/// The model is loaded from disk on every [`Transcriber::transcribe`] call;
/// the pipeline only transcribes once per process.
pub struct LocalWhisper {
    model_path: PathBuf,
    threads: usize,
    language: String,
}

impl LocalWhisper {
    pub fn new(model_path: PathBuf, threads: usize, language: String) -> Self {
        Self {
            model_path,
            threads: threads.max(1),
            language,
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    fn run(model_path: &Path, threads: usize, language: &str, audio: &Path) -> Result<Vec<Segment>> {
        if !model_path.exists() {
            return Err(LegendaError::Transcription(format!(
                "Whisper model not found: {}",
                model_path.display()
            )));
        }
        let model = model_path.to_str().ok_or_else(|| {
            LegendaError::Transcription(format!(
                "Model path is not valid UTF-8: {}",
                model_path.display()
            ))
        })?;

        info!("Loading Whisper model {}...", model_path.display());
        let ctx = WhisperContext::new_with_params(model, WhisperContextParameters::default())
            .map_err(whisper_error)?;

        let samples = decode_pcm_f32(audio)?;
        debug!("Decoded {} samples", samples.len());

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(thread_count(threads));
        params.set_language(Some(language));
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        info!(
            "Transcribing audio from {} on {} threads...",
            audio.display(),
            threads
        );
        let mut state = ctx.create_state().map_err(whisper_error)?;
        state.full(params, &samples).map_err(whisper_error)?;

        let mut segments = Vec::new();
        for segment in state.as_iter() {
            let text = segment.to_str_lossy().map_err(whisper_error)?.to_string();
            segments.push(Segment::new(
                centiseconds(segment.start_timestamp()),
                centiseconds(segment.end_timestamp()),
                text,
            ));
        }

        Ok(segments)
    }
}

/// whisper.cpp reports timestamps in hundredths of a second.
fn centiseconds(t: i64) -> Duration {
    Duration::from_millis(t.max(0) as u64 * 10)
}

fn whisper_error(e: whisper_rs::WhisperError) -> LegendaError {
    LegendaError::Transcription(e.to_string())
}

#[async_trait]
impl Transcriber for LocalWhisper {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        let model_path = self.model_path.clone();
        let language = self.language.clone();
        let threads = self.threads;
        let audio = audio.to_path_buf();

        let segments =
            tokio::task::spawn_blocking(move || Self::run(&model_path, threads, &language, &audio))
                .await
                .map_err(|e| LegendaError::Transcription(format!("Inference task failed: {e}")))??;

        info!("Audio transcribed successfully.");
        log_segments(&segments);

        Ok(Transcript::new(self.language.clone(), segments))
    }

    fn name(&self) -> &'static str {
        "whisper.cpp"
    }
}

/// Thread count as whisper.cpp takes it, saturating instead of wrapping.
fn thread_count(threads: usize) -> c_int {
    c_int::try_from(threads).unwrap_or(c_int::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centiseconds() {
        assert_eq!(centiseconds(0), Duration::ZERO);
        assert_eq!(centiseconds(372_540), Duration::from_millis(3_725_400));
        assert_eq!(centiseconds(-5), Duration::ZERO);
    }

    #[test]
    fn test_threads_never_zero() {
        let whisper = LocalWhisper::new(PathBuf::from("model.bin"), 0, "en".to_string());
        assert_eq!(whisper.threads(), 1);
    }

    #[test]
    fn test_thread_count_saturates() {
        assert_eq!(thread_count(8), 8);
        assert_eq!(thread_count(usize::MAX), c_int::MAX);
    }

    #[tokio::test]
    async fn test_missing_model() {
        let whisper = LocalWhisper::new(
            PathBuf::from("/nonexistent/ggml-large-v2.bin"),
            2,
            "en".to_string(),
        );
        let result = whisper.transcribe(Path::new("/nonexistent/audio.mp3")).await;
        assert!(matches!(result, Err(LegendaError::Transcription(_))));
    }
}
