use crate::audio::{audio_path_for, AudioExtractor};
use crate::config::Config;
use crate::error::{LegendaError, Result};
use crate::subtitle::{subtitle_path, write_subtitles};
use crate::transcribe::Transcriber;
use crate::translate::{translate_transcript, TranslationStats, Translator};
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Configuration for the subtitle generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Language of the speech, also the first subtitle file's suffix.
    pub source_language: String,
    /// Language of the translated subtitle file.
    pub target_language: String,
    /// Translation requests in flight at once.
    pub concurrency: usize,
    /// Show progress bars.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_language: "pt-BR".to_string(),
            concurrency: 4,
            show_progress: true,
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            concurrency: config.concurrency,
            show_progress: true,
        }
    }
}

/// Statistics from the subtitle generation process.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_time: Duration,
    pub extraction_time: Duration,
    pub transcription_time: Duration,
    pub translation_time: Duration,
    /// Number of subtitle cues in each file.
    pub segments: usize,
    pub translation: TranslationStats,
    pub transcriber: String,
    pub translator: String,
}

/// Files written by a completed run.
#[derive(Debug)]
pub struct PipelineReport {
    pub source_subtitles: PathBuf,
    pub target_subtitles: PathBuf,
    pub stats: PipelineStats,
}

/// How a run that got past the pre-flight checks ended.
#[derive(Debug)]
pub enum PipelineOutcome {
    Completed(PipelineReport),
    /// A phase failed; the error has been logged and the audio cleaned up.
    Failed(LegendaError),
}

impl PipelineOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed(_))
    }
}

/// Removes the temporary audio file when dropped, if it exists.
pub struct AudioFileGuard {
    path: PathBuf,
}

impl AudioFileGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AudioFileGuard {
    fn drop(&mut self) {
        remove_temp_audio(&self.path);
    }
}

/// Delete `path` if it exists, logging instead of failing.
pub fn remove_temp_audio(path: &Path) {
    if !path.exists() {
        debug!("No temporary audio at {}", path.display());
        return;
    }
    info!("Cleaning up file: {}", path.display());
    if let Err(e) = std::fs::remove_file(path) {
        error!("Failed to remove {}: {}", path.display(), e);
    }
}

/// Sequences extraction, transcription, translation and subtitle writing
/// for one video.
pub struct Pipeline {
    extractor: Box<dyn AudioExtractor>,
    transcriber: Box<dyn Transcriber>,
    translator: Box<dyn Translator>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        extractor: Box<dyn AudioExtractor>,
        transcriber: Box<dyn Transcriber>,
        translator: Box<dyn Translator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            extractor,
            transcriber,
            translator,
            config,
        }
    }

    /// Run the whole pipeline on `video`.
    ///
    /// Returns `Err` only for pre-flight failures (missing input, missing
    /// FFmpeg), which happen before anything is written. Any later failure
    /// is logged and returned as [`PipelineOutcome::Failed`] after the
    /// temporary audio file has been removed.
    pub async fn run(&self, video: &Path) -> Result<PipelineOutcome> {
        if !video.is_file() {
            return Err(LegendaError::FileNotFound(video.display().to_string()));
        }

        self.extractor.check_dependency()?;

        let guard = AudioFileGuard::new(audio_path_for(video));

        let outcome = match self.process(video, guard.path()).await {
            Ok(report) => {
                info!("Subtitles generated successfully!");
                PipelineOutcome::Completed(report)
            }
            Err(e) => {
                log_error_chain(&e);
                PipelineOutcome::Failed(e)
            }
        };

        drop(guard);
        Ok(outcome)
    }

    async fn process(&self, video: &Path, audio: &Path) -> Result<PipelineReport> {
        let start_time = Instant::now();

        info!("Stage 1/3: Extracting audio");
        self.extractor.extract(video, audio)?;
        let extraction_time = start_time.elapsed();

        info!("Stage 2/3: Transcribing with {}", self.transcriber.name());
        let transcription_start = Instant::now();
        let spinner = self.spinner("Transcribing audio...");
        let transcript = self.transcriber.transcribe(audio).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        let transcript = transcript?;
        let transcription_time = transcription_start.elapsed();

        let source_subtitles = subtitle_path(video, &self.config.source_language);
        write_subtitles(&source_subtitles, &transcript.segments)?;

        info!("Stage 3/3: Translating with {}", self.translator.name());
        let translation_start = Instant::now();
        let (translated, translation) = translate_transcript(
            self.translator.as_ref(),
            &transcript,
            self.config.concurrency,
            self.config.show_progress,
        )
        .await;
        let translation_time = translation_start.elapsed();

        let target_subtitles = subtitle_path(video, &self.config.target_language);
        write_subtitles(&target_subtitles, &translated.segments)?;

        Ok(PipelineReport {
            source_subtitles,
            target_subtitles,
            stats: PipelineStats {
                total_time: start_time.elapsed(),
                extraction_time,
                transcription_time,
                translation_time,
                segments: transcript.len(),
                translation,
                transcriber: self.transcriber.name().to_string(),
                translator: self.translator.name().to_string(),
            },
        })
    }

    fn spinner(&self, message: &'static str) -> Option<ProgressBar> {
        if !self.config.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

fn log_error_chain(e: &LegendaError) {
    error!("An error occurred: {}", e);
    let mut source = e.source();
    while let Some(cause) = source {
        error!("  caused by: {}", cause);
        source = cause.source();
    }
    debug!("{:?}", e);
}

/// Print a summary of the pipeline results.
pub fn print_summary(report: &PipelineReport) {
    let stats = &report.stats;
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                      Subtitle Generation Complete              ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Source:     {}", report.source_subtitles.display());
    println!("  Target:     {}", report.target_subtitles.display());
    println!("  Cues:       {}", stats.segments);
    println!("  Transcriber: {}", stats.transcriber);
    println!(
        "  Translator: {} ({} translated, {} kept original)",
        stats.translator, stats.translation.translated, stats.translation.fallbacks
    );
    println!();
    println!("  Timing:");
    println!("    Extract:     {:.2}s", stats.extraction_time.as_secs_f64());
    println!("    Transcribe:  {:.2}s", stats.transcription_time.as_secs_f64());
    println!("    Translate:   {:.2}s", stats.translation_time.as_secs_f64());
    println!("    Total:       {:.2}s", stats.total_time.as_secs_f64());
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.source_language, "en");
        assert_eq!(config.target_language, "pt-BR");
        assert_eq!(config.concurrency, 4);
        assert!(config.show_progress);
    }

    #[test]
    fn test_pipeline_config_from_config() {
        let config = Config {
            target_language: "es".to_string(),
            concurrency: 1,
            ..Config::default()
        };
        let pipeline_config = PipelineConfig::from(&config);
        assert_eq!(pipeline_config.target_language, "es");
        assert_eq!(pipeline_config.concurrency, 1);
    }

    #[test]
    fn test_guard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("clip.mp3");
        std::fs::write(&audio, b"ID3").unwrap();

        drop(AudioFileGuard::new(audio.clone()));
        assert!(!audio.exists());
    }

    #[test]
    fn test_guard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("never-created.mp3");
        drop(AudioFileGuard::new(audio.clone()));
        assert!(!audio.exists());
    }
}
