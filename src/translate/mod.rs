pub mod gemini;
pub mod google;

pub use gemini::GeminiTranslator;
pub use google::GoogleTranslator;

use crate::config::{Config, TranslatorKind};
use crate::error::{LegendaError, Result};
use crate::transcribe::{Segment, Transcript};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

/// Translates text between one fixed pair of languages.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;
    fn source(&self) -> &str;
    fn target(&self) -> &str;
    fn name(&self) -> &'static str;
}

/// Counts from one translation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationStats {
    pub translated: usize,
    /// Segments that kept their source text after a failed call.
    pub fallbacks: usize,
}

/// Translate every segment of `transcript`, keeping its timing.
///
/// A failed call keeps that segment's source text and never stops the
/// batch. At most `concurrency` calls are in flight; output order always
/// matches input order.
pub async fn translate_transcript(
    translator: &dyn Translator,
    transcript: &Transcript,
    concurrency: usize,
    show_progress: bool,
) -> (Transcript, TranslationStats) {
    info!(
        "Starting translation of {} segments from {} to {} with {}...",
        transcript.len(),
        translator.source(),
        translator.target(),
        translator.name()
    );

    let progress_bar = if show_progress {
        let pb = ProgressBar::new(transcript.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let results: Vec<(Segment, bool)> = stream::iter(transcript.segments.iter().enumerate())
        .map(|(i, segment)| {
            let pb = progress_bar.clone();
            async move {
                let outcome = match translator.translate(&segment.text).await {
                    Ok(translated) => {
                        info!("Segment {}: Translated text: {}", i + 1, translated);
                        (segment.with_text(translated), true)
                    }
                    Err(e) => {
                        warn!("Segment {}: Translation error: {}", i + 1, e);
                        (segment.clone(), false)
                    }
                };
                if let Some(pb) = pb {
                    pb.inc(1);
                }
                outcome
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    let mut stats = TranslationStats::default();
    let mut segments = Vec::with_capacity(results.len());
    for (segment, ok) in results {
        if ok {
            stats.translated += 1;
        } else {
            stats.fallbacks += 1;
        }
        segments.push(segment);
    }

    info!(
        "Translation to {} completed ({} translated, {} kept original).",
        translator.target(),
        stats.translated,
        stats.fallbacks
    );

    (Transcript::new(translator.target(), segments), stats)
}

/// Build the translator selected in `config`.
pub fn create_translator(config: &Config) -> Result<Box<dyn Translator>> {
    let source = config.source_language.clone();
    let target = config.target_language.clone();

    match config.translator {
        TranslatorKind::Google => Ok(Box::new(GoogleTranslator::new(source, target))),
        TranslatorKind::Gemini => {
            let api_key = config.gemini_api_key.as_ref().ok_or_else(|| {
                LegendaError::Config(
                    "Gemini API key not set. Set GEMINI_API_KEY environment variable."
                        .to_string(),
                )
            })?;
            Ok(Box::new(GeminiTranslator::new(api_key.clone(), source, target)))
        }
    }
}
