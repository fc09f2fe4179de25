use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{LegendaError, Result};

use super::extract::extract_audio_segment;

/// Longest chunk sent in one request.
const MAX_CHUNK_DURATION: Duration = Duration::from_secs(600);

/// Shortest chunk worth a request of its own.
const MIN_CHUNK_DURATION: Duration = Duration::from_secs(30);

/// Share of the upload limit a chunk is planned to fill.
const SIZE_HEADROOM: f64 = 0.9;

/// One slice of a longer audio file, with its place on the original timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub path: PathBuf,
}

/// Plan fixed-duration spans covering `total_duration`.
///
/// The last span ends exactly at `total_duration` and may be shorter.
pub fn plan_chunks(
    total_duration: Duration,
    chunk_duration: Duration,
) -> Vec<(Duration, Duration)> {
    let mut chunks = Vec::new();
    if chunk_duration.is_zero() {
        return chunks;
    }

    let mut current = Duration::ZERO;
    while current < total_duration {
        let end = (current + chunk_duration).min(total_duration);
        chunks.push((current, end));
        current = end;
    }

    chunks
}

/// Chunk length that keeps each piece of a `file_size`-byte recording of
/// `total_duration` under `max_file_size`, assuming a constant bitrate.
pub fn chunk_duration_for(
    file_size: u64,
    max_file_size: u64,
    total_duration: Duration,
) -> Duration {
    if file_size == 0 || total_duration.is_zero() {
        return MAX_CHUNK_DURATION;
    }

    let bytes_per_second = file_size as f64 / total_duration.as_secs_f64();
    let seconds = max_file_size as f64 * SIZE_HEADROOM / bytes_per_second;

    Duration::from_secs_f64(seconds.max(0.0)).clamp(MIN_CHUNK_DURATION, MAX_CHUNK_DURATION)
}

/// Cut `source_audio` into one file per planned span under `output_dir`.
pub fn create_chunks(
    source_audio: &Path,
    spans: &[(Duration, Duration)],
    output_dir: &Path,
) -> Result<Vec<AudioChunk>> {
    if !source_audio.exists() {
        return Err(LegendaError::FileNotFound(
            source_audio.display().to_string(),
        ));
    }

    std::fs::create_dir_all(output_dir).map_err(|e| {
        LegendaError::AudioExtraction(format!("Failed to create chunk directory: {e}"))
    })?;

    info!(
        "Splitting audio into {} chunks in {}",
        spans.len(),
        output_dir.display()
    );

    let mut chunks = Vec::with_capacity(spans.len());
    for (index, &(start, end)) in spans.iter().enumerate() {
        let path = output_dir.join(format!("chunk_{:04}.mp3", index));
        debug!("Creating chunk {}: {:?} to {:?}", index, start, end);

        extract_audio_segment(source_audio, &path, start, end)?;

        chunks.push(AudioChunk {
            index,
            start,
            end,
            path,
        });
    }

    Ok(chunks)
}
