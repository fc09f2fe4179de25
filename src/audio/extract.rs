use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{LegendaError, Result};

use super::WHISPER_SAMPLE_RATE;

/// Mono 16 kHz MP3 at 64 kbit/s: everything Whisper uses, at about
/// 28 MiB per hour of audio.
const SPEECH_MP3_ARGS: [&str; 9] = [
    "-vn", "-acodec", "libmp3lame", "-ac", "1", "-ar", "16000", "-b:a", "64k",
];

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| {
            LegendaError::DependencyMissing(format!(
                "FFmpeg is not installed or not accessible. Please install FFmpeg and add it to your PATH. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(LegendaError::DependencyMissing(
            "FFmpeg is not installed or not accessible. Please install FFmpeg and add it to your PATH."
                .to_string(),
        ));
    }

    info!("FFmpeg is installed and accessible.");
    Ok(())
}

/// Path of the temporary audio file for `video`: same base name, `.mp3`.
///
/// Falls back to `<base>.audio.mp3` when the input is itself an MP3 in any
/// letter case, so cleaning up the audio can never remove the input on a
/// case-insensitive filesystem.
pub fn audio_path_for(video: &Path) -> PathBuf {
    let is_mp3 = video
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp3"));

    if is_mp3 {
        let stem = video.file_stem().unwrap_or_default().to_string_lossy();
        video.with_file_name(format!("{stem}.audio.mp3"))
    } else {
        video.with_extension("mp3")
    }
}

/// Pulls the audio track out of a video container into a standalone file.
pub trait AudioExtractor: Send + Sync {
    /// Fail fast when the external tool behind the extractor is unusable.
    fn check_dependency(&self) -> Result<()>;
    fn extract(&self, video: &Path, audio: &Path) -> Result<()>;
}

/// Extracts the full-duration audio track with the `ffmpeg` binary.
#[derive(Debug, Clone, Default)]
pub struct FfmpegExtractor;

impl AudioExtractor for FfmpegExtractor {
    fn check_dependency(&self) -> Result<()> {
        check_ffmpeg()
    }

    fn extract(&self, video: &Path, audio: &Path) -> Result<()> {
        info!("Extracting audio from {}...", video.display());

        let output = Command::new("ffmpeg")
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(video)
            .args(SPEECH_MP3_ARGS)
            .arg(audio)
            .output()
            .map_err(|e| LegendaError::AudioExtraction(format!("Failed to run FFmpeg: {e}")))?;

        if !output.status.success() {
            return Err(LegendaError::AudioExtraction(format!(
                "FFmpeg exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            )));
        }

        if !audio.exists() {
            return Err(LegendaError::AudioExtraction(
                "Output file was not created".to_string(),
            ));
        }

        info!("Audio file created: {}", audio.display());
        Ok(())
    }
}

/// Get audio duration using FFprobe.
pub fn get_audio_duration(input: &Path) -> Result<Duration> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| LegendaError::AudioExtraction(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        return Err(LegendaError::AudioExtraction(format!(
            "FFprobe failed: {}",
            stderr_tail(&output.stderr)
        )));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration_secs: f64 = duration_str.trim().parse().map_err(|e| {
        LegendaError::AudioExtraction(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })?;

    Ok(Duration::from_secs_f64(duration_secs.max(0.0)))
}

/// Extract the audio between `start` and `end` into a new MP3.
pub fn extract_audio_segment(
    input: &Path,
    output: &Path,
    start: Duration,
    end: Duration,
) -> Result<()> {
    let duration = end.saturating_sub(start);
    if duration.is_zero() {
        return Err(LegendaError::AudioExtraction(
            "Segment duration is zero".to_string(),
        ));
    }

    let start_secs = format!("{:.3}", start.as_secs_f64());
    let duration_secs = format!("{:.3}", duration.as_secs_f64());

    debug!(
        "Extracting segment: start={}, duration={}",
        start_secs, duration_secs
    );

    let result = Command::new("ffmpeg")
        .args(["-y", "-hide_banner", "-loglevel", "error", "-ss"])
        .arg(&start_secs)
        .arg("-t")
        .arg(&duration_secs)
        .arg("-i")
        .arg(input)
        .args(SPEECH_MP3_ARGS)
        .arg(output)
        .output()
        .map_err(|e| LegendaError::AudioExtraction(format!("Failed to run FFmpeg: {e}")))?;

    if !result.status.success() {
        return Err(LegendaError::AudioExtraction(format!(
            "FFmpeg segment extraction failed: {}",
            stderr_tail(&result.stderr)
        )));
    }

    Ok(())
}

/// Decode any audio file to mono 16 kHz `f32` samples by piping FFmpeg's
/// raw output.
pub fn decode_pcm_f32(input: &Path) -> Result<Vec<f32>> {
    debug!("Decoding {} to 16 kHz mono PCM", input.display());

    let sample_rate = WHISPER_SAMPLE_RATE.to_string();
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-i"])
        .arg(input)
        .args(["-ar", sample_rate.as_str(), "-ac", "1", "-f", "f32le", "-"])
        .output()
        .map_err(|e| LegendaError::AudioExtraction(format!("Failed to run FFmpeg: {e}")))?;

    if !output.status.success() {
        return Err(LegendaError::AudioExtraction(format!(
            "FFmpeg decode failed: {}",
            stderr_tail(&output.stderr)
        )));
    }

    Ok(samples_from_le_bytes(&output.stdout))
}

fn samples_from_le_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(5)..].join("\n")
}
