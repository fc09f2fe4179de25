pub mod srt;

pub use srt::{format_timestamp, SrtFormatter};

use crate::error::Result;
use crate::transcribe::Segment;
use std::path::{Path, PathBuf};
use tracing::info;

pub trait SubtitleFormatter {
    fn format(&self, segments: &[Segment]) -> String;
    fn extension(&self) -> &'static str;
}

/// `<basename>.<language>.srt` next to the video.
pub fn subtitle_path(video: &Path, language: &str) -> PathBuf {
    let stem = video.file_stem().unwrap_or_default().to_string_lossy();
    video.with_file_name(format!("{}.{}.{}", stem, language, SrtFormatter.extension()))
}

/// Render `segments` as SubRip and write them UTF-8 encoded to `path`.
pub fn write_subtitles(path: &Path, segments: &[Segment]) -> Result<()> {
    std::fs::write(path, SrtFormatter.format(segments))?;
    info!("Wrote {} cues to {}", segments.len(), path.display());
    Ok(())
}
