// SRT subtitle format
use super::SubtitleFormatter;
use crate::transcribe::Segment;
use std::fmt::Write;
use std::time::Duration;

pub struct SrtFormatter;

impl SubtitleFormatter for SrtFormatter {
    fn format(&self, segments: &[Segment]) -> String {
        let mut output = String::new();
        for (i, segment) in segments.iter().enumerate() {
            // Writing to a String cannot fail.
            let _ = write!(
                output,
                "{}\n{} --> {}\n{}\n\n",
                i + 1,
                format_timestamp(segment.start),
                format_timestamp(segment.end),
                segment.text
            );
        }
        output
    }

    fn extension(&self) -> &'static str {
        "srt"
    }
}

/// `HH:MM:SS,mmm`; hours grow past two digits when needed.
pub fn format_timestamp(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = d.subsec_millis();
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}
