pub mod chunk;
pub mod extract;

pub use chunk::{chunk_duration_for, create_chunks, plan_chunks, AudioChunk};
pub use extract::{
    audio_path_for, check_ffmpeg, decode_pcm_f32, extract_audio_segment, get_audio_duration,
    AudioExtractor, FfmpegExtractor,
};

/// Sample rate Whisper models expect.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;
