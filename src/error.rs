use thiserror::Error;

#[derive(Error, Debug)]
pub enum LegendaError {
    #[error("Audio extraction failed: {0}")]
    AudioExtraction(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Missing dependency: {0}")]
    DependencyMissing(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LegendaError {
    /// Errors raised before any temporary file exists.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            LegendaError::FileNotFound(_) | LegendaError::DependencyMissing(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LegendaError>;
