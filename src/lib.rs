pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod subtitle;
pub mod transcribe;
pub mod translate;

pub use config::Config;
pub use error::{LegendaError, Result};
pub use pipeline::{
    print_summary, Pipeline, PipelineConfig, PipelineOutcome, PipelineReport, PipelineStats,
};
