use anyhow::{Context, Result};
use clap::Parser;
use legenda::audio::{audio_path_for, FfmpegExtractor};
use legenda::config::{Config, Provider, TranslatorKind};
use legenda::pipeline::remove_temp_audio;
use legenda::transcribe::create_transcriber;
use legenda::translate::create_translator;
use legenda::{print_summary, LegendaError, Pipeline, PipelineConfig, PipelineOutcome};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Exit status for usage errors and failed pre-flight checks.
const EXIT_PREFLIGHT: u8 = 1;

/// Exit status for runs where a phase failed after pre-flight checks passed.
const EXIT_PHASE_FAILURE: u8 = 2;

const USAGE: &str = "Usage: legenda [OPTIONS] <VIDEO>...";

#[derive(Parser)]
#[command(name = "legenda")]
#[command(version, about = "Generate English and Brazilian Portuguese subtitles for a video")]
#[command(long_about = "Extracts the audio of a video, transcribes it with Whisper, writes \
<name>.en.srt, translates every cue and writes <name>.pt-BR.srt next to the video.")]
struct Cli {
    /// Input video file; extra words are joined with spaces
    #[arg(num_args = 0.., trailing_var_arg = true)]
    video: Vec<String>,

    /// Transcription provider: local, openai
    #[arg(short, long)]
    provider: Option<String>,

    /// Translation backend: google, gemini
    #[arg(short, long)]
    translator: Option<String>,

    /// ggml Whisper model for the local provider
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Inference threads for the local provider
    #[arg(long)]
    threads: Option<usize>,

    /// Number of concurrent translation requests
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Spoken language code
    #[arg(long)]
    source: Option<String>,

    /// Translation target language code
    #[arg(long)]
    target: Option<String>,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Rejoin a path that the shell split on spaces.
fn video_path(words: &[String]) -> Option<PathBuf> {
    if words.is_empty() {
        None
    } else {
        Some(PathBuf::from(words.join(" ")))
    }
}

fn apply_cli(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(ref provider) = cli.provider {
        config.provider = provider
            .parse::<Provider>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(ref translator) = cli.translator {
        config.translator = translator
            .parse::<TranslatorKind>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(ref model) = cli.model {
        config.model_path = model.clone();
    }
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(ref source) = cli.source {
        config.source_language = source.clone();
    }
    if let Some(ref target) = cli.target {
        config.target_language = target.clone();
    }
    Ok(())
}

/// Remove the temporary audio if the user interrupts the run.
fn install_interrupt_cleanup(audio: PathBuf) {
    let result = ctrlc::set_handler(move || {
        warn!("Interrupted");
        remove_temp_audio(&audio);
        std::process::exit(130);
    });
    if let Err(e) = result {
        warn!("Could not install Ctrl+C handler: {}", e);
    }
}

/// Process exit status for the result of a run.
///
/// Segments that fell back to their source text still count as success.
fn exit_status(result: &legenda::Result<PipelineOutcome>) -> u8 {
    match result {
        Ok(PipelineOutcome::Completed(_)) => 0,
        Ok(PipelineOutcome::Failed(_)) => EXIT_PHASE_FAILURE,
        Err(_) => EXIT_PREFLIGHT,
    }
}

fn usage() -> ExitCode {
    println!("{USAGE}");
    ExitCode::from(EXIT_PREFLIGHT)
}

/// Report the result and turn it into the process exit code.
fn finish(result: legenda::Result<PipelineOutcome>) -> ExitCode {
    match &result {
        Ok(PipelineOutcome::Completed(report)) => print_summary(report),
        // Already logged with its cause chain by the pipeline.
        Ok(PipelineOutcome::Failed(_)) => {}
        Err(e) => error!("{}", e),
    }
    ExitCode::from(exit_status(&result))
}

async fn run(cli: &Cli, video: &Path) -> Result<ExitCode> {
    if !video.is_file() {
        return Ok(finish(Err(LegendaError::FileNotFound(
            video.display().to_string(),
        ))));
    }

    let mut config = Config::load().context("Failed to load configuration")?;
    apply_cli(&mut config, cli)?;
    config.validate().context("Configuration validation failed")?;

    info!("Input:       {}", video.display());
    info!("Provider:    {}", config.provider);
    info!("Translator:  {}", config.translator);
    info!(
        "Languages:   {} -> {}",
        config.source_language, config.target_language
    );
    if config.provider == Provider::Local {
        info!("Model:       {}", config.model_path.display());
        info!("Threads:     {}", config.threads);
    }

    let transcriber = create_transcriber(&config)?;
    let translator = create_translator(&config)?;
    let pipeline_config = PipelineConfig {
        show_progress: !cli.no_progress,
        ..PipelineConfig::from(&config)
    };
    let pipeline = Pipeline::new(
        Box::new(FfmpegExtractor),
        transcriber,
        translator,
        pipeline_config,
    );

    install_interrupt_cleanup(audio_path_for(video));

    Ok(finish(pipeline.run(video).await))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let Some(video) = video_path(&cli.video) else {
        return usage();
    };

    match run(&cli, &video).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_PREFLIGHT)
        }
    }
}
