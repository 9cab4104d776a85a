use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use audio_etl::{AudioConfig, AudioPipeline, FrameGeometry, ItemReport};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "etl_audio",
    about = "Inspect audio ETL configs and extract feature buffers from WAV files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved frame geometry and output size for a config
    Describe {
        #[arg(long)]
        config: PathBuf,
    },
    /// Print the augmentation params drawn for a range of item indices
    Params {
        #[arg(long)]
        config: PathBuf,
        #[arg(long, default_value_t = 1)]
        count: u64,
        #[arg(long, default_value_t = 0)]
        start: u64,
    },
    /// Run one WAV file through the pipeline
    Extract {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 0)]
        index: u64,
        /// Write the raw destination buffer here
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Describe { config } => run_describe(&config),
        Commands::Params {
            config,
            count,
            start,
        } => run_params(&config, start, count),
        Commands::Extract {
            config,
            input,
            index,
            output,
        } => run_extract(&config, &input, index, output),
    }
}

fn load_pipeline(path: &Path) -> Result<AudioPipeline> {
    let config = AudioConfig::load_from_file(path)
        .with_context(|| format!("loading config {}", path.display()))?;
    AudioPipeline::new(config).with_context(|| format!("building pipeline for {}", path.display()))
}

#[derive(Serialize)]
struct DescribePayload<'a> {
    config: &'a AudioConfig,
    geometry: &'a FrameGeometry,
    output_bytes: usize,
}

fn run_describe(config_path: &Path) -> Result<ExitCode> {
    let pipeline = load_pipeline(config_path)?;
    let payload = DescribePayload {
        config: pipeline.config(),
        geometry: pipeline.geometry(),
        output_bytes: pipeline.output_bytes(),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(ExitCode::from(0))
}

fn run_params(config_path: &Path, start: u64, count: u64) -> Result<ExitCode> {
    let pipeline = load_pipeline(config_path)?;
    for item_index in start..start.saturating_add(count) {
        let report = ParamsLine {
            item_index,
            params: pipeline.params(item_index),
        };
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct ParamsLine {
    item_index: u64,
    params: audio_etl::AugmentationParams,
}

fn run_extract(
    config_path: &Path,
    input: &Path,
    index: u64,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let pipeline = load_pipeline(config_path)?;
    let encoded = fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let mut buffer = vec![0u8; pipeline.output_bytes()];
    let report = pipeline
        .process(index, &encoded, &mut buffer)
        .with_context(|| format!("processing {}", input.display()))?;

    if let Some(path) = &output {
        fs::write(path, &buffer).with_context(|| format!("writing {}", path.display()))?;
    }

    emit_report(&report, pipeline.geometry(), output.as_deref())?;
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct ExtractPayload<'a> {
    #[serde(flatten)]
    report: &'a ItemReport,
    time_steps: usize,
    freq_steps: usize,
    output: Option<String>,
}

fn emit_report(report: &ItemReport, geometry: &FrameGeometry, output: Option<&Path>) -> Result<()> {
    let payload = ExtractPayload {
        report,
        time_steps: geometry.time_steps,
        freq_steps: geometry.freq_steps,
        output: output.map(|path| path.display().to_string()),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
