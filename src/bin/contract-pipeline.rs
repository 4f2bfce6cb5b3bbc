use clap::{Parser, Subcommand};
use contract_pipeline::{
    config::{self, PipelineConfig},
    normalizer::SourceNormalizer,
    Error, SandboxMode,
};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print contract source as the sandbox will receive it
    Normalize {
        /// Contract source file
        source: PathBuf,

        /// Sandbox mode; defaults to the configured one
        #[arg(short, long)]
        mode: Option<SandboxMode>,
    },
}

fn run(cli: &Cli) -> Result<(), Error> {
    let config: PipelineConfig = match &cli.config {
        Some(path) => config::from_file(path)?,
        None => PipelineConfig::default(),
    };
    info!("config loaded.");
    debug!("config: {:?}", config);

    match &cli.command {
        Command::Normalize { source, mode } => {
            let text = std::fs::read_to_string(source).map_err(|e| {
                contract_pipeline::ConfigurationError::Invalid(format!(
                    "Failed to read {}: {}",
                    source.display(),
                    e
                ))
            })?;
            let normalizer = SourceNormalizer::new(config.sandbox.bindings.clone())?;
            let mode = mode.unwrap_or(config.sandbox.mode);
            debug!("normalizing {:?} for {} sandbox", source, mode);
            print!("{}", normalizer.normalize(&text, mode));
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
