//! voxgrid - build SATB training data from folders of MIDI files
//!
//! Subcommands:
//! - `voxgrid check -i IN [-o OUT]` - Report voices per file, keep four-part ones
//! - `voxgrid split -i IN -o OUT` - Cut pieces into excerpts
//! - `voxgrid sets -i IN -o OUT` - Shuffle files into train/test/valid
//! - `voxgrid reduce -i IN -o OUT` - Rewrite files as chord-reduced voices
//! - `voxgrid build --train .. --test .. --valid .. -o FILE` - Write the dataset
//! - `voxgrid convert -i IN -o OUT` - All of the above in one go

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use voxconf::VoxConfig;

mod commands;
mod report;
mod settings;

use settings::{Overrides, Settings};

#[derive(Parser)]
#[command(name = "voxgrid")]
#[command(about = "SATB voice classification and training data for multi-track MIDI")]
#[command(version)]
struct Cli {
    /// Config file replacing ./voxgrid.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse files and copy the ones with exactly the requested voices
    Check {
        /// Directory of MIDI files
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for accepted files; report only when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Cut every file into excerpts named <name>_<i>.mid
    Split {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Shuffle files into train/, test/ and valid/
    Sets {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rewrite files as chord-reduced voices named <name>_reduced.mid
    Reduce {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Encode the set directories into a dataset JSON file
    Build {
        #[arg(long)]
        train: PathBuf,

        #[arg(long)]
        test: PathBuf,

        #[arg(long)]
        valid: PathBuf,

        /// Dataset file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Filter, split, shuffle and build in one go
    Convert {
        /// Directory of MIDI files, usually named after the composer
        #[arg(short, long)]
        input: PathBuf,

        /// Directory receiving <input name>/ with every stage
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = VoxConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.overrides.apply(&mut config);

    init_tracing(&config.telemetry.log_level);
    debug!(
        files = ?sources.files,
        env = ?sources.env_overrides,
        "loaded configuration"
    );

    if matches!(cli.command, Commands::Config) {
        print!("{}", config.to_toml());
        return Ok(());
    }

    let settings = Settings::resolve(&config, cli.no_color)?;

    match cli.command {
        Commands::Check { input, output } => {
            commands::check(&input, output.as_deref(), &settings)?;
        }
        Commands::Split { input, output } => {
            commands::split(&input, &output, &settings)?;
        }
        Commands::Sets { input, output } => {
            commands::sets(&input, &output, &settings)?;
        }
        Commands::Reduce { input, output } => {
            commands::reduce(&input, &output, &settings)?;
        }
        Commands::Build {
            train,
            test,
            valid,
            output,
        } => {
            commands::build(&train, &test, &valid, &output, &settings)?;
        }
        Commands::Convert { input, output } => {
            commands::convert(&input, &output, &settings)?;
        }
        Commands::Config => {}
    }

    Ok(())
}
