use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use forgesteel_converter::app::{self, ConvertRequest};
use forgesteel_converter::compendium::ItemType;
use forgesteel_converter::config::Config;
use forgesteel_converter::error::ConverterError;
use forgesteel_converter::logging;
use forgesteel_converter::sources::{self, AcquireOptions};

#[derive(Parser)]
#[command(name = "forgesteel_converter")]
#[command(about = "Convert Forge Steel heroes into Draw Steel actors for Foundry VTT")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./forgesteel.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// Local pack-source directory to read the compendium from
    #[arg(long)]
    compendium: Option<PathBuf>,

    /// Ignore the cached compendium snapshot (it is still refreshed)
    #[arg(long)]
    refresh_cache: bool,

    /// Never contact the remote repository
    #[arg(long)]
    offline: bool,
}

impl From<&SourceArgs> for AcquireOptions {
    fn from(args: &SourceArgs) -> Self {
        AcquireOptions {
            local_hint: args.compendium.clone(),
            refresh_cache: args.refresh_cache,
            offline: args.offline,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a .ds-hero file into an actor document
    Convert {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        source: SourceArgs,
        /// Abort on the first reference missing from the compendium
        #[arg(long)]
        strict: bool,
    },
    /// Acquire the compendium and warm the cache
    Fetch {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Resolve one name against the compendium
    Resolve {
        name: String,
        /// Declared item type (ability, ancestry, culture, ...)
        #[arg(long = "type")]
        item_type: Option<ItemType>,
        #[command(flatten)]
        source: SourceArgs,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, ConverterError> {
    match path {
        Some(path) => Config::load_from(path, true),
        None => Config::load(),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Convert {
            input,
            output,
            source,
            strict,
        } => {
            let request = ConvertRequest {
                input,
                output: output.clone(),
                strict: strict || config.resolution.strict,
            };
            let run = app::convert_with_config(&config, &AcquireOptions::from(&source), &request)?;
            info!(
                provider = %run.provider,
                items = run.indexed_items,
                "compendium used for conversion"
            );
            println!("{}", run.report);
            println!("\nWrote {}", output.display());
        }
        Commands::Fetch { source } => {
            let compendium = app::load_compendium(&sources::build_chain(
                &config,
                &AcquireOptions::from(&source),
            ))?;
            println!(
                "Acquired {} items from {} source",
                compendium.index.len(),
                compendium.provider
            );
            for (item_type, count) in compendium.index.type_counts() {
                println!("  {:<13} {}", item_type, count);
            }
            if !compendium.index.rejected().is_empty() {
                println!("  dropped {} malformed records", compendium.index.rejected().len());
            }
        }
        Commands::Resolve {
            name,
            item_type,
            source,
        } => {
            let compendium = app::load_compendium(&sources::build_chain(
                &config,
                &AcquireOptions::from(&source),
            ))?;
            println!("{}", app::describe_resolution(&compendium.index, &name, item_type));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = logging::init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Console layer writes to stderr
            error!("{:#}", e);
            if let Some(ConverterError::Acquisition(acq)) = e.downcast_ref::<ConverterError>() {
                if acq.is_retryable() {
                    eprintln!("The compendium could not be fetched right now; try again later or pass --compendium <path>.");
                }
            }
            ExitCode::FAILURE
        }
    }
}
