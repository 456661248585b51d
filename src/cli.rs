//! Command line entry points.
use crate::conversion::convert_baseline;
use crate::costs::apply_baseline_costs;
use crate::input::load_model;
use crate::log;
use crate::output::{create_output_directory, get_output_dir};
use crate::settings::Settings;
use crate::simulation::{self, optimisation::HighsOptimiser};
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// Myopic capacity expansion of a power system, one year at a time.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Print the documentation for all commands in markdown format
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options shared by `run` and `example run`
#[derive(Args, Default)]
pub struct RunOpts {
    /// Write results here instead of `myopic_results/<model name>`
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Replace the contents of a non-empty output directory
    #[arg(long)]
    pub overwrite: bool,
    /// Also write per-snapshot dispatch results
    #[arg(long)]
    pub debug_model: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a model from its start year to its end year.
    Run {
        /// Directory containing the model's input files.
        model_dir: PathBuf,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// List, inspect, extract or run the bundled demo models.
    Example {
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Check a model's input files without simulating it.
    Validate {
        /// Directory containing the model's input files.
        model_dir: PathBuf,
    },
    /// Show, edit or generate the settings file.
    Settings {
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

/// Parse the command line and dispatch to the matching handler
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    match cli.command {
        None => println!("{}", Cli::command().render_long_help()),
        Some(Commands::Run { model_dir, opts }) => handle_run_command(&model_dir, &opts, None)?,
        Some(Commands::Example { subcommand }) => subcommand.execute()?,
        Some(Commands::Validate { model_dir }) => handle_validate_command(&model_dir, None)?,
        Some(Commands::Settings { subcommand }) => subcommand.execute()?,
    }

    Ok(())
}

fn settings_or_load(settings: Option<Settings>) -> Result<Settings> {
    settings.map_or_else(
        || Settings::load().context("Failed to load settings."),
        Ok,
    )
}

/// Set up logging unless a logger is already running (e.g. several runs in one process)
fn start_logging(settings: &Settings, log_dir: Option<&Path>) -> Result<()> {
    if log::is_logger_initialised() {
        return Ok(());
    }

    log::init(Some(&settings.log_level), log_dir).context("Failed to initialise logging.")
}

/// Handle the `run` command.
///
/// Command-line flags can switch on `overwrite` and `debug_model` but never switch them off.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = settings_or_load(settings)?;
    settings.overwrite |= opts.overwrite;
    settings.debug_model |= opts.debug_model;

    let output_path = match &opts.output_dir {
        Some(path) => path.clone(),
        None => get_output_dir(model_path)?,
    };
    let replaced = create_output_directory(&output_path, settings.overwrite).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;

    start_logging(&settings, Some(&output_path))?;
    if replaced {
        warn!("Previous contents of {} were removed", output_path.display());
    }

    let model = load_model(model_path).context("Failed to load model.")?;
    info!(
        "Loaded model from {} ({}-{})",
        model_path.display(),
        model.parameters.start_year,
        model.parameters.end_year
    );
    info!("Writing results to {}", output_path.display());

    simulation::run(&model, &mut HighsOptimiser, &output_path, settings.debug_model)?;
    info!("Simulation complete!");

    Ok(())
}

/// Handle the `validate` command.
///
/// Besides reading every input file, this performs baseline conversion and costing, which is where
/// cross-file references (e.g. a retirement naming an unknown asset) are resolved.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = settings_or_load(settings)?;
    start_logging(&settings, None)?;

    let check = || -> Result<()> {
        let model = load_model(model_path)?;
        let mut system = convert_baseline(&model)?;
        apply_baseline_costs(&mut system, &model)
    };
    check().context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}
