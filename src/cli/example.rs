//! Demo models compiled into the binary and the `example` subcommands which use them.
use super::{RunOpts, handle_run_command};
use crate::settings::Settings;
use anyhow::{Context, Result, bail, ensure};
use clap::Subcommand;
use include_dir::{Dir, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

static DEMOS: Dir = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// Each demo directory carries a description in this file
const DEMO_README: &str = "README.txt";

/// Subcommands of `example`
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List the names of the bundled demo models.
    List,
    /// Print the description of a demo model.
    Info {
        /// Demo name, as printed by `example list`.
        name: String,
    },
    /// Copy a demo model's input files into a new directory.
    Extract {
        /// Demo name, as printed by `example list`.
        name: String,
        /// Where to put the files (defaults to a directory named after the demo).
        new_path: Option<PathBuf>,
    },
    /// Run a demo model without extracting it first.
    Run {
        /// Demo name, as printed by `example list`.
        name: String,
        #[command(flatten)]
        opts: RunOpts,
    },
}

impl ExampleSubcommands {
    /// Carry out the subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => {
                for name in demo_names() {
                    println!("{name}");
                }
            }
            Self::Info { name } => println!("{}", demo_readme(&name)?),
            Self::Extract { name, new_path } => {
                let dest = new_path.unwrap_or_else(|| PathBuf::from(&name));
                extract_demo(&name, &dest)?;
            }
            Self::Run { name, opts } => handle_example_run_command(&name, &opts, None)?,
        }

        Ok(())
    }
}

fn demo_names() -> impl Iterator<Item = String> {
    DEMOS
        .dirs()
        .filter_map(|dir| dir.path().file_name())
        .map(|name| name.to_string_lossy().into_owned())
}

fn find_demo(name: &str) -> Result<&'static Dir<'static>> {
    DEMOS.get_dir(name).context("Example not found.")
}

fn demo_readme(name: &str) -> Result<&'static str> {
    let demo = find_demo(name)?;
    demo.get_file(demo.path().join(DEMO_README))
        .with_context(|| format!("Example {name} has no {DEMO_README}"))?
        .contents_utf8()
        .with_context(|| format!("{DEMO_README} is not valid UTF-8"))
}

/// Write the files of demo `name` to the new directory `dest`
fn extract_demo(name: &str, dest: &Path) -> Result<()> {
    let demo = find_demo(name)?;
    ensure!(
        !dest.exists(),
        "Destination directory {} already exists",
        dest.display()
    );
    if demo.dirs().next().is_some() {
        bail!("Example {name} contains subdirectories, which are not supported");
    }

    fs::create_dir_all(dest)?;
    for file in demo.files() {
        let file_name = file.path().file_name().context("Example file has no name")?;
        fs::write(dest.join(file_name), file.contents())?;
    }

    Ok(())
}

/// Handle the `example run` command.
///
/// The demo is written to a temporary directory which is removed once the run finishes. Results go
/// to `opts.output_dir` if given, otherwise to the usual location for a model named `name`.
pub fn handle_example_run_command(
    name: &str,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let scratch = TempDir::new().context("Failed to create temporary directory.")?;
    let model_path = scratch.path().join(name);
    extract_demo(name, &model_path)?;

    handle_run_command(&model_path, opts, settings)
}
