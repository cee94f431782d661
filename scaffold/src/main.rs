//! `create-kawkab-app`: scaffold a new project from the bundled template.
//!
//! Copies the template into `<cwd>/<name>`, verifies the package tool is
//! installed, and runs its install command in the new project. The exit code
//! identifies the stage that failed (see `exit_codes`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scaffold::exit_codes;
use scaffold::io::config::{ScaffoldConfig, load_config};
use scaffold::io::process::SystemCommandRunner;
use scaffold::logging;
use scaffold::report::ConsoleReporter;
use scaffold::workflow::{ScaffoldWorkflow, WorkflowSettings};

#[derive(Parser)]
#[command(
    name = "create-kawkab-app",
    version,
    about = "Scaffold a new Kawkab project and install its dependencies"
)]
struct Cli {
    /// TOML config file. Defaults apply when omitted or missing.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new project with the specified name.
    Init {
        /// Project name; also the directory created under the current directory.
        name: String,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ScaffoldConfig::default(),
    };
    match cli.command {
        Command::Init { name } => cmd_init(&config, &name),
    }
}

fn cmd_init(config: &ScaffoldConfig, name: &str) -> Result<i32> {
    let cwd = std::env::current_dir().context("resolve current directory")?;
    let settings = WorkflowSettings::from_config(config, config.resolve_template_dir());
    let mut reporter = ConsoleReporter::new(&settings.tool);
    let workflow = ScaffoldWorkflow::new(settings, SystemCommandRunner);

    let result = workflow.run(name, &cwd, &mut reporter);
    Ok(exit_codes::for_result(&result))
}
