//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{history_cmd, milestone, schedule_cmd, task};
use crate::storage::{self, Config, Project};

#[derive(Parser)]
#[command(name = "gantt")]
#[command(author, version, about = "Local-first project timeline tool")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the configured format)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new gantt project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// First day of the project timeline (defaults to today)
        #[arg(long)]
        start: Option<chrono::NaiveDate>,
    },

    /// Manage milestones
    #[command(subcommand)]
    Milestone(milestone::MilestoneCommands),

    /// Manage tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Compute start and end dates for every task
    Schedule {
        /// Override the configured project start for this run
        #[arg(long)]
        start: Option<chrono::NaiveDate>,

        /// Keep tasks that already have both dates
        #[arg(long)]
        preserve_manual_dates: bool,

        /// Do not chain milestones onto each other
        #[arg(long)]
        no_auto_sequence: bool,
    },

    /// Check the dependency structure for problems
    Validate,

    /// Inspect and roll back the change ledger
    #[command(subcommand)]
    History(history_cmd::HistoryCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format.unwrap_or_else(default_format), cli.verbose);

    output.verbose("Gantt CLI starting");

    match cli.command {
        Commands::Init { path, start } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path));
            let mut project = Project::init(&path)?;
            if let Some(start) = start {
                project.config_mut().project.project_start = start;
                project.config().save_project()?;
            }
            output.success(&format!(
                "Initialized gantt project at {}",
                project.root().display()
            ));
        }

        Commands::Milestone(cmd) => milestone::run(cmd, &output)?,
        Commands::Task(cmd) => task::run(cmd, &output)?,

        Commands::Schedule {
            start,
            preserve_manual_dates,
            no_auto_sequence,
        } => schedule_cmd::schedule(&output, start, preserve_manual_dates, no_auto_sequence)?,

        Commands::Validate => schedule_cmd::validate(&output)?,

        Commands::History(cmd) => history_cmd::run(cmd, &output)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}

/// Picks the configured default format when --format is not given
fn default_format() -> OutputFormat {
    match Config::load() {
        Ok(config) => match config.global.default_format {
            storage::OutputFormat::Text => OutputFormat::Text,
            storage::OutputFormat::Json => OutputFormat::Json,
        },
        Err(_) => OutputFormat::Text,
    }
}
