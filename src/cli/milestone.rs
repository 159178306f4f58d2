//! Milestone CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::domain::{
    add_milestone_with_tracking, remove_milestone_with_tracking, rename_milestone_with_tracking,
    HistoryOptions, MilestoneId, Tracked,
};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum MilestoneCommands {
    /// Add a milestone
    Add {
        /// Milestone name
        name: String,
    },

    /// List all milestones
    List,

    /// Rename a milestone
    Rename {
        /// Milestone ID
        id: String,

        /// New name
        name: String,
    },

    /// Remove a milestone and all its tasks
    Remove {
        /// Milestone ID
        id: String,
    },
}

pub fn run(cmd: MilestoneCommands, output: &Output) -> Result<()> {
    match cmd {
        MilestoneCommands::Add { name } => add_milestone(output, &name),
        MilestoneCommands::List => list_milestones(output),
        MilestoneCommands::Rename { id, name } => rename_milestone(output, &id, &name),
        MilestoneCommands::Remove { id } => remove_milestone(output, &id),
    }
}

fn history_options(project: &Project) -> HistoryOptions {
    HistoryOptions {
        user: project.config().project.effective_user(),
    }
}

fn persist(project: &Project, tracked: &Tracked) -> Result<()> {
    project.milestone_store().write_all(&tracked.milestones)?;
    project.history_store().append_all(&tracked.changes)?;
    Ok(())
}

fn add_milestone(output: &Output, name: &str) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    let tracked = add_milestone_with_tracking(&milestones, name, &history_options(&project));
    persist(&project, &tracked)?;

    let added = tracked
        .milestones
        .last()
        .ok_or_else(|| anyhow::anyhow!("Milestone was not created"))?;

    if output.is_json() {
        output.data(&added);
    } else {
        output.success(&format!(
            "Created milestone: {} - {}",
            added.milestone_id, added.milestone_name
        ));
    }

    Ok(())
}

fn list_milestones(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    if output.is_json() {
        output.data(&milestones);
    } else if milestones.is_empty() {
        println!("No milestones");
    } else {
        println!("{:<24} {:<12} {:<12} {:<6} NAME", "ID", "START", "END", "TASKS");
        println!("{}", "-".repeat(80));

        for milestone in &milestones {
            let start = milestone
                .start_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            let end = milestone
                .end_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<24} {:<12} {:<12} {:<6} {}",
                milestone.milestone_id,
                start,
                end,
                milestone.tasks.len(),
                milestone.milestone_name
            );
        }
    }

    Ok(())
}

fn rename_milestone(output: &Output, id_str: &str, name: &str) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    let id: MilestoneId = id_str.parse()?;
    if crate::domain::find_milestone(&milestones, &id).is_none() {
        anyhow::bail!("Milestone not found: {}", id);
    }

    let tracked =
        rename_milestone_with_tracking(&milestones, &id, name, &history_options(&project));
    persist(&project, &tracked)?;

    if tracked.is_noop() {
        output.success(&format!("Milestone {} already named \"{}\"", id, name));
    } else {
        output.success(&format!("Renamed milestone {} to \"{}\"", id, name));
    }

    Ok(())
}

fn remove_milestone(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    let id: MilestoneId = id_str.parse()?;
    let Some(milestone) = crate::domain::find_milestone(&milestones, &id) else {
        anyhow::bail!("Milestone not found: {}", id);
    };
    let task_count = milestone.tasks.len();

    let tracked = remove_milestone_with_tracking(&milestones, &id, &history_options(&project));
    persist(&project, &tracked)?;

    output.success(&format!(
        "Removed milestone {} ({} task(s))",
        id, task_count
    ));

    Ok(())
}
