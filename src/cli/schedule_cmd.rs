//! Schedule and validate commands

use anyhow::Result;
use chrono::NaiveDate;

use super::output::Output;
use crate::domain::{compute_schedule, validate_dependencies, ScheduleOptions};
use crate::storage::Project;

/// Recomputes every task's dates from durations and dependencies
pub fn schedule(
    output: &Output,
    start: Option<NaiveDate>,
    preserve_manual_dates: bool,
    no_auto_sequence: bool,
) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    // Refuse to schedule a structurally broken plan
    let report = validate_dependencies(&milestones);
    if !report.is_valid {
        for error in &report.errors {
            output.verbose_ctx("validate", error);
        }
        anyhow::bail!(
            "Cannot schedule: {} validation error(s). Run 'gantt validate' for details.",
            report.errors.len()
        );
    }

    let config = &project.config().project;
    let project_start = start.unwrap_or(config.project_start);
    let options = ScheduleOptions {
        preserve_manual_dates: preserve_manual_dates || config.preserve_manual_dates,
        auto_sequence: !no_auto_sequence && config.auto_sequence,
    };

    output.verbose_ctx(
        "schedule",
        &format!(
            "Scheduling from {} (preserve_manual_dates={}, auto_sequence={})",
            project_start, options.preserve_manual_dates, options.auto_sequence
        ),
    );

    let scheduled = compute_schedule(&milestones, project_start, &options)?;
    project.milestone_store().write_all(&scheduled)?;

    if output.is_json() {
        output.data(&scheduled);
        return Ok(());
    }

    let task_count: usize = scheduled.iter().map(|m| m.tasks.len()).sum();
    output.success(&format!(
        "Scheduled {} task(s) across {} milestone(s)",
        task_count,
        scheduled.len()
    ));
    output.blank();

    for milestone in &scheduled {
        let range = match (milestone.start_date, milestone.end_date) {
            (Some(start), Some(end)) => format!("{} to {}", start, end),
            _ => "no tasks".to_string(),
        };
        println!("{} ({})", milestone.milestone_name, range);

        for task in &milestone.tasks {
            if let (Some(start), Some(end)) = (task.start_date, task.end_date) {
                println!("  {:<12} {:<12} {}", start.to_string(), end.to_string(), task.name);
            }
        }
    }

    Ok(())
}

/// Checks the dependency structure and reports errors and warnings
pub fn validate(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    let report = validate_dependencies(&milestones);

    if output.is_json() {
        output.data(&report);
    } else {
        if report.errors.is_empty() && report.warnings.is_empty() {
            println!("Plan is valid");
        }
        for error in &report.errors {
            println!("error: {}", error);
        }
        for warning in &report.warnings {
            println!("warning: {}", warning);
        }
    }

    if !report.is_valid {
        anyhow::bail!("Validation failed with {} error(s)", report.errors.len());
    }

    Ok(())
}
