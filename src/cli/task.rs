//! Task CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::domain::{
    add_task_with_tracking, clone_task_with_tracking, find_task, move_task_with_tracking,
    remove_task_with_tracking, split_task_with_tracking, update_task_with_tracking,
    HistoryOptions, MilestoneId, NewTask, SplitPart, Task, TaskId, TaskUpdate, Tracked,
};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task to a milestone
    Add {
        /// Milestone ID
        milestone: String,

        /// Task name
        name: String,

        /// Working days the task takes
        #[arg(long, short = 'd', default_value = "1")]
        duration: u32,

        /// Task description
        #[arg(long, default_value = "")]
        description: String,

        /// Owning team
        #[arg(long, default_value = "")]
        team: String,

        /// Sprint label
        #[arg(long)]
        sprint: Option<String>,

        /// Task IDs this task depends on (repeatable)
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
    },

    /// List tasks (all, or for one milestone)
    List {
        /// Milestone ID (omit for all tasks)
        milestone: Option<String>,
    },

    /// Show task details
    Show {
        /// Task ID
        id: String,
    },

    /// Update task fields
    Update {
        /// Task ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New owning team
        #[arg(long)]
        team: Option<String>,

        /// New duration in working days
        #[arg(long, short = 'd')]
        duration: Option<u32>,

        /// Replace the dependency list (repeatable, use once with no value to clear)
        #[arg(long = "depends-on", num_args = 0..)]
        depends_on: Option<Vec<String>>,
    },

    /// Remove a task
    Remove {
        /// Task ID
        id: String,
    },

    /// Move a task to another milestone
    Move {
        /// Task ID
        id: String,

        /// Source milestone ID
        from: String,

        /// Destination milestone ID
        to: String,
    },

    /// Copy a task into a milestone under a fresh ID
    Clone {
        /// Task ID
        id: String,

        /// Destination milestone ID
        target: String,

        /// Carry the original's dependencies over
        #[arg(long)]
        copy_dependencies: bool,
    },

    /// Split a task into a chain of smaller tasks
    Split {
        /// Task ID
        id: String,

        /// Parts as NAME:DAYS (repeatable, in order)
        #[arg(long = "part", value_name = "NAME:DAYS", required = true)]
        parts: Vec<String>,
    },
}

pub fn run(cmd: TaskCommands, output: &Output) -> Result<()> {
    match cmd {
        TaskCommands::Add {
            milestone,
            name,
            duration,
            description,
            team,
            sprint,
            depends_on,
        } => add_task(
            output,
            &milestone,
            NewTask {
                name,
                description,
                team,
                sprint,
                duration_days: duration,
                depends_on: parse_task_ids(&depends_on)?,
            },
        ),
        TaskCommands::List { milestone } => list_tasks(output, milestone.as_deref()),
        TaskCommands::Show { id } => show_task(output, &id),
        TaskCommands::Update {
            id,
            name,
            description,
            team,
            duration,
            depends_on,
        } => {
            let depends_on = match depends_on {
                Some(ids) => Some(parse_task_ids(&ids)?),
                None => None,
            };
            update_task(
                output,
                &id,
                TaskUpdate {
                    name,
                    description,
                    team,
                    duration_days: duration,
                    depends_on,
                },
            )
        }
        TaskCommands::Remove { id } => remove_task(output, &id),
        TaskCommands::Move { id, from, to } => move_task(output, &id, &from, &to),
        TaskCommands::Clone {
            id,
            target,
            copy_dependencies,
        } => clone_task(output, &id, &target, copy_dependencies),
        TaskCommands::Split { id, parts } => split_task(output, &id, &parts),
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

fn parse_task_ids(ids: &[String]) -> Result<Vec<TaskId>> {
    let mut parsed = Vec::with_capacity(ids.len());
    for id in ids {
        parsed.push(id.parse()?);
    }
    Ok(parsed)
}

fn add_task(output: &Output, milestone_str: &str, spec: NewTask) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    let milestone_id: MilestoneId = milestone_str.parse()?;
    let Some(pos) = milestones
        .iter()
        .position(|m| m.milestone_id == milestone_id)
    else {
        anyhow::bail!("Milestone not found: {}", milestone_id);
    };

    let tracked =
        add_task_with_tracking(&milestones, &milestone_id, spec, &history_options(&project));
    persist(&project, &tracked)?;

    let added = tracked.milestones[pos]
        .tasks
        .last()
        .ok_or_else(|| anyhow::anyhow!("Task was not created"))?;

    if output.is_json() {
        output.data(&added);
    } else {
        output.success(&format!("Created task: {} - {}", added.task_id, added.name));
    }

    Ok(())
}

fn list_tasks(output: &Output, milestone_str: Option<&str>) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    let selected: Vec<_> = match milestone_str {
        Some(s) => {
            let id: MilestoneId = s.parse()?;
            milestones
                .iter()
                .filter(|m| m.milestone_id == id)
                .collect()
        }
        None => milestones.iter().collect(),
    };

    if output.is_json() {
        let tasks: Vec<&Task> = selected.iter().flat_map(|m| m.tasks.iter()).collect();
        output.data(&tasks);
        return Ok(());
    }

    let total: usize = selected.iter().map(|m| m.tasks.len()).sum();
    if total == 0 {
        match milestone_str {
            Some(s) => println!("No tasks in milestone {}", s),
            None => println!("No tasks"),
        }
        return Ok(());
    }

    println!(
        "{:<24} {:<12} {:<12} {:<5} NAME",
        "ID", "START", "END", "DAYS"
    );
    println!("{}", "-".repeat(80));

    for milestone in &selected {
        for task in &milestone.tasks {
            let start = task
                .start_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            let end = task
                .end_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<24} {:<12} {:<12} {:<5} {}",
                task.task_id, start, end, task.duration_days, task.name
            );
        }
    }

    Ok(())
}

fn show_task(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    let id: TaskId = id_str.parse()?;
    let Some((milestone, task)) = find_task(&milestones, &id) else {
        anyhow::bail!("Task not found: {}", id);
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task,
            "milestoneId": milestone.milestone_id,
            "milestoneName": milestone.milestone_name,
        }));
    } else {
        println!("Task: {}", task.name);
        println!("  ID:        {}", task.task_id);
        println!(
            "  Milestone: {} ({})",
            milestone.milestone_name, milestone.milestone_id
        );
        println!("  Duration:  {} day(s)", task.duration_days);
        if !task.team.is_empty() {
            println!("  Team:      {}", task.team);
        }
        if let Some(sprint) = &task.sprint {
            println!("  Sprint:    {}", sprint);
        }
        if let (Some(start), Some(end)) = (task.start_date, task.end_date) {
            println!("  Dates:     {} to {}", start, end);
        }
        if !task.depends_on.is_empty() {
            let deps: Vec<String> = task.depends_on.iter().map(|d| d.to_string()).collect();
            println!("  Depends:   {}", deps.join(", "));
        }
        if !task.description.is_empty() {
            println!("  {}", task.description);
        }
    }

    Ok(())
}

fn update_task(output: &Output, id_str: &str, update: TaskUpdate) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    let id: TaskId = id_str.parse()?;
    if find_task(&milestones, &id).is_none() {
        anyhow::bail!("Task not found: {}", id);
    }

    let tracked = update_task_with_tracking(&milestones, &id, update, &history_options(&project));
    persist(&project, &tracked)?;

    if tracked.is_noop() {
        output.success(&format!("Task {} unchanged", id));
    } else {
        output.success(&format!(
            "Updated task {} ({} change(s))",
            id,
            tracked.changes.len()
        ));
    }

    Ok(())
}

fn remove_task(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    let id: TaskId = id_str.parse()?;
    let Some((_, task)) = find_task(&milestones, &id) else {
        anyhow::bail!("Task not found: {}", id);
    };
    let name = task.name.clone();

    let tracked = remove_task_with_tracking(&milestones, &id, &history_options(&project));
    persist(&project, &tracked)?;

    output.success(&format!("Removed task: {} - {}", id, name));

    Ok(())
}

fn move_task(output: &Output, id_str: &str, from_str: &str, to_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    let id: TaskId = id_str.parse()?;
    let from: MilestoneId = from_str.parse()?;
    let to: MilestoneId = to_str.parse()?;

    let tracked =
        move_task_with_tracking(&milestones, &id, &from, &to, &history_options(&project));
    if tracked.is_noop() {
        anyhow::bail!("Task {} not found in milestone {}", id, from);
    }
    persist(&project, &tracked)?;

    output.success(&format!("Moved task {} from {} to {}", id, from, to));

    Ok(())
}

fn clone_task(output: &Output, id_str: &str, target_str: &str, copy_dependencies: bool) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    let id: TaskId = id_str.parse()?;
    let target: MilestoneId = target_str.parse()?;

    if find_task(&milestones, &id).is_none() {
        anyhow::bail!("Task not found: {}", id);
    }
    let Some(pos) = milestones.iter().position(|m| m.milestone_id == target) else {
        anyhow::bail!("Milestone not found: {}", target);
    };

    let tracked = clone_task_with_tracking(
        &milestones,
        &id,
        &target,
        copy_dependencies,
        &history_options(&project),
    );
    persist(&project, &tracked)?;

    let clone = tracked.milestones[pos]
        .tasks
        .last()
        .ok_or_else(|| anyhow::anyhow!("Task was not cloned"))?;

    if output.is_json() {
        output.data(&clone);
    } else {
        output.success(&format!(
            "Cloned task {} into {} as {}",
            id, target, clone.task_id
        ));
    }

    Ok(())
}

fn split_task(output: &Output, id_str: &str, part_strs: &[String]) -> Result<()> {
    let project = Project::open_current()?;
    let milestones = project.milestone_store().read_all()?;

    let id: TaskId = id_str.parse()?;
    if find_task(&milestones, &id).is_none() {
        anyhow::bail!("Task not found: {}", id);
    }

    let parts = parse_parts(part_strs)?;

    let tracked = split_task_with_tracking(&milestones, &id, &parts, &history_options(&project));
    persist(&project, &tracked)?;

    if output.is_json() {
        output.data(&tracked.milestones);
    } else {
        output.success(&format!(
            "Split task {} into {} part(s)",
            id,
            parts.len()
        ));
    }

    Ok(())
}

/// Parses NAME:DAYS part arguments, splitting on the last colon
fn parse_parts(part_strs: &[String]) -> Result<Vec<SplitPart>> {
    part_strs
        .iter()
        .map(|s| {
            let (name, days) = s
                .rsplit_once(':')
                .ok_or_else(|| anyhow::anyhow!("Invalid part '{}', expected NAME:DAYS", s))?;
            let duration_days: u32 = days
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid day count in part '{}'", s))?;
            if name.is_empty() {
                anyhow::bail!("Invalid part '{}', name is empty", s);
            }
            Ok(SplitPart {
                name: name.to_string(),
                duration_days,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_parts_splits_on_last_colon() {
        let parts = parse_parts(&["Design: phase one:2".to_string()]).unwrap();
        assert_eq!(parts[0].name, "Design: phase one");
        assert_eq!(parts[0].duration_days, 2);
    }

    #[test]
    fn parse_parts_rejects_missing_days() {
        assert!(parse_parts(&["Design".to_string()]).is_err());
        assert!(parse_parts(&["Design:abc".to_string()]).is_err());
        assert!(parse_parts(&[":3".to_string()]).is_err());
    }
}
