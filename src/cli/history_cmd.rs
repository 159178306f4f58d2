//! Change ledger commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::domain::{
    generate_change_description, get_filtered_history, group_history_by_date,
    reconstruct_state_at_change, rollback_to_change, ChangeEntry, ChangeType, EntityKind,
    HistoryFilter,
};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List recorded changes
    List {
        /// Filter by entity type (task or milestone)
        #[arg(long)]
        entity_type: Option<String>,

        /// Filter by change type (add, remove, duration, ...)
        #[arg(long)]
        change_type: Option<String>,

        /// Filter by task or milestone ID
        #[arg(long)]
        entity: Option<String>,

        /// Show at most this many entries (most recent last)
        #[arg(long)]
        limit: Option<usize>,

        /// Group entries by calendar day
        #[arg(long)]
        by_day: bool,
    },

    /// Show one ledger entry in full
    Show {
        /// Entry index (0-based, as printed by 'history list')
        index: usize,

        /// Also print the project state reconstructed at this entry
        #[arg(long)]
        state: bool,
    },

    /// Roll the project back to the state after a given entry
    Rollback {
        /// Entry index to roll back to (later entries are discarded)
        index: usize,
    },
}

pub fn run(cmd: HistoryCommands, output: &Output) -> Result<()> {
    match cmd {
        HistoryCommands::List {
            entity_type,
            change_type,
            entity,
            limit,
            by_day,
        } => list_history(
            output,
            entity_type.as_deref(),
            change_type.as_deref(),
            entity,
            limit,
            by_day,
        ),
        HistoryCommands::Show { index, state } => show_entry(output, index, state),
        HistoryCommands::Rollback { index } => rollback(output, index),
    }
}

fn list_history(
    output: &Output,
    entity_type: Option<&str>,
    change_type: Option<&str>,
    entity_id: Option<String>,
    limit: Option<usize>,
    by_day: bool,
) -> Result<()> {
    let project = Project::open_current()?;
    let history = project.history_store().read_all()?;

    let filter = HistoryFilter {
        entity_type: entity_type
            .map(|s| s.parse::<EntityKind>().map_err(anyhow::Error::msg))
            .transpose()?,
        entity_id,
        change_type: change_type
            .map(|s| s.parse::<ChangeType>().map_err(anyhow::Error::msg))
            .transpose()?,
    };

    // Indices are positions in the full ledger, so rollback targets stay
    // stable under filtering
    let matched: std::collections::HashSet<&str> = get_filtered_history(&history, &filter)
        .into_iter()
        .map(|e| e.entry_id.as_str())
        .collect();
    let filtered: Vec<(usize, &ChangeEntry)> = history
        .iter()
        .enumerate()
        .filter(|(_, e)| matched.contains(e.entry_id.as_str()))
        .collect();

    let start = limit
        .map(|n| filtered.len().saturating_sub(n))
        .unwrap_or(0);
    let visible = &filtered[start..];

    if output.is_json() {
        let items: Vec<_> = visible
            .iter()
            .map(|(index, entry)| {
                serde_json::json!({
                    "index": index,
                    "description": generate_change_description(entry),
                    "entry": entry,
                })
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    if visible.is_empty() {
        println!("No history entries");
        return Ok(());
    }

    if by_day {
        let entries: Vec<ChangeEntry> = visible.iter().map(|(_, e)| (*e).clone()).collect();
        let groups = group_history_by_date(&entries);

        for (day, day_entries) in &groups {
            println!("{}", day);
            for entry in day_entries {
                let index = visible
                    .iter()
                    .find(|(_, e)| e.entry_id == entry.entry_id)
                    .map(|(i, _)| *i)
                    .unwrap_or(0);
                println!("  [{}] {}", index, generate_change_description(entry));
            }
        }
        return Ok(());
    }

    for (index, entry) in visible {
        let user = entry
            .user
            .as_deref()
            .map(|u| format!(" ({})", u))
            .unwrap_or_default();
        println!(
            "[{}] {} {}{}",
            index,
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            generate_change_description(entry),
            user
        );
    }

    Ok(())
}

fn show_entry(output: &Output, index: usize, with_state: bool) -> Result<()> {
    let project = Project::open_current()?;
    let history = project.history_store().read_all()?;

    let entry = history
        .get(index)
        .ok_or_else(|| anyhow::anyhow!("No history entry at index {}", index))?;

    let reconstructed = with_state.then(|| reconstruct_state_at_change(&history, index));

    if output.is_json() {
        match &reconstructed {
            Some(state) => output.data(&serde_json::json!({
                "entry": entry,
                "state": state,
            })),
            None => output.data(entry),
        }
    } else {
        println!("Entry [{}]: {}", index, entry.entry_id);
        println!("  Time:   {}", entry.timestamp.format("%Y-%m-%d %H:%M:%S"));
        println!("  Change: {}", generate_change_description(entry));
        println!("  Type:   {} {}", entry.entity_type, entry.payload.kind());
        println!("  Entity: {}", entry.entity_id);
        if let Some(user) = &entry.user {
            println!("  User:   {}", user);
        }

        if let Some(state) = &reconstructed {
            output.blank();
            println!("State after this entry:");
            for milestone in state {
                println!("  {} ({} task(s))", milestone.milestone_name, milestone.tasks.len());
                for task in &milestone.tasks {
                    println!("    {} - {}", task.task_id, task.name);
                }
            }
        }
    }

    Ok(())
}

fn rollback(output: &Output, index: usize) -> Result<()> {
    let project = Project::open_current()?;
    let history = project.history_store().read_all()?;

    if index >= history.len() {
        anyhow::bail!(
            "No history entry at index {} ({} entries recorded)",
            index,
            history.len()
        );
    }

    let discarded = history.len() - index - 1;
    let result = rollback_to_change(&history, index);

    project.milestone_store().write_all(&result.milestones)?;
    project.history_store().write_all(&result.history)?;

    output.success(&format!(
        "Rolled back to entry {} ({} later change(s) discarded)",
        index, discarded
    ));

    Ok(())
}
