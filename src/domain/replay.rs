//! State replayer and rollback engine
//!
//! Reconstructs the milestone collection at any point in the ledger by
//! replaying entries from an empty state. The replay depends on the entries
//! alone (including their denormalized context), never on current live
//! state, so any historical state is reproducible from the ledger.
//!
//! Rollback is destructive: entries after the rollback point are discarded
//! from the returned ledger, not hidden.

use super::history::{ChangeEntry, ChangePayload, EntityKind, EntitySnapshot};
use super::task::Milestone;

/// Result of [`rollback_to_change`]
#[derive(Debug, Clone, PartialEq)]
pub struct Rollback {
    /// State reconstructed at the rollback point
    pub milestones: Vec<Milestone>,

    /// The ledger truncated through the rollback point (inclusive)
    pub history: Vec<ChangeEntry>,
}

/// Pure reducer: applies one entry to a state, returning the next state
///
/// An entry whose required context is absent (for example a task-add without
/// `context.milestoneId`) is silently skipped: the input is returned
/// unchanged. `status` entries are informational and never touch state.
pub fn apply_change_to_state(
    mut milestones: Vec<Milestone>,
    entry: &ChangeEntry,
) -> Vec<Milestone> {
    match (entry.entity_type, &entry.payload) {
        (EntityKind::Milestone, ChangePayload::Add { new_value }) => {
            if let EntitySnapshot::Milestone(milestone) = new_value {
                milestones.push((**milestone).clone());
            }
            milestones
        }

        (EntityKind::Task, ChangePayload::Add { new_value }) => {
            let EntitySnapshot::Task(task) = new_value else {
                return milestones;
            };
            let Some(milestone_id) = &entry.context.milestone_id else {
                return milestones;
            };
            if let Some(milestone) = milestones
                .iter_mut()
                .find(|m| &m.milestone_id == milestone_id)
            {
                milestone.tasks.push((**task).clone());
            }
            milestones
        }

        (EntityKind::Milestone, ChangePayload::Remove { .. }) => {
            milestones.retain(|m| m.milestone_id.as_str() != entry.entity_id);
            milestones
        }

        (EntityKind::Task, ChangePayload::Remove { .. }) => {
            for milestone in &mut milestones {
                milestone
                    .tasks
                    .retain(|t| t.task_id.as_str() != entry.entity_id);
            }
            milestones
        }

        (EntityKind::Task, ChangePayload::Name { new_value, .. }) => {
            with_task(milestones, &entry.entity_id, |task| {
                task.name = new_value.clone();
            })
        }

        (EntityKind::Milestone, ChangePayload::MilestoneName { new_value, .. }) => {
            if let Some(milestone) = milestones
                .iter_mut()
                .find(|m| m.milestone_id.as_str() == entry.entity_id)
            {
                milestone.milestone_name = new_value.clone();
            }
            milestones
        }

        (EntityKind::Task, ChangePayload::Description { new_value, .. }) => {
            with_task(milestones, &entry.entity_id, |task| {
                task.description = new_value.clone();
            })
        }

        (EntityKind::Task, ChangePayload::Duration { new_value, .. }) => {
            let new_value = *new_value;
            with_task(milestones, &entry.entity_id, |task| {
                task.duration_days = new_value;
            })
        }

        (EntityKind::Task, ChangePayload::Team { new_value, .. }) => {
            with_task(milestones, &entry.entity_id, |task| {
                task.team = new_value.clone();
            })
        }

        (EntityKind::Task, ChangePayload::Dependency { new_value, .. }) => {
            with_task(milestones, &entry.entity_id, |task| {
                task.depends_on = new_value.clone();
            })
        }

        (EntityKind::Task, ChangePayload::TaskMove { .. }) => {
            let Some(target_id) = &entry.context.target_milestone_id else {
                return milestones;
            };
            let target_id = target_id.clone();

            let mut moved = None;
            for milestone in &mut milestones {
                if let Some(pos) = milestone
                    .tasks
                    .iter()
                    .position(|t| t.task_id.as_str() == entry.entity_id)
                {
                    moved = Some(milestone.tasks.remove(pos));
                    break;
                }
            }

            if let Some(task) = moved {
                if let Some(target) = milestones
                    .iter_mut()
                    .find(|m| m.milestone_id == target_id)
                {
                    target.tasks.push(task);
                }
            }
            milestones
        }

        // Informational only: no defined state mutation
        (_, ChangePayload::Status { .. }) => milestones,

        // Mismatched entity/payload combinations fall through unchanged
        _ => milestones,
    }
}

/// Overwrites one field on the task matching `entity_id`, wherever it lives
fn with_task(
    mut milestones: Vec<Milestone>,
    entity_id: &str,
    apply: impl FnOnce(&mut super::task::Task),
) -> Vec<Milestone> {
    if let Some(task) = milestones
        .iter_mut()
        .flat_map(|m| m.tasks.iter_mut())
        .find(|t| t.task_id.as_str() == entity_id)
    {
        apply(task);
    }
    milestones
}

/// Reconstructs the state after applying entries `0..=target_index`
///
/// Starts from an empty collection, never from live state. A `target_index`
/// past the end replays the whole ledger.
pub fn reconstruct_state_at_change(
    history: &[ChangeEntry],
    target_index: usize,
) -> Vec<Milestone> {
    history
        .iter()
        .take(target_index.saturating_add(1))
        .fold(Vec::new(), apply_change_to_state)
}

/// Rolls the project back to the state at `target_index`
///
/// The returned ledger is `history[0..=target_index]`; everything after is
/// permanently discarded. The caller persists the truncated ledger as the
/// new authoritative history.
pub fn rollback_to_change(history: &[ChangeEntry], target_index: usize) -> Rollback {
    let keep = target_index.saturating_add(1).min(history.len());

    Rollback {
        milestones: reconstruct_state_at_change(history, target_index),
        history: history[..keep].to_vec(),
    }
}
