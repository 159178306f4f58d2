//! Tracked mutation primitives
//!
//! Every operation follows the same pattern: read the current state, compute
//! a new state, diff or synthesize the matching ledger entries, and return
//! both. The caller's collections are never mutated, so state and history
//! move together or not at all.
//!
//! Not-found conditions (unknown task ID, a move whose claimed source does
//! not contain the task) are silent no-ops returning the original state and
//! an empty change set. Callers may hold stale snapshots; favoring
//! idempotent safety over errors keeps them composable.

use chrono::Utc;

use super::history::{
    create_change_entry, detect_milestone_changes, detect_task_changes, ChangeContext, ChangeEntry,
    ChangePayload, EntityKind, EntitySnapshot, HistoryOptions,
};
use super::id::{generate_milestone_id, generate_task_id, MilestoneId, TaskId};
use super::task::{all_milestone_ids, all_task_ids, Milestone, Task};

/// New state plus the ledger entries describing how it differs from the old
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked {
    pub milestones: Vec<Milestone>,
    pub changes: Vec<ChangeEntry>,
}

impl Tracked {
    fn unchanged(milestones: &[Milestone]) -> Self {
        Self {
            milestones: milestones.to_vec(),
            changes: Vec::new(),
        }
    }

    /// Returns true if the operation was a no-op
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Fields for a task about to be created
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub name: String,
    pub description: String,
    pub team: String,
    pub sprint: Option<String>,
    pub duration_days: u32,
    pub depends_on: Vec<TaskId>,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub team: Option<String>,
    pub duration_days: Option<u32>,
    pub depends_on: Option<Vec<TaskId>>,
}

/// One piece of a task split, in execution order
#[derive(Debug, Clone)]
pub struct SplitPart {
    pub name: String,
    pub duration_days: u32,
}

/// Creates a new empty milestone
pub fn add_milestone_with_tracking(
    milestones: &[Milestone],
    name: &str,
    options: &HistoryOptions,
) -> Tracked {
    let id = generate_milestone_id(name, Utc::now(), &all_milestone_ids(milestones));
    let milestone = Milestone::new(id.clone(), name);

    let entry = create_change_entry(
        EntityKind::Milestone,
        id.as_str(),
        ChangePayload::Add {
            new_value: EntitySnapshot::Milestone(Box::new(milestone.clone())),
        },
        options,
        ChangeContext {
            milestone_name: Some(name.to_string()),
            ..ChangeContext::default()
        },
    );

    let mut next = milestones.to_vec();
    next.push(milestone);

    Tracked {
        milestones: next,
        changes: vec![entry],
    }
}

/// Removes a milestone and everything in it
pub fn remove_milestone_with_tracking(
    milestones: &[Milestone],
    milestone_id: &MilestoneId,
    options: &HistoryOptions,
) -> Tracked {
    let Some(milestone) = super::task::find_milestone(milestones, milestone_id) else {
        return Tracked::unchanged(milestones);
    };

    let entry = create_change_entry(
        EntityKind::Milestone,
        milestone_id.as_str(),
        ChangePayload::Remove {
            old_value: EntitySnapshot::Milestone(Box::new(milestone.clone())),
        },
        options,
        ChangeContext {
            milestone_name: Some(milestone.milestone_name.clone()),
            ..ChangeContext::default()
        },
    );

    let next: Vec<Milestone> = milestones
        .iter()
        .filter(|m| &m.milestone_id != milestone_id)
        .cloned()
        .collect();

    Tracked {
        milestones: next,
        changes: vec![entry],
    }
}

/// Renames a milestone
pub fn rename_milestone_with_tracking(
    milestones: &[Milestone],
    milestone_id: &MilestoneId,
    new_name: &str,
    options: &HistoryOptions,
) -> Tracked {
    let Some(pos) = milestones
        .iter()
        .position(|m| &m.milestone_id == milestone_id)
    else {
        return Tracked::unchanged(milestones);
    };

    let mut next = milestones.to_vec();
    let old = next[pos].clone();
    next[pos].milestone_name = new_name.to_string();

    let changes = detect_milestone_changes(&old, &next[pos], options);
    if changes.is_empty() {
        return Tracked::unchanged(milestones);
    }

    Tracked {
        milestones: next,
        changes,
    }
}

/// Creates a task inside the given milestone
pub fn add_task_with_tracking(
    milestones: &[Milestone],
    milestone_id: &MilestoneId,
    spec: NewTask,
    options: &HistoryOptions,
) -> Tracked {
    let Some(pos) = milestones
        .iter()
        .position(|m| &m.milestone_id == milestone_id)
    else {
        return Tracked::unchanged(milestones);
    };

    let task_id = generate_task_id(&spec.name, Utc::now(), &all_task_ids(milestones));
    let mut task = Task::new(task_id.clone(), spec.name.clone(), spec.duration_days);
    task.description = spec.description;
    task.team = spec.team;
    task.sprint = spec.sprint;
    task.depends_on = spec.depends_on;

    let entry = create_change_entry(
        EntityKind::Task,
        task_id.as_str(),
        ChangePayload::Add {
            new_value: EntitySnapshot::Task(Box::new(task.clone())),
        },
        options,
        ChangeContext {
            milestone_id: Some(milestone_id.clone()),
            task_name: Some(spec.name),
            milestone_name: Some(milestones[pos].milestone_name.clone()),
            ..ChangeContext::default()
        },
    );

    let mut next = milestones.to_vec();
    next[pos].tasks.push(task);

    Tracked {
        milestones: next,
        changes: vec![entry],
    }
}

/// Removes a task from whichever milestone contains it
pub fn remove_task_with_tracking(
    milestones: &[Milestone],
    task_id: &TaskId,
    options: &HistoryOptions,
) -> Tracked {
    let Some((milestone, task)) = super::task::find_task(milestones, task_id) else {
        return Tracked::unchanged(milestones);
    };

    let entry = create_change_entry(
        EntityKind::Task,
        task_id.as_str(),
        ChangePayload::Remove {
            old_value: EntitySnapshot::Task(Box::new(task.clone())),
        },
        options,
        ChangeContext {
            milestone_id: Some(milestone.milestone_id.clone()),
            task_name: Some(task.name.clone()),
            milestone_name: Some(milestone.milestone_name.clone()),
            ..ChangeContext::default()
        },
    );

    let mut next = milestones.to_vec();
    for m in &mut next {
        m.tasks.retain(|t| &t.task_id != task_id);
    }

    Tracked {
        milestones: next,
        changes: vec![entry],
    }
}

/// Applies a partial update to a task, logging one entry per changed field
pub fn update_task_with_tracking(
    milestones: &[Milestone],
    task_id: &TaskId,
    update: TaskUpdate,
    options: &HistoryOptions,
) -> Tracked {
    let Some((mi, ti)) = position_of(milestones, task_id) else {
        return Tracked::unchanged(milestones);
    };

    let mut next = milestones.to_vec();
    let old = next[mi].tasks[ti].clone();
    let task = &mut next[mi].tasks[ti];

    if let Some(name) = update.name {
        task.name = name;
    }
    if let Some(description) = update.description {
        task.description = description;
    }
    if let Some(team) = update.team {
        task.team = team;
    }
    if let Some(duration_days) = update.duration_days {
        task.duration_days = duration_days;
    }
    if let Some(depends_on) = update.depends_on {
        task.depends_on = depends_on;
    }

    let changes = detect_task_changes(&old, &next[mi].tasks[ti], &next[mi], options);
    if changes.is_empty() {
        return Tracked::unchanged(milestones);
    }

    Tracked {
        milestones: next,
        changes,
    }
}

/// Moves a task between milestones as an atomic remove-then-insert
///
/// If the task is not found in the claimed source milestone, the move is a
/// no-op, not an error.
pub fn move_task_with_tracking(
    milestones: &[Milestone],
    task_id: &TaskId,
    from: &MilestoneId,
    to: &MilestoneId,
    options: &HistoryOptions,
) -> Tracked {
    if from == to {
        return Tracked::unchanged(milestones);
    }

    let Some(source_pos) = milestones.iter().position(|m| &m.milestone_id == from) else {
        return Tracked::unchanged(milestones);
    };
    let Some(target_pos) = milestones.iter().position(|m| &m.milestone_id == to) else {
        return Tracked::unchanged(milestones);
    };
    let Some(task_pos) = milestones[source_pos]
        .tasks
        .iter()
        .position(|t| &t.task_id == task_id)
    else {
        return Tracked::unchanged(milestones);
    };

    let mut next = milestones.to_vec();
    let task = next[source_pos].tasks.remove(task_pos);
    let task_name = task.name.clone();
    next[target_pos].tasks.push(task);

    let entry = create_change_entry(
        EntityKind::Task,
        task_id.as_str(),
        ChangePayload::TaskMove {
            old_value: from.clone(),
            new_value: to.clone(),
        },
        options,
        ChangeContext {
            milestone_id: Some(from.clone()),
            target_milestone_id: Some(to.clone()),
            task_name: Some(task_name),
            ..ChangeContext::default()
        },
    );

    Tracked {
        milestones: next,
        changes: vec![entry],
    }
}

/// Copies a task into a target milestone under a fresh ID
///
/// Dates are always cleared; the next schedule pass recomputes them.
pub fn clone_task_with_tracking(
    milestones: &[Milestone],
    task_id: &TaskId,
    target: &MilestoneId,
    copy_dependencies: bool,
    options: &HistoryOptions,
) -> Tracked {
    let Some((_, source)) = super::task::find_task(milestones, task_id) else {
        return Tracked::unchanged(milestones);
    };
    let Some(target_pos) = milestones.iter().position(|m| &m.milestone_id == target) else {
        return Tracked::unchanged(milestones);
    };

    let mut clone = source.clone();
    clone.task_id = generate_task_id(&clone.name, Utc::now(), &all_task_ids(milestones));
    clone.clear_dates();
    if !copy_dependencies {
        clone.depends_on.clear();
    }

    let entry = create_change_entry(
        EntityKind::Task,
        clone.task_id.as_str(),
        ChangePayload::Add {
            new_value: EntitySnapshot::Task(Box::new(clone.clone())),
        },
        options,
        ChangeContext {
            milestone_id: Some(target.clone()),
            task_name: Some(clone.name.clone()),
            milestone_name: Some(milestones[target_pos].milestone_name.clone()),
            ..ChangeContext::default()
        },
    );

    let mut next = milestones.to_vec();
    next[target_pos].tasks.push(clone);

    Tracked {
        milestones: next,
        changes: vec![entry],
    }
}

/// Splits a task into an ordered chain of sub-tasks
///
/// The first part inherits the original's dependencies; each subsequent part
/// depends solely on its predecessor. Tasks that depended on the original are
/// rewired onto the last part. The original is removed and all dates are
/// cleared for the next schedule pass.
pub fn split_task_with_tracking(
    milestones: &[Milestone],
    task_id: &TaskId,
    parts: &[SplitPart],
    options: &HistoryOptions,
) -> Tracked {
    if parts.is_empty() {
        return Tracked::unchanged(milestones);
    }
    let Some((mi, _)) = position_of(milestones, task_id) else {
        return Tracked::unchanged(milestones);
    };

    let mut next = milestones.to_vec();
    let mut changes = Vec::new();

    // Remove the original first; its snapshot makes the split reversible
    let original_pos = next[mi]
        .tasks
        .iter()
        .position(|t| &t.task_id == task_id)
        .unwrap_or(0);
    let original = next[mi].tasks.remove(original_pos);

    changes.push(create_change_entry(
        EntityKind::Task,
        task_id.as_str(),
        ChangePayload::Remove {
            old_value: EntitySnapshot::Task(Box::new(original.clone())),
        },
        options,
        ChangeContext {
            milestone_id: Some(next[mi].milestone_id.clone()),
            task_name: Some(original.name.clone()),
            milestone_name: Some(next[mi].milestone_name.clone()),
            ..ChangeContext::default()
        },
    ));

    // Build the chain, registering each new ID before generating the next
    let mut existing = all_task_ids(&next);
    let mut previous: Option<TaskId> = None;
    let mut last_id = original.task_id.clone();

    for part in parts {
        let id = generate_task_id(&part.name, Utc::now(), &existing);
        existing.insert(id.clone());

        let mut task = Task::new(id.clone(), part.name.clone(), part.duration_days);
        task.description = original.description.clone();
        task.team = original.team.clone();
        task.sprint = original.sprint.clone();
        task.depends_on = match &previous {
            None => original.depends_on.clone(),
            Some(prev) => vec![prev.clone()],
        };

        changes.push(create_change_entry(
            EntityKind::Task,
            id.as_str(),
            ChangePayload::Add {
                new_value: EntitySnapshot::Task(Box::new(task.clone())),
            },
            options,
            ChangeContext {
                milestone_id: Some(next[mi].milestone_id.clone()),
                task_name: Some(part.name.clone()),
                milestone_name: Some(next[mi].milestone_name.clone()),
                ..ChangeContext::default()
            },
        ));

        next[mi].tasks.push(task);
        previous = Some(id.clone());
        last_id = id;
    }

    changes.extend(update_dependencies_after_split(
        &mut next, task_id, &last_id, options,
    ));

    Tracked {
        milestones: next,
        changes,
    }
}

/// Rewires every dependent of the removed task onto the last split part
fn update_dependencies_after_split(
    milestones: &mut [Milestone],
    removed: &TaskId,
    replacement: &TaskId,
    options: &HistoryOptions,
) -> Vec<ChangeEntry> {
    let mut changes = Vec::new();

    for milestone in milestones.iter_mut() {
        let milestone_id = milestone.milestone_id.clone();
        let milestone_name = milestone.milestone_name.clone();

        for task in &mut milestone.tasks {
            if !task.depends_on.contains(removed) {
                continue;
            }

            let old_deps = task.sorted_dependencies();
            for dep in &mut task.depends_on {
                if dep == removed {
                    *dep = replacement.clone();
                }
            }

            changes.push(create_change_entry(
                EntityKind::Task,
                task.task_id.as_str(),
                ChangePayload::Dependency {
                    old_value: old_deps,
                    new_value: task.sorted_dependencies(),
                },
                options,
                ChangeContext {
                    milestone_id: Some(milestone_id.clone()),
                    task_name: Some(task.name.clone()),
                    milestone_name: Some(milestone_name.clone()),
                    ..ChangeContext::default()
                },
            ));
        }
    }

    changes
}

fn position_of(milestones: &[Milestone], task_id: &TaskId) -> Option<(usize, usize)> {
    milestones.iter().enumerate().find_map(|(mi, m)| {
        m.tasks
            .iter()
            .position(|t| &t.task_id == task_id)
            .map(|ti| (mi, ti))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::replay::reconstruct_state_at_change;

    fn opts() -> HistoryOptions {
        HistoryOptions::default()
    }

    fn task_id(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    /// Two milestones, three tasks, one cross-task dependency
    fn fixture() -> Vec<Milestone> {
        let mut m1 = Milestone::new("M1".parse().unwrap(), "Phase 1");
        m1.tasks.push(Task::new(task_id("T1"), "Design", 3));
        let mut t2 = Task::new(task_id("T2"), "Build", 5);
        t2.depends_on = vec![task_id("T1")];
        m1.tasks.push(t2);

        let mut m2 = Milestone::new("M2".parse().unwrap(), "Phase 2");
        m2.tasks.push(Task::new(task_id("T3"), "Ship", 1));

        vec![m1, m2]
    }

    /// Replays a full ledger and asserts it matches the live state
    fn assert_replays_to(history: &[ChangeEntry], expected: &[Milestone]) {
        assert!(!history.is_empty());
        let replayed = reconstruct_state_at_change(history, history.len() - 1);
        assert_eq!(replayed, expected);
    }

    /// Builds a ledger from scratch through the ops layer
    fn build_from_ops() -> (Vec<Milestone>, Vec<ChangeEntry>) {
        let mut history: Vec<ChangeEntry> = Vec::new();

        let added = add_milestone_with_tracking(&[], "Phase 1", &opts());
        history.extend(added.changes);
        let m1 = added.milestones[0].milestone_id.clone();

        let added = add_task_with_tracking(
            &added.milestones,
            &m1,
            NewTask {
                name: "Design".to_string(),
                duration_days: 3,
                ..NewTask::default()
            },
            &opts(),
        );
        history.extend(added.changes.clone());

        (added.milestones, history)
    }

    #[test]
    fn add_milestone_appends_and_logs() {
        let tracked = add_milestone_with_tracking(&[], "Phase 1", &opts());

        assert_eq!(tracked.milestones.len(), 1);
        assert_eq!(tracked.changes.len(), 1);
        assert!(tracked.milestones[0]
            .milestone_id
            .as_str()
            .starts_with("ms_"));

        assert_replays_to(&tracked.changes, &tracked.milestones);
    }

    #[test]
    fn add_task_to_unknown_milestone_is_noop() {
        let milestones = fixture();
        let tracked = add_task_with_tracking(
            &milestones,
            &"M9".parse().unwrap(),
            NewTask {
                name: "Ghost".to_string(),
                duration_days: 1,
                ..NewTask::default()
            },
            &opts(),
        );

        assert!(tracked.is_noop());
        assert_eq!(tracked.milestones, milestones);
    }

    #[test]
    fn remove_task_emits_snapshot_entry() {
        let milestones = fixture();
        let tracked = remove_task_with_tracking(&milestones, &task_id("T1"), &opts());

        assert_eq!(tracked.changes.len(), 1);
        assert!(!tracked.milestones[0].contains_task(&task_id("T1")));

        match &tracked.changes[0].payload {
            ChangePayload::Remove {
                old_value: EntitySnapshot::Task(task),
            } => assert_eq!(task.name, "Design"),
            other => panic!("expected remove payload, got {:?}", other),
        }

        // Input untouched
        assert!(milestones[0].contains_task(&task_id("T1")));
    }

    #[test]
    fn update_task_diffs_fields() {
        let milestones = fixture();
        let tracked = update_task_with_tracking(
            &milestones,
            &task_id("T1"),
            TaskUpdate {
                name: Some("Design v2".to_string()),
                duration_days: Some(4),
                ..TaskUpdate::default()
            },
            &opts(),
        );

        assert_eq!(tracked.changes.len(), 2);
        let updated = tracked.milestones[0].task(&task_id("T1")).unwrap();
        assert_eq!(updated.name, "Design v2");
        assert_eq!(updated.duration_days, 4);
    }

    #[test]
    fn update_with_no_effective_change_is_noop() {
        let milestones = fixture();
        let tracked = update_task_with_tracking(
            &milestones,
            &task_id("T1"),
            TaskUpdate {
                name: Some("Design".to_string()),
                ..TaskUpdate::default()
            },
            &opts(),
        );

        assert!(tracked.is_noop());
    }

    #[test]
    fn move_from_wrong_source_is_noop() {
        let milestones = fixture();
        // T3 lives in M2, not M1
        let tracked = move_task_with_tracking(
            &milestones,
            &task_id("T3"),
            &"M1".parse().unwrap(),
            &"M2".parse().unwrap(),
            &opts(),
        );

        assert!(tracked.is_noop());
        assert_eq!(tracked.milestones, milestones);
    }

    #[test]
    fn move_is_atomic_remove_and_insert() {
        let milestones = fixture();
        let tracked = move_task_with_tracking(
            &milestones,
            &task_id("T1"),
            &"M1".parse().unwrap(),
            &"M2".parse().unwrap(),
            &opts(),
        );

        assert!(!tracked.milestones[0].contains_task(&task_id("T1")));
        assert!(tracked.milestones[1].contains_task(&task_id("T1")));
        assert_eq!(tracked.changes.len(), 1);
        assert_eq!(
            tracked.changes[0].context.target_milestone_id,
            Some("M2".parse().unwrap())
        );
    }

    #[test]
    fn clone_gets_fresh_id_and_no_dates() {
        let mut milestones = fixture();
        milestones[0].tasks[0].start_date = Some("2024-01-01".parse().unwrap());
        milestones[0].tasks[0].end_date = Some("2024-01-03".parse().unwrap());

        let tracked = clone_task_with_tracking(
            &milestones,
            &task_id("T1"),
            &"M2".parse().unwrap(),
            false,
            &opts(),
        );

        let clone = tracked.milestones[1].tasks.last().unwrap();
        assert_ne!(clone.task_id, task_id("T1"));
        assert_eq!(clone.name, "Design");
        assert!(!clone.has_dates());
        assert!(clone.depends_on.is_empty());
    }

    #[test]
    fn clone_can_copy_dependencies() {
        let milestones = fixture();
        let tracked = clone_task_with_tracking(
            &milestones,
            &task_id("T2"),
            &"M2".parse().unwrap(),
            true,
            &opts(),
        );

        let clone = tracked.milestones[1].tasks.last().unwrap();
        assert_eq!(clone.depends_on, vec![task_id("T1")]);
    }

    #[test]
    fn split_builds_linear_chain_and_rewires_dependents() {
        let milestones = fixture();
        let parts = vec![
            SplitPart {
                name: "Design core".to_string(),
                duration_days: 2,
            },
            SplitPart {
                name: "Design edges".to_string(),
                duration_days: 1,
            },
        ];

        let tracked = split_task_with_tracking(&milestones, &task_id("T1"), &parts, &opts());

        let m1 = &tracked.milestones[0];
        assert!(!m1.contains_task(&task_id("T1")));
        assert_eq!(m1.tasks.len(), 3); // T2 plus the two parts

        let first = m1.tasks.iter().find(|t| t.name == "Design core").unwrap();
        let second = m1.tasks.iter().find(|t| t.name == "Design edges").unwrap();

        // First part inherits the original's (empty) dependencies, the
        // second chains onto the first
        assert!(first.depends_on.is_empty());
        assert_eq!(second.depends_on, vec![first.task_id.clone()]);

        // T2 depended on T1 and now depends on the last part
        let t2 = m1.task(&task_id("T2")).unwrap();
        assert_eq!(t2.depends_on, vec![second.task_id.clone()]);

        // remove + 2 adds + 1 rewire
        assert_eq!(tracked.changes.len(), 4);
    }

    #[test]
    fn split_with_no_parts_is_noop() {
        let milestones = fixture();
        let tracked = split_task_with_tracking(&milestones, &task_id("T1"), &[], &opts());
        assert!(tracked.is_noop());
    }

    #[test]
    fn ops_ledger_replays_to_live_state() {
        // Drive a realistic editing session through every operation and
        // check the round-trip law at the end.
        let (mut milestones, mut history) = build_from_ops();
        let m1 = milestones[0].milestone_id.clone();

        let tracked = add_milestone_with_tracking(&milestones, "Phase 2", &opts());
        history.extend(tracked.changes);
        milestones = tracked.milestones;
        let m2 = milestones[1].milestone_id.clone();

        let t1 = milestones[0].tasks[0].task_id.clone();

        let tracked = add_task_with_tracking(
            &milestones,
            &m2,
            NewTask {
                name: "Ship".to_string(),
                duration_days: 1,
                depends_on: vec![t1.clone()],
                ..NewTask::default()
            },
            &opts(),
        );
        history.extend(tracked.changes);
        milestones = tracked.milestones;

        let tracked = update_task_with_tracking(
            &milestones,
            &t1,
            TaskUpdate {
                team: Some("Backend".to_string()),
                duration_days: Some(6),
                ..TaskUpdate::default()
            },
            &opts(),
        );
        history.extend(tracked.changes);
        milestones = tracked.milestones;

        let tracked = move_task_with_tracking(&milestones, &t1, &m1, &m2, &opts());
        history.extend(tracked.changes);
        milestones = tracked.milestones;

        let tracked = split_task_with_tracking(
            &milestones,
            &t1,
            &[
                SplitPart {
                    name: "Design A".to_string(),
                    duration_days: 2,
                },
                SplitPart {
                    name: "Design B".to_string(),
                    duration_days: 4,
                },
            ],
            &opts(),
        );
        history.extend(tracked.changes);
        milestones = tracked.milestones;

        let replayed = reconstruct_state_at_change(&history, history.len() - 1);
        assert_eq!(replayed, milestones);
    }
}
