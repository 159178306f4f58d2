//! Change-history ledger
//!
//! Every mutation of the milestone collection is recorded as an immutable
//! [`ChangeEntry`]. Entries are append-only; rollback truncates the ledger
//! (see [`replay`](super::replay)). The old/new pair of each entry is a
//! tagged union keyed by change type, so descriptions and replay read
//! precisely-typed values instead of loose ones.
//!
//! Entries carry denormalized display context (`milestoneId`, `taskName`,
//! ...) because replay and description generation must never depend on
//! current live state, only on the entry itself.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::id::{MilestoneId, TaskId};
use super::task::{Milestone, Task};

/// Kind of entity a change applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Task,
    Milestone,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Task => f.write_str("task"),
            EntityKind::Milestone => f.write_str("milestone"),
        }
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(EntityKind::Task),
            "milestone" => Ok(EntityKind::Milestone),
            other => Err(format!("unknown entity type: {}", other)),
        }
    }
}

/// Discriminant of a change payload, used for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Add,
    Remove,
    Name,
    MilestoneName,
    Description,
    Duration,
    Team,
    Dependency,
    Status,
    TaskMove,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeType::Add => "add",
            ChangeType::Remove => "remove",
            ChangeType::Name => "name",
            ChangeType::MilestoneName => "milestone_name",
            ChangeType::Description => "description",
            ChangeType::Duration => "duration",
            ChangeType::Team => "team",
            ChangeType::Dependency => "dependency",
            ChangeType::Status => "status",
            ChangeType::TaskMove => "task_move",
        };
        f.write_str(s)
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(ChangeType::Add),
            "remove" => Ok(ChangeType::Remove),
            "name" => Ok(ChangeType::Name),
            "milestone_name" => Ok(ChangeType::MilestoneName),
            "description" => Ok(ChangeType::Description),
            "duration" => Ok(ChangeType::Duration),
            "team" => Ok(ChangeType::Team),
            "dependency" => Ok(ChangeType::Dependency),
            "status" => Ok(ChangeType::Status),
            "task_move" => Ok(ChangeType::TaskMove),
            other => Err(format!("unknown change type: {}", other)),
        }
    }
}

/// Full entity snapshot carried by add/remove entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntitySnapshot {
    Task(Box<Task>),
    Milestone(Box<Milestone>),
}

/// The old/new pair of a change, keyed by change type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "changeType",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ChangePayload {
    Add {
        new_value: EntitySnapshot,
    },
    Remove {
        old_value: EntitySnapshot,
    },
    Name {
        old_value: String,
        new_value: String,
    },
    MilestoneName {
        old_value: String,
        new_value: String,
    },
    Description {
        old_value: String,
        new_value: String,
    },
    Duration {
        old_value: u32,
        new_value: u32,
    },
    Team {
        old_value: String,
        new_value: String,
    },
    Dependency {
        old_value: Vec<TaskId>,
        new_value: Vec<TaskId>,
    },
    /// Recorded and describable, but never applied by the replayer
    Status {
        old_value: String,
        new_value: String,
    },
    TaskMove {
        old_value: MilestoneId,
        new_value: MilestoneId,
    },
}

impl ChangePayload {
    /// Returns the change-type discriminant
    pub fn kind(&self) -> ChangeType {
        match self {
            ChangePayload::Add { .. } => ChangeType::Add,
            ChangePayload::Remove { .. } => ChangeType::Remove,
            ChangePayload::Name { .. } => ChangeType::Name,
            ChangePayload::MilestoneName { .. } => ChangeType::MilestoneName,
            ChangePayload::Description { .. } => ChangeType::Description,
            ChangePayload::Duration { .. } => ChangeType::Duration,
            ChangePayload::Team { .. } => ChangeType::Team,
            ChangePayload::Dependency { .. } => ChangeType::Dependency,
            ChangePayload::Status { .. } => ChangeType::Status,
            ChangePayload::TaskMove { .. } => ChangeType::TaskMove,
        }
    }
}

/// Denormalized display info so replay and descriptions never consult live state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<MilestoneId>,

    /// Destination milestone for `task_move` entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_milestone_id: Option<MilestoneId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_name: Option<String>,
}

impl ChangeContext {
    pub fn is_empty(&self) -> bool {
        self.milestone_id.is_none()
            && self.target_milestone_id.is_none()
            && self.task_name.is_none()
            && self.milestone_name.is_none()
    }
}

/// One immutable record in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    /// Unique entry identifier
    pub entry_id: String,

    /// Wall-clock time the change was recorded
    pub timestamp: DateTime<Utc>,

    pub entity_type: EntityKind,

    /// ID of the task or milestone the change applies to
    pub entity_id: String,

    #[serde(flatten)]
    pub payload: ChangePayload,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "ChangeContext::is_empty")]
    pub context: ChangeContext,
}

/// Attribution options threaded through the operation layer
#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    pub user: Option<String>,
}

/// Stamps a fresh entry with a unique ID and the current timestamp
pub fn create_change_entry(
    entity_type: EntityKind,
    entity_id: impl Into<String>,
    payload: ChangePayload,
    options: &HistoryOptions,
    context: ChangeContext,
) -> ChangeEntry {
    let timestamp = Utc::now();
    let entity_id = entity_id.into();

    let seed = format!(
        "{}{}{}",
        entity_id,
        timestamp.timestamp_nanos_opt().unwrap_or(0),
        payload.kind()
    );
    let entry_id = format!(
        "chg_{}_{}",
        timestamp.timestamp_millis(),
        &blake3::hash(seed.as_bytes()).to_hex()[..8]
    );

    ChangeEntry {
        entry_id,
        timestamp,
        entity_type,
        entity_id,
        payload,
        user: options.user.clone(),
        context,
    }
}

/// Returns the history with one entry appended; the input is untouched
pub fn log_change(history: &[ChangeEntry], entry: ChangeEntry) -> Vec<ChangeEntry> {
    let mut next = history.to_vec();
    next.push(entry);
    next
}

/// Compares two versions of a task field-by-field, one entry per changed field
///
/// Dependency sets are compared as sorted lists; a single `dependency` entry
/// carries the full old and new arrays even when several edges changed.
pub fn detect_task_changes(
    old: &Task,
    new: &Task,
    milestone: &Milestone,
    options: &HistoryOptions,
) -> Vec<ChangeEntry> {
    let mut changes = Vec::new();

    let context = ChangeContext {
        milestone_id: Some(milestone.milestone_id.clone()),
        task_name: Some(new.name.clone()),
        milestone_name: Some(milestone.milestone_name.clone()),
        ..ChangeContext::default()
    };

    let mut push = |payload: ChangePayload| {
        changes.push(create_change_entry(
            EntityKind::Task,
            old.task_id.as_str(),
            payload,
            options,
            context.clone(),
        ));
    };

    if old.name != new.name {
        push(ChangePayload::Name {
            old_value: old.name.clone(),
            new_value: new.name.clone(),
        });
    }
    if old.description != new.description {
        push(ChangePayload::Description {
            old_value: old.description.clone(),
            new_value: new.description.clone(),
        });
    }
    if old.team != new.team {
        push(ChangePayload::Team {
            old_value: old.team.clone(),
            new_value: new.team.clone(),
        });
    }
    if old.duration_days != new.duration_days {
        push(ChangePayload::Duration {
            old_value: old.duration_days,
            new_value: new.duration_days,
        });
    }

    let old_deps = old.sorted_dependencies();
    let new_deps = new.sorted_dependencies();
    if old_deps != new_deps {
        push(ChangePayload::Dependency {
            old_value: old_deps,
            new_value: new_deps,
        });
    }

    changes
}

/// Compares two versions of a milestone, one entry per changed field
pub fn detect_milestone_changes(
    old: &Milestone,
    new: &Milestone,
    options: &HistoryOptions,
) -> Vec<ChangeEntry> {
    let mut changes = Vec::new();

    if old.milestone_name != new.milestone_name {
        changes.push(create_change_entry(
            EntityKind::Milestone,
            old.milestone_id.as_str(),
            ChangePayload::MilestoneName {
                old_value: old.milestone_name.clone(),
                new_value: new.milestone_name.clone(),
            },
            options,
            ChangeContext {
                milestone_id: Some(old.milestone_id.clone()),
                milestone_name: Some(new.milestone_name.clone()),
                ..ChangeContext::default()
            },
        ));
    }

    changes
}

/// Human-readable one-liner for an entry, derived from the entry alone
pub fn generate_change_description(entry: &ChangeEntry) -> String {
    let entity_name = || -> String {
        entry
            .context
            .task_name
            .clone()
            .or_else(|| entry.context.milestone_name.clone())
            .unwrap_or_else(|| entry.entity_id.clone())
    };

    match &entry.payload {
        ChangePayload::Add { new_value } => match new_value {
            EntitySnapshot::Task(task) => {
                let milestone = entry
                    .context
                    .milestone_name
                    .clone()
                    .or_else(|| {
                        entry
                            .context
                            .milestone_id
                            .as_ref()
                            .map(|id| id.to_string())
                    })
                    .unwrap_or_else(|| "project".to_string());
                format!("Task \"{}\" added to milestone \"{}\"", task.name, milestone)
            }
            EntitySnapshot::Milestone(m) => {
                format!("Milestone \"{}\" created", m.milestone_name)
            }
        },
        ChangePayload::Remove { old_value } => match old_value {
            EntitySnapshot::Task(task) => {
                let milestone = entry
                    .context
                    .milestone_name
                    .clone()
                    .or_else(|| {
                        entry
                            .context
                            .milestone_id
                            .as_ref()
                            .map(|id| id.to_string())
                    })
                    .unwrap_or_else(|| "project".to_string());
                format!(
                    "Task \"{}\" removed from milestone \"{}\"",
                    task.name, milestone
                )
            }
            EntitySnapshot::Milestone(m) => {
                format!("Milestone \"{}\" removed", m.milestone_name)
            }
        },
        ChangePayload::Name {
            old_value,
            new_value,
        } => format!("Task \"{}\" renamed to \"{}\"", old_value, new_value),
        ChangePayload::MilestoneName {
            old_value,
            new_value,
        } => format!("Milestone \"{}\" renamed to \"{}\"", old_value, new_value),
        ChangePayload::Description { .. } => {
            format!("Description of \"{}\" updated", entity_name())
        }
        ChangePayload::Duration {
            old_value,
            new_value,
        } => format!(
            "Duration of \"{}\" changed from {} to {} days",
            entity_name(),
            old_value,
            new_value
        ),
        ChangePayload::Team {
            old_value,
            new_value,
        } => format!(
            "Team of \"{}\" changed from \"{}\" to \"{}\"",
            entity_name(),
            old_value,
            new_value
        ),
        ChangePayload::Dependency {
            old_value,
            new_value,
        } => format!(
            "Dependencies of \"{}\" changed ({} -> {})",
            entity_name(),
            old_value.len(),
            new_value.len()
        ),
        ChangePayload::Status {
            old_value,
            new_value,
        } => format!(
            "Status of \"{}\" changed from \"{}\" to \"{}\"",
            entity_name(),
            old_value,
            new_value
        ),
        ChangePayload::TaskMove {
            old_value,
            new_value,
        } => format!(
            "Task \"{}\" moved from \"{}\" to \"{}\"",
            entity_name(),
            old_value,
            new_value
        ),
    }
}

/// Filter applied by [`get_filtered_history`]
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub entity_type: Option<EntityKind>,
    pub entity_id: Option<String>,
    pub change_type: Option<ChangeType>,
}

/// Read-only filtered view of the ledger
pub fn get_filtered_history<'a>(
    history: &'a [ChangeEntry],
    filter: &HistoryFilter,
) -> Vec<&'a ChangeEntry> {
    history
        .iter()
        .filter(|entry| {
            filter
                .entity_type
                .map_or(true, |kind| entry.entity_type == kind)
        })
        .filter(|entry| {
            filter
                .entity_id
                .as_deref()
                .map_or(true, |id| entry.entity_id == id)
        })
        .filter(|entry| {
            filter
                .change_type
                .map_or(true, |kind| entry.payload.kind() == kind)
        })
        .collect()
}

/// Groups entries by the local calendar day of their timestamp
///
/// Keys are `YYYY-MM-DD` display strings; entries keep ledger order within
/// each day.
pub fn group_history_by_date(history: &[ChangeEntry]) -> BTreeMap<String, Vec<&ChangeEntry>> {
    let mut groups: BTreeMap<String, Vec<&ChangeEntry>> = BTreeMap::new();

    for entry in history {
        let day = entry
            .timestamp
            .with_timezone(&Local)
            .date_naive()
            .format("%Y-%m-%d")
            .to_string();
        groups.entry(day).or_default().push(entry);
    }

    groups
}
