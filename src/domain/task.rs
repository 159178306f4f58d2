//! Task and milestone domain models
//!
//! Tasks are the schedulable units of work within a milestone. They carry a
//! working-day duration and dependencies on other tasks anywhere in the
//! project. Milestone start/end dates are derived from their tasks and are
//! only populated by the scheduler.
//!
//! The serialized shape uses camelCase field names and ISO `YYYY-MM-DD` date
//! strings; this is the persisted contract shared with external tooling.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::id::{MilestoneId, TaskId};

/// A task within a milestone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier (globally unique across all milestones)
    pub task_id: TaskId,

    /// Human-readable name
    pub name: String,

    /// Optional longer description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Team label; drives display color, not semantically constrained
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub team: String,

    /// Optional sprint label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint: Option<String>,

    /// Duration in working days (positive)
    pub duration_days: u32,

    /// IDs of tasks this task depends on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,

    /// Computed or manually pinned start date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Computed or manually pinned end date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Task {
    /// Creates a new task with no dates and no dependencies
    pub fn new(task_id: TaskId, name: impl Into<String>, duration_days: u32) -> Self {
        Self {
            task_id,
            name: name.into(),
            description: String::new(),
            team: String::new(),
            sprint: None,
            duration_days,
            depends_on: Vec::new(),
            start_date: None,
            end_date: None,
        }
    }

    /// Clears both dates; the next schedule pass recomputes them
    pub fn clear_dates(&mut self) {
        self.start_date = None;
        self.end_date = None;
    }

    /// Returns true if both a start and an end date are present
    pub fn has_dates(&self) -> bool {
        self.start_date.is_some() && self.end_date.is_some()
    }

    /// Returns the dependency list sorted by ID, for order-insensitive comparison
    pub fn sorted_dependencies(&self) -> Vec<TaskId> {
        let mut deps = self.depends_on.clone();
        deps.sort();
        deps
    }
}

/// A milestone: an ordered sequence of tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// Unique identifier
    pub milestone_id: MilestoneId,

    /// Human-readable name
    pub milestone_name: String,

    /// Derived: min over its tasks' start dates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Derived: max over its tasks' end dates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// Tasks in insertion/display order
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Milestone {
    /// Creates an empty milestone
    pub fn new(milestone_id: MilestoneId, milestone_name: impl Into<String>) -> Self {
        Self {
            milestone_id,
            milestone_name: milestone_name.into(),
            start_date: None,
            end_date: None,
            tasks: Vec::new(),
        }
    }

    /// Finds a task by ID within this milestone
    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.task_id == task_id)
    }

    /// Returns true if this milestone contains the task
    pub fn contains_task(&self, task_id: &TaskId) -> bool {
        self.task(task_id).is_some()
    }

    /// Recomputes the derived milestone dates from its tasks
    pub fn refresh_dates(&mut self) {
        self.start_date = self.tasks.iter().filter_map(|t| t.start_date).min();
        self.end_date = self.tasks.iter().filter_map(|t| t.end_date).max();
    }
}

/// Finds a task and its owning milestone anywhere in the project
pub fn find_task<'a>(
    milestones: &'a [Milestone],
    task_id: &TaskId,
) -> Option<(&'a Milestone, &'a Task)> {
    milestones
        .iter()
        .find_map(|m| m.task(task_id).map(|t| (m, t)))
}

/// Finds a milestone by ID
pub fn find_milestone<'a>(
    milestones: &'a [Milestone],
    milestone_id: &MilestoneId,
) -> Option<&'a Milestone> {
    milestones.iter().find(|m| &m.milestone_id == milestone_id)
}

/// Collects every task ID in the project
pub fn all_task_ids(milestones: &[Milestone]) -> HashSet<TaskId> {
    milestones
        .iter()
        .flat_map(|m| m.tasks.iter().map(|t| t.task_id.clone()))
        .collect()
}

/// Collects every milestone ID in the project
pub fn all_milestone_ids(milestones: &[Milestone]) -> HashSet<MilestoneId> {
    milestones.iter().map(|m| m.milestone_id.clone()).collect()
}
