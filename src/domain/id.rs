//! ID system for milestones and tasks
//!
//! ID Format:
//! - Milestone IDs: `ms_{unix-millis}_{4-char-hash}` (e.g., `ms_1704067200000_7f2b`)
//! - Task IDs: `task_{unix-millis}_{4-char-hash}` (e.g., `task_1704067200000_9d3e`)
//!
//! The hash suffix is derived from the entity name, the timestamp and an
//! attempt counter, so a collision against the current ID set is resolved by
//! regenerating. After [`MAX_ID_ATTEMPTS`] regenerations the suffix falls back
//! to the attempt count itself, which guarantees termination. Imported data
//! may carry IDs in any non-empty format; only generated IDs follow the
//! scheme above.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Regeneration limit before falling back to the attempt-count suffix
pub const MAX_ID_ATTEMPTS: u32 = 100;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Milestone ID must not be empty")]
    EmptyMilestoneId,

    #[error("Task ID must not be empty")]
    EmptyTaskId,
}

/// Generates a 4-character hash suffix from name, timestamp and attempt
fn short_hash(name: &str, millis: i64, attempt: u32) -> String {
    let input = format!("{}{}{}", name, millis, attempt);
    let hash = blake3::hash(input.as_bytes());
    hash.to_hex()[..4].to_string()
}

/// Milestone ID - any non-empty string; generated IDs use `ms_{millis}_{hash}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MilestoneId(String);

impl MilestoneId {
    /// Returns the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MilestoneId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdError::EmptyMilestoneId);
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for MilestoneId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MilestoneId> for String {
    fn from(id: MilestoneId) -> Self {
        id.0
    }
}

/// Task ID - any non-empty string; generated IDs use `task_{millis}_{hash}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Returns the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdError::EmptyTaskId);
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for TaskId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

/// Generates a task ID that does not collide with the given set
pub fn generate_task_id(
    name: &str,
    timestamp: DateTime<Utc>,
    existing: &HashSet<TaskId>,
) -> TaskId {
    let millis = timestamp.timestamp_millis();

    for attempt in 0..MAX_ID_ATTEMPTS {
        let candidate = TaskId(format!(
            "task_{}_{}",
            millis,
            short_hash(name, millis, attempt)
        ));
        if !existing.contains(&candidate) {
            return candidate;
        }
    }

    // Hard fallback: accepts a vanishingly small collision risk
    TaskId(format!("task_{}_{}", millis, MAX_ID_ATTEMPTS))
}

/// Generates a milestone ID that does not collide with the given set
pub fn generate_milestone_id(
    name: &str,
    timestamp: DateTime<Utc>,
    existing: &HashSet<MilestoneId>,
) -> MilestoneId {
    let millis = timestamp.timestamp_millis();

    for attempt in 0..MAX_ID_ATTEMPTS {
        let candidate = MilestoneId(format!(
            "ms_{}_{}",
            millis,
            short_hash(name, millis, attempt)
        ));
        if !existing.contains(&candidate) {
            return candidate;
        }
    }

    MilestoneId(format!("ms_{}_{}", millis, MAX_ID_ATTEMPTS))
}
