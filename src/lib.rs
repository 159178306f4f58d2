//! Gantt CLI - A local-first project timeline tool
//!
//! Gantt organizes work into milestones of dependent tasks, schedules them
//! across business days, and keeps an append-only change ledger so any past
//! state can be reconstructed or rolled back to.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{ChangeEntry, Milestone, MilestoneId, Task, TaskId};
