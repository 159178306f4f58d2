//! Domain models for Gantt CLI
//!
//! Contains the core business logic without any I/O concerns. Everything in
//! here is pure: functions take state in and hand new state back, and
//! persistence lives entirely in the storage layer.

mod calendar;
mod graph;
mod history;
mod id;
mod ops;
mod replay;
mod schedule;
mod task;

pub use calendar::{add_business_days, is_business_day, next_business_day};
pub use graph::{validate_dependencies, ValidationReport};
pub use history::{
    create_change_entry, detect_milestone_changes, detect_task_changes,
    generate_change_description, get_filtered_history, group_history_by_date, log_change,
    ChangeContext, ChangeEntry, ChangePayload, ChangeType, EntityKind, EntitySnapshot,
    HistoryFilter, HistoryOptions,
};
pub use id::{generate_milestone_id, generate_task_id, IdError, MilestoneId, TaskId};
pub use ops::{
    add_milestone_with_tracking, add_task_with_tracking, clone_task_with_tracking,
    move_task_with_tracking, remove_milestone_with_tracking, remove_task_with_tracking,
    rename_milestone_with_tracking, split_task_with_tracking, update_task_with_tracking, NewTask,
    SplitPart, TaskUpdate, Tracked,
};
pub use replay::{apply_change_to_state, reconstruct_state_at_change, rollback_to_change, Rollback};
pub use schedule::{compute_schedule, ScheduleError, ScheduleOptions};
pub use task::{all_milestone_ids, all_task_ids, find_milestone, find_task, Milestone, Task};
