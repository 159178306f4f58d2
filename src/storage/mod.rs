//! # Storage Layer
//!
//! Persistence layer for Gantt CLI with git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Milestones | JSON array | `.gantt/milestones.json` |
//! | History | JSONL (one entry per line) | `.gantt/history.jsonl` |
//! | Config | TOML | `.gantt/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - Both stores use file locking (`fs2`) for concurrent access
//! - All full writes are atomic (temp file + rename)
//! - History is append-only; only a rollback rewrites it
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a Gantt project
//! - [`MilestoneStore`] - Read/write the milestone list
//! - [`HistoryStore`] - Append/read the change ledger
//! - [`Config`] - Project and global configuration

mod config;
mod project;
mod store;

pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig};
pub use project::{Project, ProjectError};
pub use store::{HistoryStore, MilestoneStore};
