//! Project management
//!
//! Handles project initialization and provides access to stores.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use thiserror::Error;

use super::{Config, HistoryStore, MilestoneStore};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Not in a gantt project. Run 'gantt init' first.")]
    NotInProject,

    #[error("Failed to create project: {0}")]
    CreateFailed(String),
}

/// A Gantt project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let gantt_dir = root.join(".gantt");

        if !gantt_dir.is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let gantt_dir = root.join(".gantt");

        fs::create_dir_all(&gantt_dir).with_context(|| {
            format!("Failed to create .gantt directory: {}", gantt_dir.display())
        })?;

        // Create default config
        let config_path = gantt_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = format!(
                r#"# Gantt CLI configuration

# First day of the project timeline
project_start = "{}"

# Chain milestones onto each other when scheduling
auto_sequence = true

# Keep manually pinned task dates during scheduling
preserve_manual_dates = false
"#,
                crate::domain::next_business_day(Local::now().date_naive())
            );
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .gantt directory path
    pub fn gantt_dir(&self) -> PathBuf {
        self.root.join(".gantt")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Returns the milestone store
    pub fn milestone_store(&self) -> MilestoneStore {
        MilestoneStore::for_project(&self.root)
    }

    /// Returns the history store
    pub fn history_store(&self) -> HistoryStore {
        HistoryStore::for_project(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_structure() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.gantt_dir().is_dir());
        assert!(project.gantt_dir().join("config.toml").is_file());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();

        Project::init(dir.path()).unwrap();
        Project::init(dir.path()).unwrap(); // Should not fail

        assert!(dir.path().join(".gantt").is_dir());
    }

    #[test]
    fn init_sets_project_start_to_next_business_day() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert_eq!(
            project.config().project.project_start,
            crate::domain::next_business_day(Local::now().date_naive())
        );
    }

    #[test]
    fn open_existing_project() {
        let dir = TempDir::new().unwrap();
        Project::init(dir.path()).unwrap();

        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.root(), dir.path());
    }

    #[test]
    fn open_non_project_fails() {
        let dir = TempDir::new().unwrap();
        let result = Project::open(dir.path());

        assert!(result.is_err());
    }

    #[test]
    fn stores_are_accessible() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.milestone_store().path().ends_with("milestones.json"));
        assert!(project.history_store().path().ends_with("history.jsonl"));
    }
}
