//! File stores for milestones and the change ledger
//!
//! Milestones live in `.gantt/milestones.json` as a single pretty-printed
//! JSON array, rewritten atomically on every save. History lives in
//! `.gantt/history.jsonl` with one entry per line and is append-only except
//! for rollbacks. Both use file locking for concurrent access safety.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::domain::{ChangeEntry, Milestone};

/// Store for the ordered milestone list
pub struct MilestoneStore {
    path: PathBuf,
}

impl MilestoneStore {
    /// Creates a new milestone store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".gantt").join("milestones.json"))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all milestones, preserving file order
    pub fn read_all(&self) -> Result<Vec<Milestone>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).with_context(|| {
            format!("Failed to open milestone store: {}", self.path.display())
        })?;

        // Shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on milestone store")?;

        let reader = BufReader::new(&file);
        let milestones: Vec<Milestone> = serde_json::from_reader(reader).with_context(|| {
            format!("Failed to parse milestone store: {}", self.path.display())
        })?;

        // Lock is released when file is dropped
        Ok(milestones)
    }

    /// Writes all milestones (full atomic rewrite)
    pub fn write_all(&self, milestones: &[Milestone]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("json.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on milestone store")?;

            let mut writer = BufWriter::new(&file);
            serde_json::to_writer_pretty(&mut writer, milestones)
                .context("Failed to serialize milestones")?;
            writeln!(writer).context("Failed to write milestone store")?;

            writer.flush().context("Failed to flush milestone store")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }
}

/// Store for the append-only change ledger
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Creates a new history store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".gantt").join("history.jsonl"))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the full ledger in recorded order
    pub fn read_all(&self) -> Result<Vec<ChangeEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open history store: {}", self.path.display()))?;

        file.lock_shared()
            .context("Failed to acquire read lock on history store")?;

        let reader = BufReader::new(&file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: ChangeEntry = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse history entry at line {}", line_num + 1))?;

            entries.push(entry);
        }

        Ok(entries)
    }

    /// Appends entries to the ledger without rewriting it
    pub fn append_all(&self, entries: &[ChangeEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history store: {}", self.path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on history store")?;

        let mut writer = BufWriter::new(&file);
        for entry in entries {
            let line = serde_json::to_string(entry).context("Failed to serialize history entry")?;
            writeln!(writer, "{}", line).context("Failed to write history entry")?;
        }

        writer.flush().context("Failed to flush history store")?;

        Ok(())
    }

    /// Rewrites the whole ledger (used by rollback truncation)
    pub fn write_all(&self, entries: &[ChangeEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on history store")?;

            let mut writer = BufWriter::new(&file);
            for entry in entries {
                let line =
                    serde_json::to_string(entry).context("Failed to serialize history entry")?;
                writeln!(writer, "{}", line).context("Failed to write history entry")?;
            }

            writer.flush().context("Failed to flush history store")?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }
}
