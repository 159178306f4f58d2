//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init`, `validate` |
//! | Milestone | Milestone lifecycle | `milestone add`, `milestone list` |
//! | Task | Work item management | `task add`, `task move`, `task split` |
//! | Schedule | Date computation | `schedule`, `schedule --preserve-manual-dates` |
//! | History | Change ledger | `history list`, `history rollback` |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output:
//! ```bash
//! gantt --verbose schedule
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod history_cmd;
mod milestone;
mod output;
mod schedule_cmd;
mod task;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
