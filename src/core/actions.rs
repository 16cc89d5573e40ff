use crate::error::Result;
use crate::utils::fs as fs_utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A file operation deferred to the next startup, recorded together with
/// when it was requested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEntry {
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub command: ActionCommand,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionCommand {
    Delete { path: PathBuf },
}

impl std::fmt::Display for ActionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionCommand::Delete { path } => write!(f, "delete {}", path.display()),
        }
    }
}

/// Sink for file operations that must wait until the next startup
pub trait ActionLog: Send + Sync {
    /// Record that `path` must be deleted before the next session uses it
    fn append_delete(&self, path: &Path) -> Result<()>;
}

/// Journal of startup actions, one JSON entry per line. Appends are
/// serialized through a mutex so concurrent writers cannot interleave
/// partial lines.
pub struct ActionJournal {
    path: PathBuf,
    write: Mutex<()>,
}

impl ActionJournal {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            write: Mutex::new(()),
        }
    }

    /// Entries waiting to run, oldest first
    pub fn pending(&self) -> Result<Vec<ActionEntry>> {
        read_entries(&self.path)
    }
}

impl ActionLog for ActionJournal {
    fn append_delete(&self, path: &Path) -> Result<()> {
        let entry = ActionEntry {
            recorded_at: Utc::now(),
            command: ActionCommand::Delete {
                path: path.to_path_buf(),
            },
        };
        let line = serde_json::to_string(&entry)?;

        let _guard = self.write.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent() {
            fs_utils::ensure_dir_exists(parent)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Execute and consume the journal at `path`. Entries run in the order they
/// were recorded; a target that is already gone is skipped. Any other
/// failure keeps the journal in place so the next start retries it.
pub fn run_startup_actions(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let entries = read_entries(path)?;
    for entry in &entries {
        match &entry.command {
            ActionCommand::Delete { path: target } => {
                if !target.exists() {
                    log::debug!("startup delete: {} already gone", target.display());
                    continue;
                }
                log::info!("startup delete: {}", target.display());
                if target.is_dir() {
                    fs_utils::remove_dir_recursive(target)?;
                } else {
                    fs::remove_file(target)?;
                }
            }
        }
    }

    fs::remove_file(path)?;
    Ok(())
}

/// A line that does not parse is skipped with a warning rather than
/// blocking every later entry behind it.
fn read_entries(path: &Path) -> Result<Vec<ActionEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => log::warn!("skipping malformed startup action '{}': {}", line, e),
        }
    }
    Ok(entries)
}
