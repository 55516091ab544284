//! Status record of one document translation run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// Serializable progress of a translation, suitable for a status file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationTask {
    pub id: Uuid,
    pub status: TaskStatus,
    /// Percentage in `0..=100`
    pub progress: u8,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranslationTask {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: TaskStatus::Queued,
            progress: 0,
            input_path: input_path.into(),
            output_path: output_path.into(),
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.status = TaskStatus::Processing;
        self.progress = 0;
    }

    /// Record `done` of `total` pages rewritten. Stays below 100 until
    /// the task completes.
    pub fn set_progress(&mut self, done: usize, total: usize) {
        let percent = if total == 0 { 0 } else { done.min(total) * 100 / total };
        self.progress = u8::try_from(percent).unwrap_or(100).min(99);
    }

    pub fn complete(&mut self) {
        self.status = TaskStatus::Completed;
        self.progress = 100;
        self.error = None;
    }

    pub fn fail(&mut self, error: impl ToString) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.to_string());
    }

    pub const fn is_finished(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Write the task as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
