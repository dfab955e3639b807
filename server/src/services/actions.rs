//! Action log — append-only JSON file of recorded interaction events.
//!
//! DESIGN
//! ======
//! The file holds one JSON array. Each append reads the array, pushes the
//! new record, and rewrites the file, all under an async mutex so concurrent
//! requests never interleave. A missing file reads as empty; an unreadable
//! array is logged and treated as empty, so the next append starts over.
//!
//! The stored format is the one the trajectory exporter reads.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uml_agent::trajectory::ActionRecord;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ActionLogError {
    #[error("action_type is required")]
    MissingActionType,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct ActionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ActionLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Assign an id, fill a missing timestamp, and append.
    ///
    /// # Errors
    ///
    /// Returns [`ActionLogError::MissingActionType`] for a blank action type,
    /// or an I/O or JSON error when the file cannot be rewritten.
    pub async fn record(&self, mut record: ActionRecord) -> Result<ActionRecord, ActionLogError> {
        if record.action_type.trim().is_empty() {
            return Err(ActionLogError::MissingActionType);
        }
        record.action_id = Some(Uuid::new_v4().to_string());
        if record.timestamp.trim().is_empty() {
            record.timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        }

        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.push(record.clone());
        let body = serde_json::to_vec_pretty(&records)?;
        tokio::fs::write(&self.path, body).await?;

        info!(
            action_type = %record.action_type,
            action_id = record.action_id.as_deref().unwrap_or_default(),
            total = records.len(),
            "actions: recorded"
        );
        Ok(record)
    }

    /// All recorded actions in append order.
    ///
    /// # Errors
    ///
    /// Returns an I/O error other than a missing file.
    pub async fn list(&self) -> Result<Vec<ActionRecord>, ActionLogError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn load(&self) -> Result<Vec<ActionRecord>, ActionLogError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let text = String::from_utf8_lossy(&bytes);
        let text = text.trim_start_matches('\u{feff}');
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str(text) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "actions: unreadable log, starting empty");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;
