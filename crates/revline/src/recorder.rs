//! CSV run logs.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::sample::Metrics;

/// Writes every frame of a session to `run_log_<unix seconds>.csv`.
///
/// The header row is written and flushed on creation, and each row is flushed
/// as it is recorded, so a crash loses at most the frame in flight.
#[derive(Debug)]
pub struct RunRecorder {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: u64,
}

impl RunRecorder {
    /// Start a new log in `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn create(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| Error::DirectoryCreate {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }
        let path = dir.join(format!("run_log_{}.csv", Utc::now().timestamp()));
        Self::create_at(path)
    }

    /// Start a new log at an explicit path, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create_at(path: PathBuf) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;
        writer.write_record(Metrics::HEADERS)?;
        writer.flush()?;
        info!(path = %path.display(), "Recording run log");

        Ok(Self {
            writer,
            path,
            rows: 0,
        })
    }

    /// Append one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    pub fn record(&mut self, metrics: &Metrics) -> Result<()> {
        self.writer.serialize(metrics)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Where the log is being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far.
    #[must_use]
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl Drop for RunRecorder {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), rows = self.rows, "Run log closed");
    }
}
