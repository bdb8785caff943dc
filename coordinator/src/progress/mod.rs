//! Durable run progress.
//!
//! [`ProgressStore`] persists a single [`ProgressCheckpoint`]; [`tracker::ProgressTracker`]
//! decides what goes into it as packets are retired.

pub mod tracker;

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::debug;
use shared::models::checkpoint::ProgressCheckpoint;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("checkpoint I/O failed on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("checkpoint at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("checkpoint save did not complete: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

pub trait ProgressStore: Send {
    /// The saved checkpoint, or `None` when no run is in progress.
    fn load(&self) -> Result<Option<ProgressCheckpoint>, StoreError>;

    /// Replaces the saved checkpoint. A crash during `save` leaves either the old or the
    /// new checkpoint readable, never a torn one.
    fn save(&mut self, checkpoint: &ProgressCheckpoint) -> Result<(), StoreError>;

    /// Forgets the run so the next one starts fresh.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Keeps the checkpoint as a JSON file, replaced through a temporary file and a rename.
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    path: PathBuf,
}

impl FileProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "checkpoint".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io { path, source }
}

/// Flushes the directory entry so the rename itself survives a power loss.
#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => File::open(dir)?.sync_all(),
        _ => File::open(".")?.sync_all(),
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}

impl ProgressStore for FileProgressStore {
    fn load(&self) -> Result<Option<ProgressCheckpoint>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&self.path)(e)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&mut self, checkpoint: &ProgressCheckpoint) -> Result<(), StoreError> {
        let temp_path = self.temp_path();
        let serialized = serde_json::to_vec(checkpoint).map_err(|source| StoreError::Corrupt {
            path: temp_path.clone(),
            source,
        })?;

        let mut file = File::create(&temp_path).map_err(io_error(&temp_path))?;
        file.write_all(&serialized)
            .and_then(|_| file.sync_all())
            .map_err(io_error(&temp_path))?;
        fs::rename(&temp_path, &self.path).map_err(io_error(&self.path))?;
        sync_parent(&self.path).map_err(io_error(&self.path))?;

        debug!("Checkpoint saved: {:?}", checkpoint);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        for path in [self.temp_path(), self.path.clone()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(&path)(e)),
            }
        }
        debug!("Checkpoint cleared at {}", self.path.display());
        Ok(())
    }
}
