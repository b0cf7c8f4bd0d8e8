//! Persisted advance counter for resuming a run

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file holding one ASCII integer: the number of completed advances
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the last saved value, or 0 if the file is absent or corrupt
    pub fn load(&self) -> u32 {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => content.trim().parse().unwrap_or_else(|_| {
                warn!(
                    "Ignoring unreadable checkpoint in {}: {:?}",
                    self.path.display(),
                    content.trim()
                );
                0
            }),
            Err(_) => 0,
        }
    }

    /// Overwrites the stored value
    ///
    /// Failures are logged and reported through the return value; they never
    /// abort a run.
    pub fn save(&self, advances: u32) -> bool {
        match std::fs::write(&self.path, advances.to_string()) {
            Ok(()) => {
                debug!("Checkpoint saved: {} advances", advances);
                true
            }
            Err(e) => {
                warn!("Could not save checkpoint to {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Removes the stored value so the next resume starts from zero
    pub fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Checkpoint {} cleared", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not clear checkpoint {}: {}", self.path.display(), e),
        }
    }
}
