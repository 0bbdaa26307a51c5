use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

const FILE_PREFIX: &str = "claude-stop-attempts-";

/// Per-project attempt counter stored as plain text in a state directory.
///
/// Files are only removed when checks pass or retries run out; a session that
/// is abandoned mid-way leaves its file behind.
#[derive(Debug, Clone)]
pub struct RetryCounter {
    path: PathBuf,
}

impl RetryCounter {
    pub fn for_project(state_dir: &Path, project_dir: &Path) -> Self {
        Self {
            path: retry_file(state_dir, project_dir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The attempt number for this invocation: stored value plus one.
    ///
    /// A missing, unreadable or unparseable file starts over at 1.
    pub fn next_attempt(&self) -> u32 {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(previous) => previous.saturating_add(1),
                Err(_) => {
                    log::warn!(
                        "ignoring corrupt retry counter {:?} in {}",
                        raw.trim(),
                        self.path.display()
                    );
                    1
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => 1,
            Err(e) => {
                log::warn!("could not read {}: {e}", self.path.display());
                1
            }
        }
    }

    pub fn store(&self, attempt: u32) -> Result<()> {
        fs::write(&self.path, attempt.to_string())
            .with_context(|| format!("failed to write {}", self.path.display()))
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }
}

/// Stable counter path: first 16 hex chars of the SHA-256 of the project path.
pub fn retry_file(state_dir: &Path, project_dir: &Path) -> PathBuf {
    let digest = Sha256::digest(project_dir.to_string_lossy().as_bytes());
    let hash = hex::encode(digest);
    state_dir.join(format!("{FILE_PREFIX}{}", &hash[..16]))
}
