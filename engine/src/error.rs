//! Error types for the replacement engine.
//!
//! Every failure during a run is unrecoverable: the orchestrator stops at the
//! first `EngineError` and hands it to the caller. The size warning emitted
//! when a replacement grows a file is not an error and is reported through
//! tracing and the progress callback instead.

use std::fmt::{self, Display};
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Step of the backup routine that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStage {
    /// Creating (or truncating) the `.bak` file
    Create,
    /// Opening the original file for reading
    OpenSource,
    /// Streaming bytes into the backup
    Copy,
    /// Flushing the backup to durable storage
    Sync,
}

impl Display for BackupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create backup file"),
            Self::OpenSource => write!(f, "open original"),
            Self::Copy => write!(f, "copy bytes"),
            Self::Sync => write!(f, "sync backup"),
        }
    }
}

/// Step of the in-place replace that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStage {
    OpenReplacement,
    OpenTarget,
    Stat,
    Truncate,
    Seek,
    Copy,
    Flush,
}

impl Display for ReplaceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenReplacement => write!(f, "open replacement"),
            Self::OpenTarget => write!(f, "open target"),
            Self::Stat => write!(f, "read target size"),
            Self::Truncate => write!(f, "truncate target"),
            Self::Seek => write!(f, "seek target to start"),
            Self::Copy => write!(f, "copy bytes"),
            Self::Flush => write!(f, "flush target"),
        }
    }
}

/// Errors that abort a replacement run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Walking a root failed (missing root, permissions, broken link)
    #[error("failed to index {}", .root.display())]
    Traversal {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A symlink inside the tree could not be resolved
    #[error("failed to resolve link {}", .path.display())]
    BrokenLink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Backing up a target failed; the target has not been touched
    #[error("backup of {} failed ({stage})", .path.display())]
    Backup {
        stage: BackupStage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Overwriting a target failed
    #[error("replacing {} failed ({stage})", .path.display())]
    Replace {
        stage: ReplaceStage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Two planned targets would back up to the same `.bak` file
    #[error(
        "{} and {} would both be backed up to {}",
        .first.display(),
        .second.display(),
        .backup.display()
    )]
    BackupCollision {
        backup: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    /// Configuration rejected before any write
    #[error("invalid configuration for {}: {reason}", .path.display())]
    InvalidConfig {
        path: PathBuf,
        reason: String,
    },

    /// Could not read a file to checksum it
    #[error("failed to checksum {}", .path.display())]
    Checksum {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Written bytes do not hash to the expected value
    #[error("verification failed for {}: expected {expected}, found {actual}", .path.display())]
    VerificationFailed {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl EngineError {
    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Traversal { source, .. } => source.io_error().and_then(io::Error::raw_os_error),
            Self::BrokenLink { source, .. }
            | Self::Backup { source, .. }
            | Self::Replace { source, .. }
            | Self::Checksum { source, .. } => source.raw_os_error(),
            Self::BackupCollision { .. }
            | Self::InvalidConfig { .. }
            | Self::VerificationFailed { .. } => None,
        }
    }

    /// Path the failure is attributed to.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Traversal { source, root } => Some(source.path().unwrap_or(root.as_path())),
            Self::BackupCollision { second, .. } => Some(second.as_path()),
            Self::BrokenLink { path, .. }
            | Self::Backup { path, .. }
            | Self::Replace { path, .. }
            | Self::InvalidConfig { path, .. }
            | Self::Checksum { path, .. }
            | Self::VerificationFailed { path, .. } => Some(path.as_path()),
        }
    }
}
