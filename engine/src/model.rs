//! Core data model for replacement runs.
//!
//! - FileDescriptor: one regular file discovered while indexing a root
//! - RunPlan: both indexes plus the matched (target, replacement) pairs
//! - ReplacementRecord / RunReport: what a run actually did
//! - RunPhase: coarse progress markers announced to callbacks

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::SystemTime;
use uuid::Uuid;

use crate::checksums::ChecksumValue;

/// Extension appended to the original file name for backup copies.
pub const BACKUP_EXTENSION: &str = "bak";

/// A regular file discovered while walking a root.
///
/// Descriptors are created once during indexing and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Base file name including extension
    pub name: OsString,

    /// Absolute path of the file on disk (never a directory)
    pub absolute_path: PathBuf,

    /// Directory receiving the `.bak` copy; present only when backups were requested
    pub backup_root: Option<PathBuf>,

    /// Size in bytes observed while indexing
    pub size: u64,

    /// Identity of the file the path resolves to
    pub id: FileId,
}

impl FileDescriptor {
    /// True when this file must be backed up before it is overwritten.
    pub fn backup_requested(&self) -> bool {
        self.backup_root.is_some()
    }

    /// Location of the backup copy: `<backup_root>/<name>.bak`.
    pub fn backup_path(&self) -> Option<PathBuf> {
        self.backup_root.as_ref().map(|root| {
            let mut file_name = self.name.clone();
            file_name.push(".");
            file_name.push(BACKUP_EXTENSION);
            root.join(file_name)
        })
    }

    /// True when both descriptors reach the same file on disk, through a
    /// symlink, a hard link, or the same path.
    pub fn is_same_file(&self, other: &FileDescriptor) -> bool {
        self.id == other.id
    }
}

/// What makes two paths the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileId {
    /// Device and inode number of the resolved file
    Inode { dev: u64, ino: u64 },
    /// Canonical path, on platforms without inode numbers
    Canonical(PathBuf),
}

/// One matched pair, as indexes into the plan's descriptor lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedReplacement {
    pub target_index: usize,
    pub replacement_index: usize,
}

/// Result of indexing both roots and matching them, before any write.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub replacements: Vec<FileDescriptor>,
    pub targets: Vec<FileDescriptor>,
    /// Pairs in execution order: targets in index order, replacements reversed
    pub pairs: Vec<PlannedReplacement>,
}

impl RunPlan {
    /// Resolve a pair into its target and replacement descriptors.
    pub fn resolve(&self, pair: PlannedReplacement) -> (&FileDescriptor, &FileDescriptor) {
        (
            &self.targets[pair.target_index],
            &self.replacements[pair.replacement_index],
        )
    }

    /// Iterate over resolved pairs in execution order.
    pub fn iter_pairs(&self) -> impl Iterator<Item = (&FileDescriptor, &FileDescriptor)> + '_ {
        self.pairs.iter().map(move |pair| self.resolve(*pair))
    }
}

/// What happened to one target during the replace phase.
#[derive(Debug, Clone)]
pub struct ReplacementRecord {
    pub target: PathBuf,
    pub replacement: PathBuf,
    /// Backup written before the overwrite, if any
    pub backup: Option<PathBuf>,
    /// Target size before the overwrite
    pub old_size: u64,
    /// Bytes written into the target
    pub new_size: u64,
    /// Checksum of the written content when verification was requested
    pub checksum: Option<ChecksumValue>,
}

impl ReplacementRecord {
    /// The replacement made the file larger than before.
    pub fn grew(&self) -> bool {
        self.new_size > self.old_size
    }
}

/// Summary of a finished (or dry) run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Unique identifier for this run, also attached to its tracing span
    pub id: Uuid,

    pub replacements_indexed: usize,
    pub targets_indexed: usize,

    /// Pairs matched by the planner (executed or, in a dry run, only listed)
    pub planned: usize,

    /// Replacements performed, in execution order (empty for dry runs)
    pub records: Vec<ReplacementRecord>,

    pub dry_run: bool,

    pub start_time: SystemTime,
    pub end_time: SystemTime,
}

impl RunReport {
    /// Number of replacements that grew their target.
    pub fn size_warnings(&self) -> usize {
        self.records.iter().filter(|r| r.grew()).count()
    }

    /// Number of backup files written.
    pub fn backups_written(&self) -> usize {
        self.records.iter().filter(|r| r.backup.is_some()).count()
    }
}

/// Phase boundaries announced during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Walking the replacement root
    IndexReplacements,
    /// Walking the target root
    IndexTargets,
    /// Backing up and overwriting matched targets
    Replace,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::IndexReplacements => write!(f, "index-replacements"),
            RunPhase::IndexTargets => write!(f, "index-targets"),
            RunPhase::Replace => write!(f, "replace"),
        }
    }
}
