//! Backups of targets taken before they are overwritten.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{BackupStage, EngineError};
use crate::model::FileDescriptor;

/// Copy `file`'s current bytes to `<backup_root>/<name>.bak`.
///
/// The backup is created (or truncated), filled, synced to disk and closed
/// before this returns, so the caller may overwrite the original right away.
/// The backup root must already exist; it is never created here. The
/// original's modification time is carried over to the copy.
///
/// Returns the backup path, or `None` when the descriptor did not request a
/// backup.
///
/// # Errors
/// `Backup` with the failing stage. A failed backup must stop the run.
pub fn backup_file(file: &FileDescriptor) -> Result<Option<PathBuf>, EngineError> {
    let Some(backup_path) = file.backup_path() else {
        return Ok(None);
    };
    write_backup(&file.absolute_path, &backup_path)?;
    tracing::debug!(
        original = %file.absolute_path.display(),
        backup = %backup_path.display(),
        "backup written"
    );
    Ok(Some(backup_path))
}

fn write_backup(original: &Path, backup_path: &Path) -> Result<(), EngineError> {
    let fail = |stage: BackupStage, path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| EngineError::Backup {
            stage,
            path,
            source,
        }
    };

    // Open the original first so a missing file leaves an older backup intact
    let mut source = File::open(original).map_err(fail(BackupStage::OpenSource, original))?;
    let mut backup = File::create(backup_path).map_err(fail(BackupStage::Create, backup_path))?;

    io::copy(&mut source, &mut backup).map_err(fail(BackupStage::Copy, backup_path))?;
    backup.sync_all().map_err(fail(BackupStage::Sync, backup_path))?;

    // Best effort: a backup with a fresh mtime is still a valid backup
    if let Ok(metadata) = source.metadata() {
        let mtime = filetime::FileTime::from_last_modification_time(&metadata);
        if let Err(e) = filetime::set_file_handle_times(&backup, None, Some(mtime)) {
            tracing::debug!(backup = %backup_path.display(), error = %e, "could not copy mtime");
        }
    }

    drop(source);
    drop(backup);
    Ok(())
}
