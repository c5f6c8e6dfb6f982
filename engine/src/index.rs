//! Directory indexing.
//!
//! Walks a root depth-first and returns one `FileDescriptor` per regular
//! file, in lexicographic order within each directory. The walk is
//! all-or-nothing: the first error aborts indexing and no partial index is
//! returned.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::EngineError;
use crate::model::{FileDescriptor, FileId};

/// Index every regular file under `root`.
///
/// Symlinks are never descended into. A link to a regular file is indexed
/// under the link's own path; a link to a directory is skipped; a link that
/// cannot be resolved aborts the walk.
///
/// # Arguments
/// * `root` - Directory to walk
/// * `backup_root` - Recorded on every descriptor when backups are requested;
///   not validated here
///
/// # Errors
/// `Traversal` when the root is missing or any entry cannot be read,
/// `BrokenLink` for an unresolvable symlink.
pub fn index_tree(
    root: &Path,
    backup_root: Option<&Path>,
) -> Result<Vec<FileDescriptor>, EngineError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| EngineError::Traversal {
            root: root.to_path_buf(),
            source: e,
        })?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let metadata = if file_type.is_symlink() {
            // walkdir already follows a symlinked root
            let resolved = fs::metadata(entry.path()).map_err(|e| EngineError::BrokenLink {
                path: entry.path().to_path_buf(),
                source: e,
            })?;
            if !resolved.is_file() {
                tracing::debug!(path = %entry.path().display(), "skipping link to non-file");
                continue;
            }
            resolved
        } else if file_type.is_file() {
            entry.metadata().map_err(|e| EngineError::Traversal {
                root: root.to_path_buf(),
                source: e,
            })?
        } else {
            tracing::debug!(path = %entry.path().display(), "skipping special file");
            continue;
        };

        let absolute_path =
            std::path::absolute(entry.path()).map_err(|e| EngineError::BrokenLink {
                path: entry.path().to_path_buf(),
                source: e,
            })?;

        let id = file_id(&absolute_path, &metadata)?;

        tracing::debug!(path = %absolute_path.display(), size = metadata.len(), "indexed");

        files.push(FileDescriptor {
            name: entry.file_name().to_os_string(),
            absolute_path,
            backup_root: backup_root.map(Path::to_path_buf),
            size: metadata.len(),
            id,
        });
    }

    Ok(files)
}

/// Identity of the file behind `path`; `metadata` must already follow links.
#[cfg(unix)]
fn file_id(_path: &Path, metadata: &fs::Metadata) -> Result<FileId, EngineError> {
    use std::os::unix::fs::MetadataExt;

    Ok(FileId::Inode {
        dev: metadata.dev(),
        ino: metadata.ino(),
    })
}

#[cfg(not(unix))]
fn file_id(path: &Path, _metadata: &fs::Metadata) -> Result<FileId, EngineError> {
    fs::canonicalize(path)
        .map(FileId::Canonical)
        .map_err(|e| EngineError::BrokenLink {
            path: path.to_path_buf(),
            source: e,
        })
}
