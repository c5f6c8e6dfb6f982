//! In-place content replacement.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{EngineError, ReplaceStage};

/// Sizes observed while overwriting one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Target length before the overwrite
    pub old_size: u64,
    /// Bytes copied from the replacement
    pub new_size: u64,
}

impl ReplaceOutcome {
    /// The new content is strictly larger than what it replaced.
    pub fn grew(&self) -> bool {
        self.new_size > self.old_size
    }
}

/// Overwrite `target` with the bytes of `with`, keeping the target's path
/// and inode.
///
/// The target is opened without truncation so its previous size can be
/// read, then truncated to zero, rewound and filled from `with`. A missing
/// target is created.
///
/// # Errors
/// `Replace` with the failing stage; the target may be left truncated when
/// the failure happens after the truncate.
pub fn replace_contents(target: &Path, with: &Path) -> Result<ReplaceOutcome, EngineError> {
    let fail = |stage: ReplaceStage, path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| EngineError::Replace {
            stage,
            path,
            source,
        }
    };

    let mut replacement = File::open(with).map_err(fail(ReplaceStage::OpenReplacement, with))?;

    let mut old = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(target)
        .map_err(fail(ReplaceStage::OpenTarget, target))?;

    let old_size = old
        .metadata()
        .map_err(fail(ReplaceStage::Stat, target))?
        .len();

    old.set_len(0).map_err(fail(ReplaceStage::Truncate, target))?;
    old.seek(SeekFrom::Start(0))
        .map_err(fail(ReplaceStage::Seek, target))?;

    let new_size = io::copy(&mut replacement, &mut old).map_err(fail(ReplaceStage::Copy, target))?;
    old.flush().map_err(fail(ReplaceStage::Flush, target))?;

    Ok(ReplaceOutcome { old_size, new_size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_replace_with_larger_content() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = temp_dir.path().join("blah.txt");
        let with = temp_dir.path().join("new.txt");
        fs::write(&target, b"0123456789").expect("Failed to write target");
        fs::write(&with, b"fifteen bytes!!").expect("Failed to write replacement");

        let outcome = replace_contents(&target, &with).expect("Replace failed");

        assert_eq!(
            outcome,
            ReplaceOutcome {
                old_size: 10,
                new_size: 15,
            }
        );
        assert!(outcome.grew());
        assert_eq!(fs::read(&target).expect("Failed to read target"), b"fifteen bytes!!");
    }

    #[test]
    fn test_replace_with_smaller_content_leaves_no_tail() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = temp_dir.path().join("bleep.txt");
        let with = temp_dir.path().join("small.txt");
        fs::write(&target, b"twenty bytes of text").expect("Failed to write target");
        fs::write(&with, b"small").expect("Failed to write replacement");

        let outcome = replace_contents(&target, &with).expect("Replace failed");

        assert_eq!(
            outcome,
            ReplaceOutcome {
                old_size: 20,
                new_size: 5,
            }
        );
        assert!(!outcome.grew());
        assert_eq!(fs::read(&target).expect("Failed to read target"), b"small");
    }

    #[test]
    fn test_replace_equal_size_does_not_grow() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = temp_dir.path().join("a");
        let with = temp_dir.path().join("b");
        fs::write(&target, b"aaaa").expect("Failed to write target");
        fs::write(&with, b"bbbb").expect("Failed to write replacement");

        let outcome = replace_contents(&target, &with).expect("Replace failed");
        assert!(!outcome.grew());
    }

    #[test]
    fn test_replace_twice_is_idempotent() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = temp_dir.path().join("t.bin");
        let with = temp_dir.path().join("r.bin");
        fs::write(&target, b"original").expect("Failed to write target");
        fs::write(&with, [0u8, 159, 146, 150, 255]).expect("Failed to write replacement");

        replace_contents(&target, &with).expect("First replace failed");
        let once = fs::read(&target).expect("Failed to read target");
        let second = replace_contents(&target, &with).expect("Second replace failed");

        assert_eq!(fs::read(&target).expect("Failed to read target"), once);
        assert_eq!(
            second,
            ReplaceOutcome {
                old_size: 5,
                new_size: 5,
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_keeps_inode() {
        use std::os::unix::fs::MetadataExt;

        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = temp_dir.path().join("t");
        let with = temp_dir.path().join("r");
        fs::write(&target, b"before").expect("Failed to write target");
        fs::write(&with, b"after").expect("Failed to write replacement");
        let inode = fs::metadata(&target).expect("Failed to stat").ino();

        replace_contents(&target, &with).expect("Replace failed");

        assert_eq!(fs::metadata(&target).expect("Failed to stat").ino(), inode);
    }

    #[test]
    fn test_replace_missing_replacement_leaves_target() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = temp_dir.path().join("t");
        fs::write(&target, b"keep me").expect("Failed to write target");

        let err = replace_contents(&target, &temp_dir.path().join("missing")).unwrap_err();

        assert!(matches!(
            err,
            EngineError::Replace {
                stage: ReplaceStage::OpenReplacement,
                ..
            }
        ));
        assert_eq!(fs::read(&target).expect("Failed to read target"), b"keep me");
    }

    #[test]
    fn test_replace_creates_missing_target() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = temp_dir.path().join("new-target");
        let with = temp_dir.path().join("r");
        fs::write(&with, b"content").expect("Failed to write replacement");

        let outcome = replace_contents(&target, &with).expect("Replace failed");

        assert_eq!(outcome.old_size, 0);
        assert_eq!(fs::read(&target).expect("Failed to read target"), b"content");
    }
}
