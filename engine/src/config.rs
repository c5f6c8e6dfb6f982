//! Run configuration.
//!
//! A `RunConfig` is built once, resolved to absolute paths, and then passed by
//! reference to every stage of the run. Nothing in the engine reads global
//! state.

use std::path::{Component, Path, PathBuf};

use crate::checksums::ChecksumAlgorithm;
use crate::error::EngineError;
use crate::matcher::MatchPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Tree whose files get overwritten
    pub target_root: PathBuf,

    /// Tree searched for replacement content
    pub replacement_root: PathBuf,

    /// Directory receiving `.bak` copies; `None` disables backups
    pub backup_root: Option<PathBuf>,

    pub match_policy: MatchPolicy,

    /// Re-hash each written file and compare against its source
    pub verify: Option<ChecksumAlgorithm>,

    /// Plan only; no file is written
    pub dry_run: bool,
}

impl RunConfig {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(target_root: P, replacement_root: Q) -> Self {
        RunConfig {
            target_root: target_root.as_ref().to_path_buf(),
            replacement_root: replacement_root.as_ref().to_path_buf(),
            backup_root: None,
            match_policy: MatchPolicy::default(),
            verify: None,
            dry_run: false,
        }
    }

    pub fn with_backup_root<P: AsRef<Path>>(mut self, backup_root: P) -> Self {
        self.backup_root = Some(backup_root.as_ref().to_path_buf());
        self
    }

    pub fn with_match_policy(mut self, match_policy: MatchPolicy) -> Self {
        self.match_policy = match_policy;
        self
    }

    pub fn with_verify(mut self, algorithm: Option<ChecksumAlgorithm>) -> Self {
        self.verify = algorithm;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Clean every path and make it absolute against the current directory.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for an empty path or when the current
    /// directory cannot be determined.
    pub fn resolve(mut self) -> Result<Self, EngineError> {
        self.target_root = resolve_path(&self.target_root)?;
        self.replacement_root = resolve_path(&self.replacement_root)?;
        if let Some(backup_root) = self.backup_root.take() {
            self.backup_root = Some(resolve_path(&backup_root)?);
        }
        Ok(self)
    }
}

/// Clean `path` lexically, then make it absolute.
pub fn resolve_path(path: &Path) -> Result<PathBuf, EngineError> {
    if path.as_os_str().is_empty() {
        return Err(EngineError::InvalidConfig {
            path: path.to_path_buf(),
            reason: "path is empty".to_string(),
        });
    }
    let absolute = std::path::absolute(path).map_err(|e| EngineError::InvalidConfig {
        path: path.to_path_buf(),
        reason: format!("cannot make path absolute: {}", e),
    })?;
    Ok(clean_path(&absolute))
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. Does not touch the filesystem, so symlinks are not
/// resolved.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = cleaned.components().next_back();
                let after_normal = matches!(last, Some(Component::Normal(_)));
                // `..` at the root stays at the root
                let at_root = matches!(last, Some(Component::RootDir | Component::Prefix(_)));
                if after_normal {
                    cleaned.pop();
                } else if !at_root {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}
