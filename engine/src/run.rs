//! Run orchestration.
//!
//! A run has two halves:
//! - planning: index the replacement root, index the target root, pair them
//! - execution: for each pair, back up the target (if asked) and overwrite it
//!
//! Everything is sequential and the first error ends the run.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use uuid::Uuid;

use crate::backup::backup_file;
use crate::checksums;
use crate::config::RunConfig;
use crate::error::EngineError;
use crate::index::index_tree;
use crate::matcher::pair_files;
use crate::model::{ReplacementRecord, RunPhase, RunPlan, RunReport};
use crate::progress::ProgressCallback;
use crate::replace::replace_contents;

/// Index both roots and match targets against replacements.
///
/// Nothing is written. The replacement root is indexed first, then the
/// target root; only target descriptors carry the backup root.
///
/// # Errors
/// Returns the first traversal error from either root.
pub fn plan_run(
    config: &RunConfig,
    progress: Option<&dyn ProgressCallback>,
) -> Result<RunPlan, EngineError> {
    if let Some(callback) = progress {
        callback.on_phase_started(config, RunPhase::IndexReplacements);
    }
    tracing::info!(root = %config.replacement_root.display(), "searching for replacement files");
    let replacements = index_tree(&config.replacement_root, None)?;

    if let Some(callback) = progress {
        callback.on_phase_started(config, RunPhase::IndexTargets);
    }
    tracing::info!(root = %config.target_root.display(), "searching for targets to replace");
    let targets = index_tree(&config.target_root, config.backup_root.as_deref())?;

    let pairs = pair_files(&targets, &replacements, config.match_policy);
    tracing::info!(
        replacements = replacements.len(),
        targets = targets.len(),
        pairs = pairs.len(),
        policy = %config.match_policy,
        "matching complete"
    );

    let plan = RunPlan {
        replacements,
        targets,
        pairs,
    };
    if let Some(callback) = progress {
        callback.on_plan_ready(&plan);
    }
    Ok(plan)
}

/// Execute a plan: back up and overwrite every matched target in order.
///
/// A target matched by several replacements is overwritten once per match;
/// its backup is taken only before the first overwrite so the `.bak` always
/// holds the original bytes.
///
/// # Errors
/// Fails before any write when the backup root is unusable or two targets
/// share a backup path. Otherwise stops at the first backup, replace or
/// verification failure; pairs already executed stay executed.
pub fn execute_plan(
    config: &RunConfig,
    plan: &RunPlan,
    progress: Option<&dyn ProgressCallback>,
) -> Result<Vec<ReplacementRecord>, EngineError> {
    check_backup_root(config)?;
    check_backup_collisions(plan)?;

    if let Some(callback) = progress {
        callback.on_phase_started(config, RunPhase::Replace);
    }
    tracing::info!(pairs = plan.pairs.len(), "replacing the files");

    let mut records = Vec::with_capacity(plan.pairs.len());
    let mut backed_up: HashSet<usize> = HashSet::new();

    for (index, pair) in plan.pairs.iter().enumerate() {
        let (target, replacement) = plan.resolve(*pair);

        // backup is closed and synced before the target is reopened for writing
        let backup = if backed_up.insert(pair.target_index) {
            backup_file(target)?
        } else {
            None
        };

        let outcome = replace_contents(&target.absolute_path, &replacement.absolute_path)?;

        let checksum = match config.verify {
            Some(algorithm) => Some(checksums::verify_copy(
                &replacement.absolute_path,
                &target.absolute_path,
                algorithm,
            )?),
            None => None,
        };

        let record = ReplacementRecord {
            target: target.absolute_path.clone(),
            replacement: replacement.absolute_path.clone(),
            backup,
            old_size: outcome.old_size,
            new_size: outcome.new_size,
            checksum,
        };

        tracing::debug!(
            target = %record.target.display(),
            replacement = %record.replacement.display(),
            old_size = record.old_size,
            new_size = record.new_size,
            "replaced"
        );

        if record.grew() {
            tracing::warn!(
                target = %record.target.display(),
                old_size = record.old_size,
                new_size = record.new_size,
                "the new file is larger than the one it replaced"
            );
            if let Some(callback) = progress {
                callback.on_size_warning(&record);
            }
        }

        if let Some(callback) = progress {
            callback.on_file_replaced(index, &record);
        }
        records.push(record);
    }

    Ok(records)
}

/// Plan and, unless `config.dry_run` is set, execute a full run.
///
/// # Errors
/// Any traversal, configuration, backup, replace or verification error
/// aborts the run and is returned unchanged.
pub fn run(
    config: &RunConfig,
    progress: Option<&dyn ProgressCallback>,
) -> Result<RunReport, EngineError> {
    let id = Uuid::new_v4();
    let span = tracing::info_span!("run", %id);
    let _guard = span.enter();

    let start_time = SystemTime::now();
    let plan = plan_run(config, progress)?;

    let records = if config.dry_run {
        check_backup_root(config)?;
        check_backup_collisions(&plan)?;
        tracing::info!(pairs = plan.pairs.len(), "dry run, no files written");
        Vec::new()
    } else {
        execute_plan(config, &plan, progress)?
    };

    let report = RunReport {
        id,
        replacements_indexed: plan.replacements.len(),
        targets_indexed: plan.targets.len(),
        planned: plan.pairs.len(),
        records,
        dry_run: config.dry_run,
        start_time,
        end_time: SystemTime::now(),
    };

    tracing::info!(replaced = report.records.len(), "done");
    if let Some(callback) = progress {
        callback.on_run_completed(&report);
    }
    Ok(report)
}

/// The backup root, when configured, must be an existing directory.
fn check_backup_root(config: &RunConfig) -> Result<(), EngineError> {
    let Some(backup_root) = config.backup_root.as_deref() else {
        return Ok(());
    };
    match fs::metadata(backup_root) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(EngineError::InvalidConfig {
            path: backup_root.to_path_buf(),
            reason: "backup root is not a directory".to_string(),
        }),
        Err(e) => Err(EngineError::InvalidConfig {
            path: backup_root.to_path_buf(),
            reason: format!("backup root is not accessible: {}", e),
        }),
    }
}

/// Backups are named after the file alone, so two planned targets with the
/// same name in different directories would overwrite each other's `.bak`.
fn check_backup_collisions(plan: &RunPlan) -> Result<(), EngineError> {
    let mut claimed: HashMap<PathBuf, usize> = HashMap::new();
    for pair in &plan.pairs {
        let target = &plan.targets[pair.target_index];
        let Some(backup) = target.backup_path() else {
            continue;
        };
        match claimed.get(&backup) {
            Some(&first) if first != pair.target_index => {
                return Err(EngineError::BackupCollision {
                    backup,
                    first: plan.targets[first].absolute_path.clone(),
                    second: target.absolute_path.clone(),
                });
            }
            Some(_) => {}
            None => {
                claimed.insert(backup, pair.target_index);
            }
        }
    }
    Ok(())
}
