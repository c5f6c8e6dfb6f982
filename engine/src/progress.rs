//! Progress reporting trait.
//!
//! Decouples the engine from whatever front end drives it. All methods are
//! called synchronously from the run loop.

use crate::config::RunConfig;
use crate::model::{ReplacementRecord, RunPhase, RunPlan, RunReport};

/// Receives notifications while a run executes.
pub trait ProgressCallback: Send {
    /// A phase is about to begin.
    fn on_phase_started(&self, config: &RunConfig, phase: RunPhase);

    /// Both roots are indexed and matched; nothing has been written yet.
    fn on_plan_ready(&self, plan: &RunPlan);

    /// A target was backed up (if requested) and overwritten.
    ///
    /// `index` is the position of the pair in the plan.
    fn on_file_replaced(&self, index: usize, record: &ReplacementRecord);

    /// The replacement content is larger than what it replaced.
    fn on_size_warning(&self, record: &ReplacementRecord);

    /// Every pair was processed (or, for a dry run, listed).
    fn on_run_completed(&self, report: &RunReport);
}
