//! # filereplacer engine
//!
//! Headless library behind the `filereplacer` CLI. It walks a target tree and
//! a replacement tree, pairs files by name, and overwrites each matched
//! target in place with its replacement's bytes, optionally keeping a `.bak`
//! copy of the original first.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{run, MatchPolicy, RunConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig::new("/srv/site", "/home/me/patched")
//!     .with_backup_root("/home/me/backups")
//!     .with_match_policy(MatchPolicy::Exact)
//!     .resolve()?;
//!
//! let report = run(&config, None)?;
//! for record in &report.records {
//!     println!("{} <- {}", record.target.display(), record.replacement.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **config**: RunConfig and path resolution
//! - **model**: FileDescriptor, RunPlan, RunReport
//! - **index**: recursive directory indexing
//! - **matcher**: name comparison policy and pairing
//! - **backup**: `.bak` copies before overwrite
//! - **replace**: in-place content replacement
//! - **run**: orchestration (plan, execute)
//! - **progress**: progress callback trait
//! - **checksums**: verify-after-write
//! - **error**: EngineError

pub mod backup;
pub mod checksums;
pub mod config;
pub mod error;
pub mod index;
pub mod matcher;
pub mod model;
pub mod progress;
pub mod replace;
pub mod run;

pub use checksums::{ChecksumAlgorithm, ChecksumValue};
pub use config::RunConfig;
pub use error::{BackupStage, EngineError, ReplaceStage};
pub use matcher::MatchPolicy;
pub use model::{FileDescriptor, FileId, ReplacementRecord, RunPhase, RunPlan, RunReport};
pub use progress::ProgressCallback;
pub use run::{execute_plan, plan_run, run};
