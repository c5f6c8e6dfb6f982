//! filereplacer - command-line front end for the replacement engine.
//!
//! Parses arguments, installs the tracing subscriber, prints phase progress
//! to stderr and maps the outcome to an exit code.

use clap::{ArgAction, Parser};
use std::cell::Cell;
use std::error::Error;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use engine::{
    ChecksumAlgorithm, EngineError, MatchPolicy, ProgressCallback, ReplacementRecord, RunConfig,
    RunPhase, RunPlan, RunReport,
};

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "FILEREPLACER_LOG";

/// Recursively replace files in a target tree with same-named files from a
/// replacement tree.
#[derive(Parser, Debug)]
#[command(name = "filereplacer")]
#[command(version)]
#[command(about = "Replace files in a directory tree with same-named files found elsewhere")]
#[command(after_help = "Examples:\n  \
    filereplacer /tmp ~/tmp\n      \
    Overwrite every file under /tmp whose name matches a file under ~/tmp.\n\n  \
    filereplacer -b ~/backups /tmp ~/tmp\n      \
    Same, but first save each original as ~/backups/<name>.bak.")]
struct Args {
    /// Root directory searched recursively for files to overwrite
    #[arg(value_name = "TARGET_DIR")]
    target: PathBuf,

    /// Root directory searched recursively for replacement files
    #[arg(value_name = "REPLACEMENT_ROOT")]
    replacement: PathBuf,

    /// Save each original to PATH/<name>.bak before overwriting it
    #[arg(short = 'b', long = "backup", value_name = "PATH")]
    backup: Option<PathBuf>,

    /// Include the file extension when comparing names
    #[arg(
        short = 'i',
        long = "ext",
        value_name = "BOOL",
        default_value_t = true,
        action = ArgAction::Set
    )]
    ext: bool,

    /// Verify each written file against its replacement: md5, sha256, blake3
    #[arg(long, value_name = "ALGORITHM")]
    verify: Option<ChecksumAlgorithm>,

    /// List planned replacements without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Print every replacement as it happens
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> RunConfig {
        let config = RunConfig::new(&self.target, &self.replacement)
            .with_match_policy(MatchPolicy::from_extension_sensitive(self.ext))
            .with_verify(self.verify)
            .with_dry_run(self.dry_run);
        match &self.backup {
            Some(backup_root) => config.with_backup_root(backup_root),
            None => config,
        }
    }
}

/// Map the bare `help` and `-help` spellings onto `--help`.
fn normalize_help_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().collect();
    if let Some(first) = args.get_mut(1) {
        if first.as_os_str() == "help" || first.as_os_str() == "-help" {
            *first = OsString::from("--help");
        }
    }
    args
}

/// CLI implementation of ProgressCallback printing to stderr
struct CliProgress {
    verbose: bool,
    dry_run: bool,
    start_time: Instant,
    size_warnings: Cell<usize>,
}

impl CliProgress {
    fn new(verbose: bool, dry_run: bool) -> Self {
        CliProgress {
            verbose,
            dry_run,
            start_time: Instant::now(),
            size_warnings: Cell::new(0),
        }
    }

    fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        if unit_idx == 0 {
            format!("{} B", bytes)
        } else {
            format!("{:.2} {}", size, UNITS[unit_idx])
        }
    }
}

impl ProgressCallback for CliProgress {
    fn on_phase_started(&self, config: &RunConfig, phase: RunPhase) {
        match phase {
            RunPhase::IndexReplacements => {
                eprintln!("searching for filenames of replacements...");
                if self.verbose {
                    eprintln!("  Replacement root: {}", config.replacement_root.display());
                }
            }
            RunPhase::IndexTargets => {
                eprintln!("searching for targets to replace...");
                if self.verbose {
                    eprintln!("  Target root: {}", config.target_root.display());
                    eprintln!("  Matching: {}", config.match_policy);
                }
            }
            RunPhase::Replace => {
                eprintln!("replacing the files.");
                if let (true, Some(backup_root)) = (self.verbose, &config.backup_root) {
                    eprintln!("  Backups: {}", backup_root.display());
                }
            }
        }
    }

    fn on_plan_ready(&self, plan: &RunPlan) {
        if !self.dry_run {
            return;
        }
        for (target, replacement) in plan.iter_pairs() {
            println!(
                "{} <- {}",
                target.absolute_path.display(),
                replacement.absolute_path.display()
            );
        }
    }

    fn on_file_replaced(&self, index: usize, record: &ReplacementRecord) {
        if self.verbose {
            eprintln!(
                "[{:3}] {} ({} -> {})",
                index,
                record.target.display(),
                Self::format_bytes(record.old_size),
                Self::format_bytes(record.new_size)
            );
        }
    }

    fn on_size_warning(&self, _record: &ReplacementRecord) {
        self.size_warnings.set(self.size_warnings.get() + 1);
    }

    fn on_run_completed(&self, report: &RunReport) {
        if report.dry_run {
            eprintln!("dry run: {} replacements planned, nothing written", report.planned);
            return;
        }

        eprintln!("done");
        if self.verbose {
            eprintln!(
                "Summary: {} replaced, {} backed up, {} grew",
                report.records.len(),
                report.backups_written(),
                self.size_warnings.get()
            );
            eprintln!("Elapsed: {:.2?}", self.start_time.elapsed());
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "warn,engine=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Render an error and its cause chain on one line each.
fn describe_error(err: &EngineError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }
    message
}

fn main() {
    // arguments are fully parsed before any path is touched
    let args = Args::parse_from(normalize_help_args(std::env::args_os()));
    init_tracing(args.verbose);

    let exit_code = match run_cli(&args) {
        Ok(_) => 0,
        Err(err) => {
            eprintln!("Error: {}", describe_error(&err));
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args) -> Result<RunReport, EngineError> {
    let config = args.to_config().resolve()?;
    let progress = CliProgress::new(args.verbose, args.dry_run);
    engine::run(&config, Some(&progress))
}
