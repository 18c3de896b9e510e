/// Penalty reasons recorded on infeasible candidates.
pub const REASON_INVALID_ENCODING: &str = "invalid genome encoding";
pub const REASON_INVALID_STRUCTURE: &str = "invalid genome structure";
pub const REASON_WRITE_FAILED: &str = "write failed";
pub const REASON_METRIC_EXTRACTION: &str = "metric extraction failed";
pub const REASON_ANALYSIS_FAILED: &str = "analysis failed";

/// Collaborator error messages are cut to this many characters.
pub const ERROR_REASON_LIMIT: usize = 200;

/// Bumped whenever the checkpoint layout changes incompatibly.
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// How often a running child process is polled for exit.
pub const POLL_INTERVAL_MS: u64 = 50;

/// Lines of stderr kept when an analysis run exits non-zero.
pub const STDERR_TAIL_LINES: usize = 5;

/// Mutated-seed fill gives up after this many attempts per open slot.
pub const SEED_FILL_ATTEMPTS_PER_SLOT: usize = 20;

/// File the analysis child's stderr is captured into, inside its slot.
pub const STDERR_CAPTURE_FILE: &str = "analysis.stderr";
