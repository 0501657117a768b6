//! Application configuration constants.
//! Tuning, defaults and output naming in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    op_log_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                op_log_filename: "operations.log".to_string(),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Optional settings file looked up in the project directory.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Append-only operation log in the project directory.
    pub fn op_log_filename(&self) -> &str {
        &self.op_log_filename
    }
}

// ---- Output naming ----

/// Names of the per-phase artifacts written under the project directory.
/// Every name embeds the run stamp so phases of different runs never collide.
pub struct OutputNames;

impl OutputNames {
    /// `chrono` format for run stamps.
    pub const TIMESTAMP_FORMAT: &'static str = "%Y%m%d_%H%M%S";

    pub const LISTING_DIR: &'static str = "listing";
    pub const SKELETON_DIR: &'static str = "skeleton";
    pub const COPY_DIR: &'static str = "copy";

    pub fn listing_dirs(stamp: &str) -> String {
        format!("dirs_{stamp}.txt")
    }

    pub fn listing_files(stamp: &str) -> String {
        format!("files_{stamp}.txt")
    }

    pub fn listing_errors(stamp: &str) -> String {
        format!("errors_{stamp}.log")
    }

    pub fn skeleton_dirs(stamp: &str) -> String {
        format!("dirs_{stamp}.txt")
    }

    pub fn skeleton_errors(stamp: &str) -> String {
        format!("errors_{stamp}.log")
    }

    pub fn batches_dir(stamp: &str) -> String {
        format!("batches_{stamp}")
    }

    pub fn batches_errors_dir(stamp: &str) -> String {
        format!("batches_errors_{stamp}")
    }

    pub fn slice_errors(stamp: &str) -> String {
        format!("slice_errors_{stamp}.log")
    }

    /// Batch files sort lexically in batch order up to a million batches.
    pub fn batch_file(number: u64) -> String {
        format!("batch_{number:06}.txt")
    }

    pub fn backup_log(stamp: &str) -> String {
        format!("backup_{stamp}.log")
    }

    pub fn copy_errors(stamp: &str) -> String {
        format!("errors_{stamp}.log")
    }
}

// ---- Slicing ----

/// Maximum number of file paths per batch unless overridden.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

// ---- Worker threads ----

/// Limits for the copy worker pool.
/// Use [`WorkerThreadLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Never run fewer copy workers than this by default.
    pub floor: usize,
    /// Default upper bound; copying is I/O bound so more than this rarely helps.
    pub max: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            floor: Self::FLOOR_THREADS,
            max: Self::MAX_THREADS,
        }
    }
}

impl WorkerThreadLimits {
    pub const FLOOR_THREADS: usize = 2;
    pub const MAX_THREADS: usize = 32;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Pipeline length used when the caller does not pick one.
    pub fn default_pipeline_length(&self) -> usize {
        self.all_threads.clamp(self.floor, self.max)
    }
}

// ---- Retry ----

/// Defaults for the bounded wait on an unavailable target root.
pub struct RetryConsts;

impl RetryConsts {
    pub const MAX_ATTEMPTS: u32 = 10;
    pub const INITIAL_DELAY: Duration = Duration::from_secs(2);
    pub const MAX_DELAY: Duration = Duration::from_secs(60);
}

// ---- Channels / cancellation ----

/// Capacity of the walk -> writer channel in the source scan.
pub const WALK_CHANNEL_CAP: usize = 10_000;

/// How often blocked queue operations and retry sleeps look at the cancel token.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);
