//! rbackup: recursive backup of very large directory trees in resumable phases.
//!
//! 1. [`list_sources`] splits a source tree into a directory list and a file list.
//! 2. [`build_skeleton`] recreates the directories under the target root.
//! 3. [`slice_batches`] cuts the file list into numbered batches.
//! 4. [`run_copy_pipeline`] copies a list or batch with a bounded pool of workers.
//!
//! [`backup::run_backup`] chains all four over a project directory.

pub mod backup;
pub mod engine;
pub mod pipeline;
pub mod scan;
pub mod skeleton;
pub mod slice;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use engine::{CancelToken, LogSink};
pub use pipeline::{CopyContext, RetryPolicy, run_copy_pipeline};
pub use scan::list_sources;
pub use skeleton::{SkeletonContext, build_skeleton};
pub use slice::{BatchStore, DirBatchStore, slice_batches};

/// Result alias used by public rbackup API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
