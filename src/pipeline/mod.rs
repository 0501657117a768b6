//! Pipeline components: context, walk loop, copy workers and their orchestration, retry, error handling.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod retry;
pub mod walk;
pub mod worker;

pub use context::{
    CopyChannels, CopyContext, ScanEvent, WalkContext, WorkerShared, create_copy_channels,
};
pub use error_handler::{check_cancelled, join_all, warn_on_recorded_errors};
pub use orchestrator::run_copy_pipeline;
pub use retry::{Backoff, RetryPolicy};
pub use walk::{
    WalkOutcome, classify, run_walk_loop, spawn_walk_thread, to_outcome_jwalk, to_outcome_walkdir,
};
pub use worker::{WorkerStats, spawn_copy_workers};
