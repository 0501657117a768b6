//! Engine module: single-file copy, shared sinks, cancellation, path tools and the CLI

pub mod arg_parser;
pub mod cancel;
pub mod cli;
pub mod copy_file;
pub mod log_sink;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::{Cli, Commands};
pub use cancel::CancelToken;
pub use cli::handle_run;
pub use copy_file::{CopyError, backup_file, copy_with_retry};
pub use log_sink::{LogSink, SharedBuf};
pub use tools::{absolute_source_root, path_from_line, path_relative_to, target_path_for};
