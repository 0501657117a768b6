pub mod config;
pub mod fd_limit;
pub mod logger;
pub mod rbackup_toml;
pub mod workspace;

pub use config::*;
pub use fd_limit::{FDS_PER_COPY_WORKER, max_open_fds, max_workers_by_fd_limit, resolve_pipeline_length};
pub use logger::setup_logging;
pub use rbackup_toml::{apply_file_to_opts, load_rbackup_toml, parse_rbackup_toml};
pub use workspace::{CopyPaths, ListingPaths, SkeletonPaths, SlicePaths, Workspace};
