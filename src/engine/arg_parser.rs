use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::MissingDirPolicy;

/// Recursive backup of very large directory trees, one resumable phase at a time.
#[derive(Clone, Parser)]
#[command(name = "rbackup")]
#[command(about = "List sources, build the target skeleton, slice file lists into batches and copy them.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (debug logging, copy progress bar). Takes a value only as `--verbose=false`.
    #[arg(long, short = 'v', global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Write the directory list, file list and listing errors for SOURCE.
    List(ListArgs),
    /// Recreate the directories of a directory list under TARGET.
    Skeleton(SkeletonArgs),
    /// Split a file list into numbered batches.
    Slice(SliceArgs),
    /// Copy the files named in a file list or batch from SOURCE to TARGET.
    Copy(CopyArgs),
    /// Run list, skeleton, slice and copy in one go.
    Run(RunArgs),
}

impl Commands {
    /// Project directory of whichever subcommand was given.
    pub fn project(&self) -> &PathBuf {
        match self {
            Commands::List(a) => &a.project.project,
            Commands::Skeleton(a) => &a.project.project,
            Commands::Slice(a) => &a.project.project,
            Commands::Copy(a) => &a.project.project,
            Commands::Run(a) => &a.project.project,
        }
    }
}

#[derive(Clone, Args)]
pub struct ProjectArgs {
    /// Project directory holding lists, batches and logs.
    #[arg(long, short = 'p', value_name = "DIR")]
    pub project: PathBuf,
}

#[derive(Clone, Args)]
pub struct WalkArgs {
    /// Follow symbolic links.
    #[arg(long, short = 'f', num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,

    /// Walk in parallel (jwalk) instead of serially.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub parallel_walk: Option<bool>,
}

#[derive(Clone, Args)]
pub struct CopyTuningArgs {
    /// Number of concurrent copy workers (also the task queue capacity).
    #[arg(long, short = 'n', value_parser = clap::value_parser!(u64).range(1..))]
    pub pipeline_length: Option<u64>,

    /// Waits for an unavailable target root before a file is given up (0 = no retry).
    #[arg(long)]
    pub retry_attempts: Option<u32>,

    /// First wait in milliseconds; doubles each time.
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,
}

#[derive(Clone, Args)]
pub struct ListArgs {
    /// Source root to list.
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub walk: WalkArgs,
}

#[derive(Clone, Args)]
pub struct SkeletonArgs {
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Directory list produced by `list`.
    #[arg(long, short = 'd', value_name = "FILE")]
    pub dirs_list: PathBuf,

    /// What to do when a target directory cannot be created.
    #[arg(long = "on-missing-dir", short = 'm', value_enum)]
    pub on_missing_dir: Option<MissingDirPolicy>,
}

#[derive(Clone, Args)]
pub struct SliceArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// File list produced by `list`.
    #[arg(long, short = 'f', value_name = "FILE")]
    pub files_list: PathBuf,

    /// Maximum number of files in a batch. Default: 1000.
    #[arg(long, short = 'b', value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: Option<u64>,
}

#[derive(Clone, Args)]
pub struct CopyArgs {
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// File list or batch file to copy.
    #[arg(long, short = 'f', value_name = "FILE")]
    pub files_list: PathBuf,

    #[command(flatten)]
    pub tuning: CopyTuningArgs,

    /// Follow symbolic links when reading sources.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,
}

#[derive(Clone, Args)]
pub struct RunArgs {
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub walk: WalkArgs,

    #[command(flatten)]
    pub tuning: CopyTuningArgs,

    #[arg(long = "on-missing-dir", short = 'm', value_enum)]
    pub on_missing_dir: Option<MissingDirPolicy>,

    #[arg(long, short = 'b', value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: Option<u64>,

    /// Build the skeleton while copying instead of before.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub overlap: Option<bool>,
}
