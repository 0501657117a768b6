//! CLI command handlers: one per subcommand, each bracketed by operation-log lines.

use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

use crate::backup::run_backup;
use crate::engine::arg_parser::{Cli, Commands, CopyArgs, CopyTuningArgs, ListArgs, RunArgs, SkeletonArgs, SliceArgs, WalkArgs};
use crate::engine::cancel::CancelToken;
use crate::engine::log_sink::LogSink;
use crate::engine::progress::{copy_counter, finish_bar};
use crate::pipeline::{CopyContext, run_copy_pipeline, warn_on_recorded_errors};
use crate::scan::list_sources;
use crate::skeleton::{SkeletonContext, build_skeleton};
use crate::slice::{DirBatchStore, slice_batches};
use crate::utils::{Workspace, apply_file_to_opts, load_rbackup_toml, resolve_pipeline_length, setup_logging};
use crate::{Opts, PhaseMode, ScanOpts};

/// Defaults, then the project's settings file, then flags shared by every subcommand.
fn setup_opts(cli: &Cli) -> Opts {
    setup_logging(cli.verbose.unwrap_or(false));
    let mut opts = Opts::default();
    if let Some(file) = load_rbackup_toml(cli.command.project()) {
        debug!("applying settings file from {}", cli.command.project().display());
        apply_file_to_opts(&file, &mut opts);
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    opts
}

fn apply_walk_args(args: &WalkArgs, opts: &mut Opts) {
    if let Some(v) = args.follow_links {
        opts.follow_links = v;
    }
    if let Some(v) = args.parallel_walk {
        opts.parallel_walk = v;
    }
}

fn apply_tuning_args(args: &CopyTuningArgs, opts: &mut Opts) {
    if let Some(n) = args.pipeline_length {
        opts.pipeline_length = Some(n as usize);
    }
    if let Some(n) = args.retry_attempts {
        opts.retry.max_attempts = n;
    }
    if let Some(ms) = args.retry_delay_ms {
        opts.retry.initial_delay = Duration::from_millis(ms);
    }
}

fn open_input(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .with_context(|| format!("failed to open input list file {}", path.display()))
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    println!("{}", path.display());
    Ok(BufWriter::new(file))
}

fn create_log(path: &Path) -> Result<LogSink> {
    let sink = LogSink::create(path)?;
    println!("{}", path.display());
    Ok(sink)
}

fn handle_list(args: &ListArgs, opts: &mut Opts, ws: &Workspace) -> Result<()> {
    apply_walk_args(&args.walk, opts);
    let paths = ws.listing_paths()?;
    let mut dirs = create_output(&paths.dirs)?;
    let mut files = create_output(&paths.files)?;
    let errors = create_log(&paths.errors)?;
    let summary = list_sources(&args.source, &ScanOpts::from(&*opts), &mut dirs, &mut files, &errors)?;
    info!(
        "Listed {} directories and {} files ({} errors)",
        summary.dirs, summary.files, summary.errors
    );
    warn_on_recorded_errors(&errors, "listing");
    Ok(())
}

fn handle_skeleton(args: &SkeletonArgs, opts: &mut Opts, ws: &Workspace) -> Result<()> {
    if let Some(p) = args.on_missing_dir {
        opts.missing_dir_policy = p;
    }
    let dirs = open_input(&args.dirs_list)?;
    let paths = ws.skeleton_paths()?;
    let mut created = create_output(&paths.created)?;
    let errors = create_log(&paths.errors)?;
    let ctx = SkeletonContext {
        source_root: std::path::absolute(&args.source)?,
        target_root: std::path::absolute(&args.target)?,
        policy: opts.missing_dir_policy,
    };
    let summary = build_skeleton(dirs, &ctx, &mut created, &errors)?;
    info!(
        "Ensured {} of {} directories ({} failed)",
        summary.created, summary.processed, summary.failed
    );
    warn_on_recorded_errors(&errors, "skeleton");
    Ok(())
}

fn handle_slice(args: &SliceArgs, opts: &mut Opts, ws: &Workspace) -> Result<()> {
    if let Some(b) = args.batch_size {
        opts.batch_size = b as usize;
    }
    let files = open_input(&args.files_list)?;
    let paths = ws.slice_paths()?;
    println!("{}", paths.batches_dir.display());
    let mut store = DirBatchStore::create(paths.batches_dir)?;
    let errors = create_log(&paths.errors)?;
    let summary = slice_batches(files, opts.batch_size, &mut store, &errors)?;
    info!(
        "Sliced {} files into {} batches ({} unusable)",
        summary.lines, summary.batches, summary.failed_batches
    );
    warn_on_recorded_errors(&errors, "slice");
    Ok(())
}

fn handle_copy(args: &CopyArgs, opts: &mut Opts, ws: &Workspace, cancel: &CancelToken) -> Result<()> {
    apply_tuning_args(&args.tuning, opts);
    if let Some(v) = args.follow_links {
        opts.follow_links = v;
    }
    let files = open_input(&args.files_list)?;
    let paths = ws.copy_paths()?;
    let backup_log = create_log(&paths.backup_log)?;
    let errors = create_log(&paths.errors)?;
    let mut ctx = CopyContext::new(
        std::path::absolute(&args.source)?,
        std::path::absolute(&args.target)?,
        resolve_pipeline_length(opts.pipeline_length),
    );
    ctx.retry = opts.retry;
    ctx.follow_links = opts.follow_links;
    ctx.cancel = cancel.clone();
    ctx.progress = copy_counter(opts.verbose);
    let result = run_copy_pipeline(files, &ctx, &backup_log, &errors);
    finish_bar(&ctx.progress);
    result?;
    warn_on_recorded_errors(&errors, "copy");
    Ok(())
}

fn handle_full_run(args: &RunArgs, opts: &mut Opts, ws: &Workspace, cancel: &CancelToken) -> Result<()> {
    apply_walk_args(&args.walk, opts);
    apply_tuning_args(&args.tuning, opts);
    if let Some(p) = args.on_missing_dir {
        opts.missing_dir_policy = p;
    }
    if let Some(b) = args.batch_size {
        opts.batch_size = b as usize;
    }
    if let Some(overlap) = args.overlap {
        opts.phase_mode = if overlap {
            PhaseMode::Overlapped
        } else {
            PhaseMode::Sequential
        };
    }
    let report = run_backup(ws, &args.source, &args.target, opts, cancel)?;
    info!(
        "Backup done: {} files copied, {} failed, {} directories ensured",
        report.copy.copied, report.copy.failed, report.skeleton.created
    );
    Ok(())
}

fn op_name(command: &Commands) -> &'static str {
    match command {
        Commands::List(_) => "list sources",
        Commands::Skeleton(_) => "directory skeleton build",
        Commands::Slice(_) => "slice create batches",
        Commands::Copy(_) => "copy files",
        Commands::Run(_) => "full backup",
    }
}

/// Dispatch the parsed command. Setup failures return before any processing.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let mut opts = setup_opts(cli);
    let ws = Workspace::open(cli.command.project())?;
    let name = op_name(&cli.command);
    ws.write_op_log(&format!("{} start", name))?;

    let cancel = CancelToken::new();
    if matches!(cli.command, Commands::Copy(_) | Commands::Run(_)) {
        cancel.install_ctrlc_handler()?;
    }

    match &cli.command {
        Commands::List(args) => handle_list(args, &mut opts, &ws)?,
        Commands::Skeleton(args) => handle_skeleton(args, &mut opts, &ws)?,
        Commands::Slice(args) => handle_slice(args, &mut opts, &ws)?,
        Commands::Copy(args) => handle_copy(args, &mut opts, &ws, &cancel)?,
        Commands::Run(args) => handle_full_run(args, &mut opts, &ws, &cancel)?,
    }

    ws.write_op_log(&format!("{} end", name))?;
    Ok(())
}
