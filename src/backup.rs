//! Full run: list, build the skeleton, slice and copy, persisting every phase in the project directory.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::thread;

use crate::engine::cancel::CancelToken;
use crate::engine::log_sink::LogSink;
use crate::engine::progress::{copy_counter, finish_bar};
use crate::pipeline::{CopyContext, check_cancelled, join_all, run_copy_pipeline, warn_on_recorded_errors};
use crate::scan::list_sources;
use crate::skeleton::{SkeletonContext, build_skeleton};
use crate::slice::{DirBatchStore, slice_batches};
use crate::utils::fd_limit::resolve_pipeline_length;
use crate::utils::workspace::{SkeletonPaths, Workspace};
use crate::{CopySummary, Opts, PhaseMode, ScanOpts, ScanSummary, SkeletonSummary, SliceSummary};

/// Per-phase counts of one full run.
#[derive(Clone, Copy, Debug, Default)]
pub struct BackupReport {
    pub scan: ScanSummary,
    pub skeleton: SkeletonSummary,
    pub slice: SliceSummary,
    pub copy: CopySummary,
}

fn open_list(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .with_context(|| format!("open list {}", path.display()))
}

fn create_list(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .with_context(|| format!("create list {}", path.display()))
}

/// Skeleton phase over a persisted directory list. Owns everything so it can run on its own thread.
fn run_skeleton_phase(
    dirs_list: PathBuf,
    paths: SkeletonPaths,
    ctx: SkeletonContext,
) -> Result<SkeletonSummary> {
    let dirs = open_list(&dirs_list)?;
    let mut created = create_list(&paths.created)?;
    let errors = LogSink::create(&paths.errors)?;
    let summary = build_skeleton(dirs, &ctx, &mut created, &errors)?;
    warn_on_recorded_errors(&errors, "skeleton");
    Ok(summary)
}

/// Copy every batch in `store`, numbering tasks continuously across batches.
fn run_copy_phase(
    store: &DirBatchStore,
    ctx: &mut CopyContext,
    backup_log: &LogSink,
    errors: &LogSink,
) -> Result<CopySummary> {
    let mut total = CopySummary::default();
    for batch in store.batch_paths()? {
        check_cancelled(&ctx.cancel, "copy")?;
        debug!("copying batch {}", batch.display());
        let summary = run_copy_pipeline(open_list(&batch)?, ctx, backup_log, errors)
            .with_context(|| format!("copy batch {}", batch.display()))?;
        ctx.first_seq = summary.last_seq + 1;
        total.absorb(&summary);
    }
    Ok(total)
}

/// Run every phase from `source` to `target` with artifacts under `workspace`.
///
/// With [`PhaseMode::Sequential`] the skeleton is complete before the first copy. With
/// [`PhaseMode::Overlapped`] it is built on a separate thread while batches are copied, and copy
/// workers wait (bounded by `opts.retry`) for directories that do not exist yet.
pub fn run_backup(
    workspace: &Workspace,
    source: &Path,
    target: &Path,
    opts: &Opts,
    cancel: &CancelToken,
) -> Result<BackupReport> {
    let mut report = BackupReport::default();

    // Phase 1: listing
    let listing = workspace.listing_paths()?;
    {
        let mut dirs = create_list(&listing.dirs)?;
        let mut files = create_list(&listing.files)?;
        let errors = LogSink::create(&listing.errors)?;
        report.scan = list_sources(source, &ScanOpts::from(opts), &mut dirs, &mut files, &errors)?;
        warn_on_recorded_errors(&errors, "listing");
    }
    info!(
        "Listed {} directories and {} files ({} errors)",
        report.scan.dirs, report.scan.files, report.scan.errors
    );
    check_cancelled(cancel, "backup")?;

    // Phase 2: skeleton, inline or alongside the copy
    let source_root = std::path::absolute(source)
        .with_context(|| format!("absolute path of {}", source.display()))?;
    let target_root = std::path::absolute(target)
        .with_context(|| format!("absolute path of {}", target.display()))?;
    let skeleton_ctx = SkeletonContext {
        source_root: source_root.clone(),
        target_root: target_root.clone(),
        policy: opts.missing_dir_policy,
    };
    let skeleton_paths = workspace.skeleton_paths()?;
    let skeleton_handle = match opts.phase_mode {
        PhaseMode::Sequential => {
            report.skeleton =
                run_skeleton_phase(listing.dirs.clone(), skeleton_paths, skeleton_ctx)?;
            None
        }
        PhaseMode::Overlapped => {
            let dirs_list = listing.dirs.clone();
            Some(thread::spawn(move || {
                run_skeleton_phase(dirs_list, skeleton_paths, skeleton_ctx)
            }))
        }
    };

    // Phase 3: slicing
    let slice_paths = workspace.slice_paths()?;
    let mut store = DirBatchStore::create(slice_paths.batches_dir)?;
    {
        let errors = LogSink::create(&slice_paths.errors)?;
        report.slice = slice_batches(open_list(&listing.files)?, opts.batch_size, &mut store, &errors)?;
        warn_on_recorded_errors(&errors, "slice");
    }
    info!(
        "Sliced {} files into {} batches",
        report.slice.lines, report.slice.batches
    );

    // Phase 4: copy
    let copy_paths = workspace.copy_paths()?;
    let backup_log = LogSink::create(&copy_paths.backup_log)?;
    let errors = LogSink::create(&copy_paths.errors)?;
    let mut ctx = CopyContext::new(
        source_root,
        target_root,
        resolve_pipeline_length(opts.pipeline_length),
    );
    ctx.retry = opts.retry;
    ctx.follow_links = opts.follow_links;
    ctx.cancel = cancel.clone();
    ctx.progress = copy_counter(opts.verbose);
    let copied = run_copy_phase(&store, &mut ctx, &backup_log, &errors);
    finish_bar(&ctx.progress);

    // The skeleton thread is joined even when the copy failed so its error is not lost.
    if let Some(handle) = skeleton_handle {
        let joined = join_all(vec![handle], "skeleton");
        match joined?.pop() {
            Some(Ok(summary)) => report.skeleton = summary,
            Some(Err(e)) if copied.is_err() => warn!("skeleton: {:#}", e),
            Some(Err(e)) => return Err(e),
            None => {}
        }
    }
    report.copy = copied?;
    warn_on_recorded_errors(&errors, "copy");
    Ok(report)
}
