//! Source enumeration: split a tree into a directory list, a file list and an error log.

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use log::debug;
use std::io::Write;
use std::path::Path;

use crate::engine::log_sink::LogSink;
use crate::engine::tools::absolute_source_root;
use crate::pipeline::{ScanEvent, WalkContext, join_all, spawn_walk_thread};
use crate::utils::config::WALK_CHANNEL_CAP;
use crate::{EntryKind, ErrorRecord, ScanOpts, ScanSummary};

/// Walk `root` and write every directory (the root included) to `dirs` and every regular file to
/// `files`, one absolute path per line. Entries that cannot be read, are neither directories nor
/// regular files, or whose path is not UTF-8 go to `errors` and the walk continues.
///
/// The walk runs on its own thread and streams into this one, which owns the writers.
/// Fails only on setup (bad root) or when an output writer fails.
pub fn list_sources(
    root: &Path,
    opts: &ScanOpts,
    dirs: &mut dyn Write,
    files: &mut dyn Write,
    errors: &LogSink,
) -> Result<ScanSummary> {
    let root = absolute_source_root(root)?;
    debug!(
        "Listing {} ({} walk)",
        root.display(),
        if opts.parallel_walk { "parallel" } else { "serial" }
    );

    let (event_tx, event_rx) = bounded::<ScanEvent>(WALK_CHANNEL_CAP);
    let walk_handle = spawn_walk_thread(event_tx, WalkContext::new(root, opts));

    let mut summary = ScanSummary::default();
    let written = write_scan_events(event_rx.iter(), dirs, files, errors, &mut summary);
    // Unblock the walk thread if we stopped reading early.
    drop(event_rx);
    join_all(vec![walk_handle], "walk")?;
    written?;

    dirs.flush().context("flush directory list")?;
    files.flush().context("flush file list")?;
    errors.flush()?;
    Ok(summary)
}

fn write_scan_events<I>(
    events: I,
    dirs: &mut dyn Write,
    files: &mut dyn Write,
    errors: &LogSink,
    summary: &mut ScanSummary,
) -> Result<()>
where
    I: Iterator<Item = ScanEvent>,
{
    for event in events {
        match event {
            ScanEvent::Entry(entry) => {
                let Some(line) = entry.path.to_str() else {
                    summary.errors += 1;
                    errors.record(&ErrorRecord::Unreadable {
                        path: Some(entry.path.clone()),
                        reason: "path is not valid UTF-8".to_string(),
                    });
                    continue;
                };
                match entry.kind {
                    EntryKind::Directory => {
                        writeln!(dirs, "{}", line).context("write directory list")?;
                        summary.dirs += 1;
                    }
                    EntryKind::RegularFile => {
                        writeln!(files, "{}", line).context("write file list")?;
                        summary.files += 1;
                    }
                }
            }
            ScanEvent::Error(record) => {
                summary.errors += 1;
                errors.record(&record);
            }
        }
    }
    Ok(())
}
