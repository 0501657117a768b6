//! Common walk loop: consumes an iterator of classified entries / errors and sends scan events.

use crossbeam_channel::Sender;
use std::fs::FileType;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use super::context::{ScanEvent, WalkContext};
use crate::{EntryKind, ErrorRecord, SourceEntry};

/// One result from a directory walk.
#[derive(Debug, PartialEq, Eq)]
pub enum WalkOutcome {
    Dir(PathBuf),
    File(PathBuf),
    /// Symlink (when not following), socket, fifo, device.
    Unsupported(PathBuf),
    Err { msg: String, path: Option<PathBuf> },
}

/// Sort a path into a [`WalkOutcome`] by its file type.
///
/// The root (depth 0) is always a directory: it was checked with `fs::metadata` before the walk,
/// and both walkers descend into a symlinked root even when not following links.
pub fn classify(path: PathBuf, file_type: FileType, depth: usize) -> WalkOutcome {
    if depth == 0 || file_type.is_dir() {
        WalkOutcome::Dir(path)
    } else if file_type.is_file() {
        WalkOutcome::File(path)
    } else {
        WalkOutcome::Unsupported(path)
    }
}

/// Convert a jwalk result into [`WalkOutcome`].
pub fn to_outcome_jwalk(r: Result<jwalk::DirEntry<((), ())>, jwalk::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => {
            let file_type = entry.file_type();
            classify(entry.path(), file_type, entry.depth)
        }
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => {
            let file_type = entry.file_type();
            let depth = entry.depth();
            classify(entry.into_path(), file_type, depth)
        }
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

fn jwalk_iter(ctx: &WalkContext) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use jwalk::Parallelism;
    use std::time::Duration;
    Box::new(
        jwalk::WalkDir::new(&ctx.root)
            .follow_links(ctx.follow_links)
            .skip_hidden(false)
            .parallelism(Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_secs(60),
            })
            .into_iter()
            .map(to_outcome_jwalk),
    )
}

fn walkdir_iter(ctx: &WalkContext) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use walkdir::WalkDir;
    Box::new(
        WalkDir::new(&ctx.root)
            .follow_links(ctx.follow_links)
            .into_iter()
            .map(to_outcome_walkdir),
    )
}

pub fn spawn_walk_thread(event_tx: Sender<ScanEvent>, ctx: WalkContext) -> JoinHandle<usize> {
    thread::spawn(move || {
        let iter: Box<dyn Iterator<Item = WalkOutcome>> = match ctx.parallel_walk {
            true => jwalk_iter(&ctx),
            false => walkdir_iter(&ctx),
        };
        run_walk_loop(event_tx, iter)
    })
}

/// Turn walk outcomes into scan events. Errors never stop the walk; they become
/// [`ErrorRecord`]s in the same stream. Stops early only if the receiver is gone.
/// Returns the number of events sent.
pub fn run_walk_loop<I>(event_tx: Sender<ScanEvent>, iter: I) -> usize
where
    I: Iterator<Item = WalkOutcome>,
{
    let mut count = 0_usize;
    for outcome in iter {
        let event = match outcome {
            WalkOutcome::Dir(path) => ScanEvent::Entry(SourceEntry {
                path,
                kind: EntryKind::Directory,
            }),
            WalkOutcome::File(path) => ScanEvent::Entry(SourceEntry {
                path,
                kind: EntryKind::RegularFile,
            }),
            WalkOutcome::Unsupported(path) => ScanEvent::Error(ErrorRecord::Unsupported { path }),
            WalkOutcome::Err { msg, path } => {
                log::debug!("walk error: {}", msg);
                ScanEvent::Error(ErrorRecord::Unreadable { path, reason: msg })
            }
        };
        if event_tx.send(event).is_err() {
            break;
        }
        count += 1;
    }
    drop(event_tx);
    count
}
