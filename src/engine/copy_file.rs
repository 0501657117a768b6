//! Single-file copy with bounded retry on an unavailable target.

use filetime::FileTime;
use log::{debug, warn};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::engine::cancel::CancelToken;
use crate::engine::tools::target_path_for;
use crate::pipeline::retry::{Backoff, RetryPolicy};
use crate::{CopyOutcome, CopyTask};

/// Why one copy attempt failed. [`CopyError::is_transient`] decides whether the worker waits and retries.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("{} is not under source root {}", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("cannot stat source {}: {source}", .path.display())]
    SourceUnavailable { path: PathBuf, source: io::Error },

    #[error("{} is not a regular file", .path.display())]
    NotRegularFile { path: PathBuf },

    #[error("cannot create target directory {}: {source}", .path.display())]
    TargetDirUnavailable { path: PathBuf, source: io::Error },

    #[error("cannot open source {}: {source}", .path.display())]
    OpenSource { path: PathBuf, source: io::Error },

    #[error("cannot create target {}: {source}", .path.display())]
    CreateTarget { path: PathBuf, source: io::Error },

    #[error("copy into {} failed: {source}", .path.display())]
    Stream { path: PathBuf, source: io::Error },

    #[error("cannot set modification time on {}: {source}", .path.display())]
    Mtime { path: PathBuf, source: io::Error },

    #[error("target root {} unavailable after {attempts} waits: {last}", .root.display())]
    RetryExhausted {
        root: PathBuf,
        attempts: u32,
        #[source]
        last: Box<CopyError>,
    },

    #[error("cancelled")]
    Cancelled,
}

impl CopyError {
    /// Failures that usually mean the target tree is not there yet (or the source mount blinked).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CopyError::SourceUnavailable { .. }
                | CopyError::TargetDirUnavailable { .. }
                | CopyError::CreateTarget { .. }
        )
    }
}

enum Wait {
    Ready,
    Exhausted,
    Cancelled,
}

/// Sleep through the backoff schedule until `dir` is a directory. Always waits at least once
/// so a source that is really gone cannot spin.
fn wait_for_directory(dir: &Path, backoff: &mut Backoff, cancel: &CancelToken) -> Wait {
    debug!("Waiting for directory {} to be available", dir.display());
    loop {
        let Some(delay) = backoff.next() else {
            return Wait::Exhausted;
        };
        if !cancel.sleep(delay) {
            return Wait::Cancelled;
        }
        if dir.is_dir() {
            return Wait::Ready;
        }
    }
}

/// One attempt: stat, check type, ensure parent, stream bytes, carry the mtime over.
fn try_copy(source: &Path, target: &Path, follow_links: bool) -> Result<SystemTime, CopyError> {
    let meta = if follow_links {
        fs::metadata(source)
    } else {
        fs::symlink_metadata(source)
    }
    .map_err(|e| CopyError::SourceUnavailable {
        path: source.to_path_buf(),
        source: e,
    })?;
    if !meta.is_file() {
        return Err(CopyError::NotRegularFile {
            path: source.to_path_buf(),
        });
    }

    if let Some(parent) = target.parent()
        && !parent.is_dir()
    {
        fs::create_dir_all(parent).map_err(|e| CopyError::TargetDirUnavailable {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut src = File::open(source).map_err(|e| CopyError::OpenSource {
        path: source.to_path_buf(),
        source: e,
    })?;
    let mut dst = File::create(target).map_err(|e| CopyError::CreateTarget {
        path: target.to_path_buf(),
        source: e,
    })?;
    io::copy(&mut src, &mut dst).map_err(|e| CopyError::Stream {
        path: target.to_path_buf(),
        source: e,
    })?;
    drop(dst);

    let mtime = meta.modified().map_err(|e| CopyError::Mtime {
        path: source.to_path_buf(),
        source: e,
    })?;
    filetime::set_file_mtime(target, FileTime::from_system_time(mtime)).map_err(|e| {
        CopyError::Mtime {
            path: target.to_path_buf(),
            source: e,
        }
    })?;
    Ok(mtime)
}

/// Copy `source` to `target`, retrying from the top after each transient failure once
/// `target_root` is present again. Gives up when the backoff schedule runs out.
pub fn copy_with_retry(
    source: &Path,
    target: &Path,
    target_root: &Path,
    retry: &RetryPolicy,
    follow_links: bool,
    cancel: &CancelToken,
) -> Result<SystemTime, CopyError> {
    let mut backoff = retry.backoff();
    loop {
        match try_copy(source, target, follow_links) {
            Ok(mtime) => return Ok(mtime),
            Err(err) if err.is_transient() => {
                warn!("{}; retrying once {} is available", err, target_root.display());
                match wait_for_directory(target_root, &mut backoff, cancel) {
                    Wait::Ready => continue,
                    Wait::Exhausted => {
                        return Err(CopyError::RetryExhausted {
                            root: target_root.to_path_buf(),
                            attempts: backoff.attempts(),
                            last: Box::new(err),
                        });
                    }
                    Wait::Cancelled => return Err(CopyError::Cancelled),
                }
            }
            Err(err) => return Err(err),
        }
    }
}

/// Run one task end to end and describe what happened.
pub fn backup_file(
    task: &CopyTask,
    retry: &RetryPolicy,
    follow_links: bool,
    cancel: &CancelToken,
) -> CopyOutcome {
    let Some(target) = target_path_for(&task.source, &task.source_root, &task.target_root) else {
        let err = CopyError::OutsideRoot {
            path: task.source.clone(),
            root: task.source_root.to_path_buf(),
        };
        return CopyOutcome {
            seq: task.seq,
            source: task.source.clone(),
            target: None,
            mtime: None,
            error: Some(err.to_string()),
        };
    };
    let result = copy_with_retry(
        &task.source,
        &target,
        &task.target_root,
        retry,
        follow_links,
        cancel,
    );
    let (mtime, error) = match result {
        Ok(mtime) => (Some(mtime), None),
        Err(err) => (None, Some(err.to_string())),
    };
    CopyOutcome {
        seq: task.seq,
        source: task.source.clone(),
        target: Some(target),
        mtime,
        error,
    }
}
