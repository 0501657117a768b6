//! Progress bar utilities for the copy pipeline

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a counter for unknown total (shows count without percentage).
/// Batches are read as a stream, so the copy bar never knows its total up front.
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " files"
    )))
}

/// Force a refresh of the bar (e.g. so counter shows "0 files" immediately).
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}

/// Update progress bar if available.
/// Uses a blocking lock: a skipped update would make the final count wrong, and workers hold it only briefly.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.lock() {
        let _ = pb.update(n);
    }
}

/// Counter bar for the copy phase when verbose, otherwise nothing.
pub fn copy_counter(verbose: bool) -> Option<ProgressBar> {
    verbose.then(|| {
        let bar = create_counter("Copying");
        refresh_bar(&bar);
        bar
    })
}

/// Print a trailing newline so log lines do not land on the bar's row.
pub fn finish_bar(pb: &Option<ProgressBar>) {
    if let Some(pb) = pb
        && let Ok(mut bar) = pb.lock()
    {
        let _ = bar.refresh();
        eprintln!();
    }
}
