//! Target skeleton: recreate the source directory hierarchy under the target root.

use anyhow::{Context, Result};
use log::debug;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::engine::log_sink::LogSink;
use crate::engine::tools::{path_from_line, target_path_for};
use crate::{ErrorRecord, MissingDirPolicy, SkeletonSummary};

/// Roots and policy for one skeleton build.
#[derive(Clone, Debug)]
pub struct SkeletonContext {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub policy: MissingDirPolicy,
}

/// Create the target counterpart of one source directory, ancestors included.
pub fn ensure_target_dir(source_dir: &Path, ctx: &SkeletonContext) -> Result<PathBuf> {
    let target = target_path_for(source_dir, &ctx.source_root, &ctx.target_root).with_context(
        || {
            format!(
                "{} is not under source root {}",
                source_dir.display(),
                ctx.source_root.display()
            )
        },
    )?;
    std::fs::create_dir_all(&target)
        .with_context(|| format!("create directory {}", target.display()))?;
    Ok(target)
}

/// Read source directory paths from `dirs` and ensure each exists under the target root.
/// Every target directory that exists afterwards is written to `created`.
///
/// Failures follow `ctx.policy`: `None` skips, `Report` writes to `errors`, `Stop` returns the
/// failure and processes nothing further. Re-running over an existing skeleton is a no-op.
pub fn build_skeleton<R: BufRead>(
    dirs: R,
    ctx: &SkeletonContext,
    created: &mut dyn Write,
    errors: &LogSink,
) -> Result<SkeletonSummary> {
    debug!(
        "Building skeleton {} -> {} (on missing dir: {})",
        ctx.source_root.display(),
        ctx.target_root.display(),
        ctx.policy
    );
    let mut summary = SkeletonSummary::default();
    for (idx, line) in dirs.lines().enumerate() {
        let line = line.with_context(|| format!("read directory list at line {}", idx + 1))?;
        let Some(source_dir) = path_from_line(&line) else {
            continue;
        };
        summary.processed += 1;
        match ensure_target_dir(&source_dir, ctx) {
            Ok(target) => {
                writeln!(created, "{}", target.display()).context("write created directory list")?;
                summary.created += 1;
            }
            Err(err) => {
                summary.failed += 1;
                match ctx.policy {
                    MissingDirPolicy::None => {
                        debug!("skipping {}: {:#}", source_dir.display(), err);
                    }
                    MissingDirPolicy::Report => errors.record(&ErrorRecord::MissingDirectory {
                        source: source_dir,
                        reason: format!("{:#}", err),
                    }),
                    MissingDirPolicy::Stop => {
                        created.flush().context("flush created directory list")?;
                        errors.flush()?;
                        return Err(err.context(format!(
                            "skeleton build stopped at line {} ({})",
                            idx + 1,
                            line
                        )));
                    }
                }
            }
        }
    }
    created.flush().context("flush created directory list")?;
    errors.flush()?;
    Ok(summary)
}
