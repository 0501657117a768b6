//! Path utilities shared by every phase.

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Map a source path to its place under the target root: `target_root + relative(source, source_root)`.
///
/// The skeleton builder and the copy workers both go through here so a copied file always lands
/// in the directory the skeleton created for it. Returns `None` when `source` is not under
/// `source_root` or when the relative part climbs out with `..`.
pub fn target_path_for(source: &Path, source_root: &Path, target_root: &Path) -> Option<PathBuf> {
    let rel = path_relative_to(source, source_root)?;
    if rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return None;
    }
    if rel.as_os_str().is_empty() {
        return Some(target_root.to_path_buf());
    }
    Some(target_root.join(rel))
}

/// Resolve a source root for the walk: must exist and be a directory; made absolute without
/// resolving symlinks so listed paths keep the spelling the caller used.
pub fn absolute_source_root(path: &Path) -> Result<PathBuf> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("read source root metadata: {}", path.display()))?;
    if !meta.is_dir() {
        anyhow::bail!("Source root is not a directory: {}", path.display());
    }
    std::path::absolute(path).with_context(|| format!("absolute path of {}", path.display()))
}

/// Parse one line of a path list. Trailing `\r` from lists written on Windows is dropped.
/// Returns `None` for blank lines.
pub fn path_from_line(line: &str) -> Option<PathBuf> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(line))
}
