//! Skeleton builder tests: mirroring, idempotence, missing-directory policies.

use rbackup::engine::{LogSink, SharedBuf};
use rbackup::{MissingDirPolicy, SkeletonContext, build_skeleton};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn ctx(src: &Path, dst: &Path, policy: MissingDirPolicy) -> SkeletonContext {
    SkeletonContext {
        source_root: src.to_path_buf(),
        target_root: dst.to_path_buf(),
        policy,
    }
}

fn dir_list(paths: &[PathBuf]) -> Cursor<Vec<u8>> {
    let mut s = String::new();
    for p in paths {
        s.push_str(p.to_str().unwrap());
        s.push('\n');
    }
    Cursor::new(s.into_bytes())
}

#[test]
fn test_skeleton_mirrors_hierarchy() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let list = dir_list(&[src.clone(), src.join("a"), src.join("a/b")]);

    let mut created = Vec::new();
    let summary = build_skeleton(
        list,
        &ctx(&src, &dst, MissingDirPolicy::Report),
        &mut created,
        &LogSink::discard(),
    )
    .unwrap();

    assert!(dst.is_dir());
    assert!(dst.join("a/b").is_dir());
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.created, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(String::from_utf8(created).unwrap().lines().count(), 3);
}

#[test]
fn test_skeleton_out_of_order_list() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    // Deepest first: ancestors are created on the way.
    let list = dir_list(&[src.join("x/y/z"), src.join("x")]);

    let summary = build_skeleton(
        list,
        &ctx(&src, &dst, MissingDirPolicy::Report),
        &mut Vec::new(),
        &LogSink::discard(),
    )
    .unwrap();

    assert!(dst.join("x/y/z").is_dir());
    assert_eq!(summary.failed, 0);
}

#[test]
fn test_skeleton_rerun_is_noop() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let paths = [src.clone(), src.join("a"), src.join("a/b")];
    let c = ctx(&src, &dst, MissingDirPolicy::Stop);

    build_skeleton(dir_list(&paths), &c, &mut Vec::new(), &LogSink::discard()).unwrap();
    let err_buf = SharedBuf::new();
    let summary =
        build_skeleton(dir_list(&paths), &c, &mut Vec::new(), &LogSink::new(err_buf.clone()))
            .unwrap();

    assert_eq!(summary.created, 3);
    assert_eq!(summary.failed, 0);
    assert!(err_buf.lines().is_empty());
}

#[test]
fn test_skeleton_skips_blank_lines() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let list = Cursor::new(format!("\n{}\n\n", src.join("a").display()).into_bytes());

    let summary = build_skeleton(
        list,
        &ctx(&src, &dst, MissingDirPolicy::Report),
        &mut Vec::new(),
        &LogSink::discard(),
    )
    .unwrap();

    assert_eq!(summary.processed, 1);
    assert!(dst.join("a").is_dir());
}

/// Source tree `src/{a,blocked,c}` with a regular file sitting where `dst/blocked` should go.
fn blocked_setup(tmp: &Path) -> (PathBuf, PathBuf, Vec<PathBuf>) {
    let src = tmp.join("src");
    let dst = tmp.join("dst");
    fs::create_dir_all(&dst).unwrap();
    fs::write(dst.join("blocked"), b"not a dir").unwrap();
    let paths = vec![src.join("a"), src.join("blocked/inner"), src.join("c")];
    (src, dst, paths)
}

#[test]
fn test_skeleton_policy_report() {
    let tmp = tempfile::tempdir().unwrap();
    let (src, dst, paths) = blocked_setup(tmp.path());
    let err_buf = SharedBuf::new();

    let summary = build_skeleton(
        dir_list(&paths),
        &ctx(&src, &dst, MissingDirPolicy::Report),
        &mut Vec::new(),
        &LogSink::new(err_buf.clone()),
    )
    .unwrap();

    assert!(dst.join("a").is_dir());
    assert!(dst.join("c").is_dir());
    assert_eq!(summary.failed, 1);
    let errs = err_buf.lines();
    assert_eq!(errs.len(), 1);
    assert!(errs[0].contains("blocked"));
}

#[test]
fn test_skeleton_policy_none() {
    let tmp = tempfile::tempdir().unwrap();
    let (src, dst, paths) = blocked_setup(tmp.path());
    let err_buf = SharedBuf::new();

    let summary = build_skeleton(
        dir_list(&paths),
        &ctx(&src, &dst, MissingDirPolicy::None),
        &mut Vec::new(),
        &LogSink::new(err_buf.clone()),
    )
    .unwrap();

    assert!(dst.join("a").is_dir());
    assert!(dst.join("c").is_dir());
    assert_eq!(summary.failed, 1);
    assert!(err_buf.lines().is_empty());
}

#[test]
fn test_skeleton_policy_stop() {
    let tmp = tempfile::tempdir().unwrap();
    let (src, dst, paths) = blocked_setup(tmp.path());

    let result = build_skeleton(
        dir_list(&paths),
        &ctx(&src, &dst, MissingDirPolicy::Stop),
        &mut Vec::new(),
        &LogSink::discard(),
    );

    assert!(result.is_err());
    assert!(dst.join("a").is_dir());
    // Nothing after the failing line is processed.
    assert!(!dst.join("c").exists());
}

#[test]
fn test_skeleton_path_outside_source_root() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let err_buf = SharedBuf::new();

    let summary = build_skeleton(
        dir_list(&[tmp.path().join("other")]),
        &ctx(&src, &dst, MissingDirPolicy::Report),
        &mut Vec::new(),
        &LogSink::new(err_buf.clone()),
    )
    .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(err_buf.lines().len(), 1);
    assert!(!dst.exists());
}
