//! Source listing tests: directory/file split, error stream, walk modes.

use rbackup::engine::{LogSink, SharedBuf};
use rbackup::{ScanOpts, list_sources};
use std::fs;
use std::path::Path;

fn sorted_lines(buf: &[u8]) -> Vec<String> {
    let mut lines: Vec<String> = String::from_utf8_lossy(buf)
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}

fn p(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}

fn sample_tree(root: &Path) {
    fs::create_dir_all(root.join("a/b")).unwrap();
    fs::write(root.join("a/f.txt"), b"hello").unwrap();
}

#[test]
fn test_list_splits_dirs_and_files() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("src");
    sample_tree(&root);

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let err_buf = SharedBuf::new();
    let errors = LogSink::new(err_buf.clone());
    let summary =
        list_sources(&root, &ScanOpts::default(), &mut dirs, &mut files, &errors).unwrap();

    assert_eq!(
        sorted_lines(&dirs),
        vec![p(&root), p(&root.join("a")), p(&root.join("a/b"))]
    );
    assert_eq!(sorted_lines(&files), vec![p(&root.join("a/f.txt"))]);
    assert!(err_buf.lines().is_empty());
    assert_eq!(summary.dirs, 3);
    assert_eq!(summary.files, 1);
    assert_eq!(summary.errors, 0);
}

#[test]
fn test_list_parallel_walk_same_result() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("src");
    sample_tree(&root);
    fs::write(root.join("a/b/.hidden"), b"x").unwrap();

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let errors = LogSink::discard();
    let opts = ScanOpts {
        parallel_walk: true,
        ..ScanOpts::default()
    };
    let summary = list_sources(&root, &opts, &mut dirs, &mut files, &errors).unwrap();

    assert_eq!(summary.dirs, 3);
    assert_eq!(
        sorted_lines(&files),
        vec![p(&root.join("a/b/.hidden")), p(&root.join("a/f.txt"))]
    );
}

#[test]
fn test_list_empty_root_lists_only_root() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("empty");
    fs::create_dir(&root).unwrap();

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let summary = list_sources(
        &root,
        &ScanOpts::default(),
        &mut dirs,
        &mut files,
        &LogSink::discard(),
    )
    .unwrap();

    assert_eq!(sorted_lines(&dirs), vec![p(&root)]);
    assert!(files.is_empty());
    assert_eq!(summary.dirs, 1);
    assert_eq!(summary.files, 0);
}

#[test]
fn test_list_missing_root_is_setup_error() {
    let tmp = tempfile::tempdir().unwrap();
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let result = list_sources(
        &tmp.path().join("nope"),
        &ScanOpts::default(),
        &mut dirs,
        &mut files,
        &LogSink::discard(),
    );
    assert!(result.is_err());
    assert!(dirs.is_empty());
}

#[test]
fn test_list_file_root_is_setup_error() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("f.txt");
    fs::write(&file, b"x").unwrap();
    let result = list_sources(
        &file,
        &ScanOpts::default(),
        &mut Vec::new(),
        &mut Vec::new(),
        &LogSink::discard(),
    );
    assert!(result.is_err());
}

#[cfg(unix)]
#[test]
fn test_list_symlink_reported_not_listed() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("src");
    sample_tree(&root);
    std::os::unix::fs::symlink(root.join("a/f.txt"), root.join("link")).unwrap();

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let err_buf = SharedBuf::new();
    let summary = list_sources(
        &root,
        &ScanOpts::default(),
        &mut dirs,
        &mut files,
        &LogSink::new(err_buf.clone()),
    )
    .unwrap();

    assert_eq!(sorted_lines(&files), vec![p(&root.join("a/f.txt"))]);
    assert_eq!(summary.errors, 1);
    let errs = err_buf.lines();
    assert_eq!(errs.len(), 1);
    assert!(errs[0].contains(&p(&root.join("link"))));
}

#[cfg(unix)]
#[test]
fn test_list_symlink_followed_is_file() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("src");
    sample_tree(&root);
    std::os::unix::fs::symlink(root.join("a/f.txt"), root.join("link")).unwrap();

    let mut files = Vec::new();
    let opts = ScanOpts {
        follow_links: true,
        ..ScanOpts::default()
    };
    let summary =
        list_sources(&root, &opts, &mut Vec::new(), &mut files, &LogSink::discard()).unwrap();

    assert_eq!(summary.files, 2);
    assert_eq!(summary.errors, 0);
    assert!(sorted_lines(&files).contains(&p(&root.join("link"))));
}

#[cfg(unix)]
#[test]
fn test_list_symlinked_root_is_listed_as_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let real = tmp.path().join("real");
    sample_tree(&real);
    let root = tmp.path().join("link");
    std::os::unix::fs::symlink(&real, &root).unwrap();

    for parallel_walk in [false, true] {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let err_buf = SharedBuf::new();
        let opts = ScanOpts {
            follow_links: false,
            parallel_walk,
        };
        let summary = list_sources(
            &root,
            &opts,
            &mut dirs,
            &mut files,
            &LogSink::new(err_buf.clone()),
        )
        .unwrap();

        assert_eq!(
            sorted_lines(&dirs),
            vec![p(&root), p(&root.join("a")), p(&root.join("a/b"))],
            "parallel_walk = {parallel_walk}"
        );
        assert_eq!(sorted_lines(&files), vec![p(&root.join("a/f.txt"))]);
        assert_eq!(summary.errors, 0);
        assert!(err_buf.lines().is_empty());
    }
}
