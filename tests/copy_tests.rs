//! Copy pipeline tests: content and mtime, logs, per-file failures, retry bound, cancellation.

use filetime::FileTime;
use rbackup::engine::{CancelToken, LogSink, SharedBuf, copy_with_retry};
use rbackup::{CopyContext, RetryPolicy, run_copy_pipeline};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

fn quick_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
    }
}

fn list_of(paths: &[PathBuf]) -> Cursor<Vec<u8>> {
    let mut s = String::new();
    for p in paths {
        s.push_str(p.to_str().unwrap());
        s.push('\n');
    }
    Cursor::new(s.into_bytes())
}

fn context(src: &Path, dst: &Path, len: usize) -> CopyContext {
    let mut ctx = CopyContext::new(src.to_path_buf(), dst.to_path_buf(), len);
    ctx.retry = quick_retry(2);
    ctx
}

/// `src/a/f.txt` with a fixed mtime, plus `src/top.bin`.
fn sample_source(root: &Path) -> Vec<PathBuf> {
    fs::create_dir_all(root.join("a")).unwrap();
    let f = root.join("a/f.txt");
    fs::write(&f, b"hello").unwrap();
    filetime::set_file_mtime(&f, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();
    let top = root.join("top.bin");
    fs::write(&top, vec![7u8; 64 * 1024]).unwrap();
    vec![f, top]
}

// --- successful copies ---

#[test]
fn test_copy_preserves_bytes_and_mtime() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let files = sample_source(&src);

    let log_buf = SharedBuf::new();
    let err_buf = SharedBuf::new();
    let summary = run_copy_pipeline(
        list_of(&files),
        &context(&src, &dst, 4),
        &LogSink::new(log_buf.clone()),
        &LogSink::new(err_buf.clone()),
    )
    .unwrap();

    assert_eq!(summary.dispatched, 2);
    assert_eq!(summary.copied, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(fs::read(dst.join("a/f.txt")).unwrap(), b"hello");
    assert_eq!(fs::read(dst.join("top.bin")).unwrap(), vec![7u8; 64 * 1024]);

    let meta = fs::metadata(dst.join("a/f.txt")).unwrap();
    assert_eq!(
        FileTime::from_last_modification_time(&meta).unix_seconds(),
        1_600_000_000
    );
    assert_eq!(log_buf.lines().len(), 2);
    assert!(err_buf.lines().is_empty());
}

#[test]
fn test_copy_single_worker_numbers_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let files = sample_source(&src);

    let log_buf = SharedBuf::new();
    let summary = run_copy_pipeline(
        list_of(&files),
        &context(&src, &dst, 1),
        &LogSink::new(log_buf.clone()),
        &LogSink::discard(),
    )
    .unwrap();

    let lines = log_buf.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("file #1 ("));
    assert!(lines[0].ends_with(") ok"));
    assert!(lines[1].starts_with("file #2 ("));
    assert_eq!(summary.last_seq, 2);
}

#[test]
fn test_copy_first_seq_continues_numbering() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let files = sample_source(&src);

    let mut ctx = context(&src, &dst, 1);
    ctx.first_seq = 11;
    let log_buf = SharedBuf::new();
    let summary = run_copy_pipeline(
        list_of(&files[..1]),
        &ctx,
        &LogSink::new(log_buf.clone()),
        &LogSink::discard(),
    )
    .unwrap();

    assert_eq!(summary.last_seq, 11);
    assert!(log_buf.lines()[0].starts_with("file #11 ("));
}

#[test]
fn test_copy_many_files_few_workers() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let mut files = Vec::new();
    for i in 0..200 {
        let dir = src.join(format!("d{}", i % 7));
        fs::create_dir_all(&dir).unwrap();
        let f = dir.join(format!("f{i}"));
        fs::write(&f, format!("content {i}")).unwrap();
        files.push(f);
    }

    let log = LogSink::discard();
    let summary = run_copy_pipeline(list_of(&files), &context(&src, &dst, 3), &log, &LogSink::discard())
        .unwrap();

    assert_eq!(summary.copied, 200);
    assert_eq!(log.lines(), 200);
    assert_eq!(
        fs::read_to_string(dst.join("d3/f3")).unwrap(),
        "content 3"
    );
}

#[test]
fn test_copy_backup_log_lines_never_interleave() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    fs::create_dir_all(&src).unwrap();
    let mut files = Vec::new();
    for i in 0..200 {
        let f = src.join(format!("file_{i:03}.dat"));
        fs::write(&f, vec![b'x'; i * 37]).unwrap();
        files.push(f);
    }

    let log_buf = SharedBuf::new();
    let summary = run_copy_pipeline(
        list_of(&files),
        &context(&src, &dst, 6),
        &LogSink::new(log_buf.clone()),
        &LogSink::discard(),
    )
    .unwrap();
    assert_eq!(summary.copied, 200);

    let lines = log_buf.lines();
    assert_eq!(lines.len(), 200);
    let src_prefix = format!("{}/", src.display());
    let dst_prefix = format!("{}/", dst.display());
    let mut seqs = Vec::new();
    for line in &lines {
        let rest = line.strip_prefix("file #").expect(line);
        let (seq, rest) = rest.split_once(" (").expect(line);
        let body = rest.strip_suffix(") ok").expect(line);
        let (from, to) = body.split_once(" -> ").expect(line);
        assert!(from.starts_with(&src_prefix), "{line}");
        assert!(to.starts_with(&dst_prefix), "{line}");
        assert_eq!(from[src_prefix.len()..], to[dst_prefix.len()..], "{line}");
        seqs.push(seq.parse::<u64>().expect(line));
    }
    seqs.sort_unstable();
    assert_eq!(seqs, (1..=200).collect::<Vec<u64>>());
}

// --- per-file failures ---

#[test]
fn test_copy_directory_entry_fails_without_aborting() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let mut files = sample_source(&src);
    files.insert(0, src.join("a"));

    let err_buf = SharedBuf::new();
    let summary = run_copy_pipeline(
        list_of(&files),
        &context(&src, &dst, 2),
        &LogSink::discard(),
        &LogSink::new(err_buf.clone()),
    )
    .unwrap();

    assert_eq!(summary.copied, 2);
    assert_eq!(summary.failed, 1);
    let errs = err_buf.lines();
    assert_eq!(errs.len(), 1);
    assert!(errs[0].contains("not a regular file"));
    assert!(dst.join("top.bin").is_file());
}

#[test]
fn test_copy_path_outside_root_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    sample_source(&src);
    let outside = tmp.path().join("outside.txt");
    fs::write(&outside, b"x").unwrap();

    let log_buf = SharedBuf::new();
    let err_buf = SharedBuf::new();
    let summary = run_copy_pipeline(
        list_of(&[outside]),
        &context(&src, &dst, 1),
        &LogSink::new(log_buf.clone()),
        &LogSink::new(err_buf.clone()),
    )
    .unwrap();

    assert_eq!(summary.failed, 1);
    assert!(log_buf.lines()[0].contains("<unresolved>"));
    assert!(err_buf.lines()[0].contains("not under source root"));
    assert!(!dst.exists());
}

#[test]
fn test_copy_blank_lines_are_malformed() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let files = sample_source(&src);
    let input = format!("\n{}\n\n", files[0].display());

    let err_buf = SharedBuf::new();
    let summary = run_copy_pipeline(
        Cursor::new(input.into_bytes()),
        &context(&src, &dst, 2),
        &LogSink::discard(),
        &LogSink::new(err_buf.clone()),
    )
    .unwrap();

    assert_eq!(summary.malformed, 2);
    assert_eq!(summary.copied, 1);
    assert_eq!(summary.last_seq, 1);
    assert_eq!(err_buf.lines().len(), 2);
}

// --- setup errors ---

#[test]
fn test_copy_zero_pipeline_length_is_error() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let files = sample_source(&src);
    let result = run_copy_pipeline(
        list_of(&files),
        &context(&src, &tmp.path().join("dst"), 0),
        &LogSink::discard(),
        &LogSink::discard(),
    );
    assert!(result.is_err());
}

#[test]
fn test_copy_missing_source_root_is_error() {
    let tmp = tempfile::tempdir().unwrap();
    let result = run_copy_pipeline(
        Cursor::new(Vec::new()),
        &context(&tmp.path().join("nope"), &tmp.path().join("dst"), 1),
        &LogSink::discard(),
        &LogSink::discard(),
    );
    assert!(result.is_err());
}

// --- retry ---

/// A regular file where the target root should be: the target directory can never be created.
fn unreachable_target(tmp: &Path) -> PathBuf {
    let blocker = tmp.join("blocker");
    fs::write(&blocker, b"file").unwrap();
    blocker.join("dst")
}

#[test]
fn test_retry_gives_up_after_bounded_waits() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let files = sample_source(&src);
    let dst = unreachable_target(tmp.path());

    let err = copy_with_retry(
        &files[0],
        &dst.join("a/f.txt"),
        &dst,
        &quick_retry(3),
        false,
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("after 3 waits"));
}

#[test]
fn test_retry_exhaustion_is_per_file_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let files = sample_source(&src);
    let dst = unreachable_target(tmp.path());

    let err_buf = SharedBuf::new();
    let summary = run_copy_pipeline(
        list_of(&files),
        &context(&src, &dst, 2),
        &LogSink::discard(),
        &LogSink::new(err_buf.clone()),
    )
    .unwrap();

    assert_eq!(summary.failed, 2);
    assert_eq!(err_buf.lines().len(), 2);
}

#[test]
fn test_retry_succeeds_once_target_appears() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let files = sample_source(&src);
    let blocker = tmp.path().join("mount");
    fs::write(&blocker, b"file").unwrap();
    let dst = blocker.join("dst");

    let unblock = {
        let blocker = blocker.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            fs::remove_file(&blocker).unwrap();
            fs::create_dir_all(blocker.join("dst")).unwrap();
        })
    };
    let retry = RetryPolicy {
        max_attempts: 20,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
    };
    let result = copy_with_retry(
        &files[0],
        &dst.join("a/f.txt"),
        &dst,
        &retry,
        false,
        &CancelToken::new(),
    );
    unblock.join().unwrap();

    assert!(result.is_ok());
    assert_eq!(fs::read(dst.join("a/f.txt")).unwrap(), b"hello");
}

// --- cancellation ---

#[test]
fn test_cancelled_retry_returns_promptly() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let files = sample_source(&src);
    let dst = unreachable_target(tmp.path());
    let cancel = CancelToken::new();
    cancel.cancel();

    let start = Instant::now();
    let err = copy_with_retry(
        &files[0],
        &dst.join("a/f.txt"),
        &dst,
        &RetryPolicy::default(),
        false,
        &cancel,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "cancelled");
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_cancelled_pipeline_is_error() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let files = sample_source(&src);
    let mut ctx = context(&src, &dst, 1);
    ctx.cancel.cancel();

    let result = run_copy_pipeline(list_of(&files), &ctx, &LogSink::discard(), &LogSink::discard());
    assert!(result.is_err());
}
