#![cfg(test)]

use std::fs as std_fs;
use std::io::{self, Read};
use std::path::Path;

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::capability;
use crate::error::ErrorKind;
use crate::options::OpenFlags;
use crate::{fs, sys};

/// Yields three bytes, then fails.
struct FailingReader {
    sent: bool,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.sent {
            return Err(io::Error::other("reader gave up"));
        }
        self.sent = true;
        buf[..3].copy_from_slice(b"abc");
        Ok(3)
    }
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std_fs::read_dir(dir).unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn perm_of(path: &Path) -> u32 {
    fs::stat(path).unwrap().mode().perm()
}

#[test]
fn test_atomic_write_fresh_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("x");
    let mut options = Options::new();
    options.file_mode(0o600);

    write_file_atomic(&path, b"hello", &options).unwrap();

    assert_eq!(std_fs::read(&path).unwrap(), b"hello");
    assert_eq!(entries(dir.path()), ["x"]);
    if capability::identity().is_int() {
        assert_eq!(perm_of(&path), 0o600);
    }
}

#[test]
fn test_atomic_write_failing_reader_leaves_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("y");

    let err = write_reader_atomic(&path, FailingReader { sent: false }, &Options::new()).unwrap_err();

    assert_eq!(err.op(), Op::Read);
    assert!(!path.exists());
    assert!(entries(dir.path()).is_empty());
}

#[test]
fn test_atomic_write_failure_keeps_old_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config");
    std_fs::write(&path, "old").unwrap();

    assert!(write_reader_atomic(&path, FailingReader { sent: false }, &Options::new()).is_err());

    assert_eq!(std_fs::read_to_string(&path).unwrap(), "old");
    assert_eq!(entries(dir.path()), ["config"]);
}

#[test]
fn test_atomic_write_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("twice");
    let options = Options::new();

    write_file_atomic(&path, b"same", &options).unwrap();
    let first = fs::stat(&path).unwrap();
    write_file_atomic(&path, b"same", &options).unwrap();
    let second = fs::stat(&path).unwrap();

    assert_eq!(std_fs::read(&path).unwrap(), b"same");
    assert_eq!(first.size(), second.size());
    assert_eq!(first.mode(), second.mode());
    assert_eq!(entries(dir.path()), ["twice"]);
}

#[test]
fn test_atomic_write_replaces_larger_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shrink");
    std_fs::write(&path, "a much longer previous body").unwrap();

    write_file_atomic(&path, b"short", &Options::new()).unwrap();

    assert_eq!(std_fs::read_to_string(&path).unwrap(), "short");
}

#[test]
fn test_atomic_write_through_dot_dot() {
    let dir = TempDir::new().unwrap();
    std_fs::create_dir(dir.path().join("sub")).unwrap();
    let path = dir.path().join("sub").join("..").join("rel");

    write_file_atomic(&path, b"1", &Options::new()).unwrap();

    assert_eq!(std_fs::read(dir.path().join("rel")).unwrap(), b"1");
    assert_eq!(entries(dir.path()), ["rel", "sub"]);
}

#[test]
fn test_atomic_write_missing_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("file");

    let err = write_file_atomic(&path, b"data", &Options::new()).unwrap_err();

    assert_eq!(err.op(), Op::CreateTemp);
    assert!(err.kind().is_not_found(), "{err}");
}

#[test]
fn test_empty_paths_are_invalid() {
    let options = Options::new();
    assert_eq!(write_file_atomic("", b"", &options).unwrap_err().kind(), ErrorKind::Invalid);
    assert_eq!(write_file("", b"", 0o644, &options).unwrap_err().kind(), ErrorKind::Invalid);
    assert_eq!(chmod("", 0o644).unwrap_err().kind(), ErrorKind::Invalid);
}

#[cfg(unix)]
#[rstest]
#[case(0o600)]
#[case(0o640)]
#[case(0o755)]
fn test_atomic_file_mode_is_verbatim(#[case] mode: u32) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("f");
    let mut options = Options::new();
    options.file_mode(mode);

    write_file_atomic(&path, b"x", &options).unwrap();

    assert_eq!(perm_of(&path), mode);
}

#[cfg(unix)]
#[test]
fn test_atomic_keep_file_mode() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kept");
    std_fs::write(&path, "old").unwrap();
    sys::chmod(&path, 0o640).unwrap();
    let mut options = Options::new();
    options.keep_file_mode(true).default_file_mode(0o600);

    write_file_atomic(&path, b"new", &options).unwrap();

    assert_eq!(perm_of(&path), 0o640);
    assert_eq!(std_fs::read_to_string(&path).unwrap(), "new");
}

#[cfg(unix)]
#[test]
fn test_atomic_keep_file_mode_without_destination() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fresh");
    let mut options = Options::new();
    options.keep_file_mode(true).default_file_mode(0o644);

    write_file_atomic(&path, b"new", &options).unwrap();

    assert_eq!(perm_of(&path), 0o644 & !sys::umask());
}

#[cfg(unix)]
#[test]
fn test_atomic_file_mode_beats_keep() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("f");
    std_fs::write(&path, "old").unwrap();
    sys::chmod(&path, 0o644).unwrap();
    let mut options = Options::new();
    options.keep_file_mode(true).file_mode(0o600);

    write_file_atomic(&path, b"new", &options).unwrap();

    assert_eq!(perm_of(&path), 0o600);
}

#[cfg(unix)]
#[test]
fn test_atomic_default_temp_perm() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("f");

    write_file_atomic(&path, b"x", &Options::new()).unwrap();

    assert_eq!(perm_of(&path), CREATE_TEMP_PERM & !sys::umask());
}

#[test]
fn test_write_file_truncates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plain");
    std_fs::write(&path, "previous content").unwrap();

    write_file(&path, b"next", 0o644, &Options::new()).unwrap();

    assert_eq!(std_fs::read_to_string(&path).unwrap(), "next");
}

#[test]
fn test_write_file_append() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log");
    let mut options = Options::new();
    options.flags(OpenFlags::APPEND);

    write_file(&path, b"one\n", 0o644, &options).unwrap();
    write_file(&path, b"two\n", 0o644, &options).unwrap();

    assert_eq!(std_fs::read_to_string(&path).unwrap(), "one\ntwo\n");
}

#[test]
fn test_write_file_exclusive() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("once");
    let mut options = Options::new();
    options.flags(OpenFlags::EXCL);

    write_file(&path, b"1", 0o644, &options).unwrap();
    let err = write_file(&path, b"2", 0o644, &options).unwrap_err();

    assert!(err.kind().is_already_exists(), "{err}");
    assert_eq!(std_fs::read_to_string(&path).unwrap(), "1");
}

#[test]
fn test_write_file_delete_on_close() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scratch");
    let mut options = Options::new();
    options.flags(OpenFlags::DELETE_ON_CLOSE);

    write_file(&path, b"gone", 0o644, &options).unwrap();

    assert!(!path.exists());
}

#[test]
fn test_write_file_atomically_option() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("routed");
    let mut options = Options::new();
    options.atomically(true);

    let err = write_reader(&path, FailingReader { sent: false }, 0o644, &options).unwrap_err();
    assert_eq!(err.op(), Op::Read);
    assert!(entries(dir.path()).is_empty());

    write_file(&path, b"ok", 0o644, &options).unwrap();
    assert_eq!(std_fs::read(&path).unwrap(), b"ok");
    if capability::identity().is_int() {
        assert_eq!(perm_of(&path), 0o644 & !sys::umask());
    }
}

#[cfg(unix)]
#[test]
fn test_write_file_mode_and_chmod() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m");

    write_file(&path, b"x", 0o640, &Options::new()).unwrap();
    assert_eq!(perm_of(&path), 0o640 & !sys::umask());

    chmod(&path, 0o604).unwrap();
    assert_eq!(perm_of(&path), 0o604);
}

#[test]
fn test_write_reader_streams_large_input() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big");
    let data: Vec<u8> = (0..(3 * 64 * 1024 + 17)).map(|i| (i % 251) as u8).collect();

    write_reader_atomic(&path, data.as_slice(), &Options::new()).unwrap();

    assert_eq!(std_fs::read(&path).unwrap(), data);
    assert_eq!(fs::stat(&path).unwrap().size(), data.len() as i64);
}
