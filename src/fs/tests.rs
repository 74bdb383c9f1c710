#![cfg(test)]

use std::fs as std_fs;
use std::fs::File;
use std::path::Path;

use tempfile::TempDir;

use super::*;
use crate::capability::{self, Capability, IdentityModel};
use crate::error::ErrorKind;

fn file_with(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std_fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_stat_regular_file() {
    let dir = TempDir::new().unwrap();
    let path = file_with(dir.path(), "a.txt", "hello");

    let info = stat(&path).unwrap();

    assert_eq!(info.name(), "a.txt");
    assert_eq!(info.path(), path);
    assert_eq!(info.size(), 5);
    assert!(info.file_type().is_file());
    assert!(!info.is_dir());
    assert!(!info.mtime().is_zero());
    assert_eq!(info.mod_time(), info.mtime());
    assert!(info.error().is_none());
}

#[test]
fn test_stat_directory() {
    let dir = TempDir::new().unwrap();
    let info = stat(dir.path()).unwrap();
    assert!(info.is_dir());
    assert!(info.mode().is_dir());
}

#[test]
fn test_name_keeps_dot_elements() {
    let dir = TempDir::new().unwrap();
    std_fs::create_dir(dir.path().join("sub")).unwrap();

    assert_eq!(stat(dir.path().join("sub").join("..")).unwrap().name(), "..");
    assert_eq!(stat(dir.path().join("sub").join(".")).unwrap().name(), ".");
    assert_eq!(stat(dir.path().join("sub")).unwrap().name(), "sub");
}

#[test]
fn test_stat_missing_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing");

    let err = stat(&missing).unwrap_err();

    assert!(err.kind().is_not_found(), "{err}");
    assert_eq!(err.op(), Op::Stat);
    assert_eq!(err.path(), missing);
}

#[test]
fn test_hard_links_are_the_same_file() {
    let dir = TempDir::new().unwrap();
    let original = file_with(dir.path(), "original", "x");
    let linked = dir.path().join("linked");
    std_fs::hard_link(&original, &linked).unwrap();
    let other = file_with(dir.path(), "other", "x");

    let (a, b, c) = (stat(&original).unwrap(), stat(&linked).unwrap(), stat(&other).unwrap());

    assert!(same_file(&a, &b));
    assert!(!same_file(&a, &c));
    assert!(same_partition(&a, &c));
    assert!(same_files(&original, &linked).unwrap());
    assert!(same_partitions(&original, &other).unwrap());
    if capability::supports(Capability::Links) {
        assert_eq!(a.links(), 2);
        assert_eq!(c.links(), 1);
    } else {
        assert_eq!(a.links(), 0);
    }
}

#[test]
fn test_same_files_propagates_errors() {
    let dir = TempDir::new().unwrap();
    let present = file_with(dir.path(), "present", "");
    let err = same_files(&present, dir.path().join("absent")).unwrap_err();
    assert!(err.kind().is_not_found());
}

#[test]
fn test_foreign_metadata_is_never_the_same_file() {
    let dir = TempDir::new().unwrap();
    let path = file_with(dir.path(), "f", "abc");

    let ours = stat(&path).unwrap();
    let theirs = std_fs::metadata(&path).unwrap();

    assert!(!same_file(&ours, &theirs));
    assert!(!same_file(&theirs, &theirs));
    assert!(!same_partition(&theirs, &ours));
    assert_eq!(FileMeta::size(&theirs), 3);
    assert!(!FileMeta::is_dir(&theirs));
    assert_eq!(FileMeta::mod_time(&theirs), ours.mod_time());
}

#[test]
fn test_lstat_describes_the_link() {
    if !capability::supports(Capability::Symlinks) {
        return;
    }
    let dir = TempDir::new().unwrap();
    let target = file_with(dir.path(), "target", "content");
    let link = dir.path().join("link");
    if crate::sys::symlink(&target, &link).is_err() {
        // Creating links can need a privilege the test account lacks.
        return;
    }

    let followed = stat(&link).unwrap();
    let link_info = lstat(&link).unwrap();

    assert!(followed.file_type().is_file());
    assert_eq!(followed.size(), 7);
    assert!(link_info.file_type().is_symlink());
    assert_eq!(link_info.name(), "link");
    assert!(same_file(&followed, &stat(&target).unwrap()));
    assert!(!same_file(&link_info, &followed));
}

#[test]
fn test_lstat_of_regular_file_matches_stat() {
    let dir = TempDir::new().unwrap();
    let path = file_with(dir.path(), "plain", "x");
    let (a, b) = (stat(&path).unwrap(), lstat(&path).unwrap());
    assert!(same_file(&a, &b));
    assert_eq!(a.mode(), b.mode());
}

#[test]
fn test_unsupported_times_are_zero() {
    let dir = TempDir::new().unwrap();
    let info = stat(file_with(dir.path(), "t", "")).unwrap();

    if !capability::supports(Capability::ATime) {
        assert!(info.atime().is_zero());
    }
    if !capability::supports(Capability::CTime) {
        assert!(info.ctime().is_zero());
    }
    if !capability::supports(Capability::BTime) {
        assert!(info.btime().is_zero());
    }
}

#[test]
fn test_btime_is_not_after_mtime() {
    if !capability::supports(Capability::BTime) {
        return;
    }
    let dir = TempDir::new().unwrap();
    let info = stat(file_with(dir.path(), "born", "x")).unwrap();

    let btime = info.btime();
    // Zero means the filesystem doesn't record a birth time.
    if !btime.is_zero() {
        assert!(btime <= info.mtime(), "{btime:?} > {:?}", info.mtime());
    }
}

#[test]
fn test_change_time() {
    let dir = TempDir::new().unwrap();
    let info = stat(file_with(dir.path(), "changed", "x")).unwrap();

    let change_time = info.change_time();

    assert!(!change_time.is_zero());
    if capability::supports(Capability::CTime) {
        assert_eq!(change_time, info.ctime());
    }
    // Cached after the first access.
    assert_eq!(info.change_time(), change_time);
}

#[test]
fn test_fstat() {
    let dir = TempDir::new().unwrap();
    let path = file_with(dir.path(), "open", "12345678");
    let file = File::open(&path).unwrap();

    let info = match fstat(&file) {
        Err(err) if err.kind() == ErrorKind::Unsupported => {
            assert!(!capability::supports(Capability::Fstat));
            return;
        },
        result => result.unwrap(),
    };

    assert_eq!(info.size(), 8);
    assert_eq!(info.name(), "open");
    assert!(same_file(&info, &stat(&path).unwrap()));
    if capability::supports(Capability::BTime) {
        let btime = info.btime();
        assert!(btime.is_zero() || btime <= info.mtime());
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_fstat_path_follows_the_descriptor() {
    let dir = TempDir::new().unwrap();
    let path = file_with(dir.path(), "before", "x");
    let file = File::open(&path).unwrap();
    let renamed = dir.path().join("after");
    std_fs::rename(&path, &renamed).unwrap();

    let info = fstat(&file).unwrap();

    assert_eq!(info.name(), "after");
    assert_eq!(info.path(), std_fs::canonicalize(&renamed).unwrap());
}

#[test]
fn test_owner_names() {
    let dir = TempDir::new().unwrap();
    let info = stat(file_with(dir.path(), "owned", "")).unwrap();

    match capability::identity() {
        IdentityModel::Int | IdentityModel::Sid => {
            assert!(!info.user().is_empty());
            assert!(!info.group().is_empty());
            assert!(info.error().is_none(), "{:?}", info.error());
        },
        IdentityModel::String | IdentityModel::None => {
            assert_eq!(info.uid(), UNKNOWN_ID);
        },
    }
}

#[cfg(unix)]
#[test]
fn test_unix_ids_match_the_process() {
    let dir = TempDir::new().unwrap();
    let info = stat(file_with(dir.path(), "mine", "")).unwrap();
    // SAFETY: geteuid can't fail.
    let euid = unsafe { libc::geteuid() } as u64;
    assert_eq!(info.uid(), euid);
}

#[cfg(unix)]
#[test]
fn test_mode_bits_match_std() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let path = file_with(dir.path(), "perm", "");
    std_fs::set_permissions(&path, std_fs::Permissions::from_mode(0o640)).unwrap();

    let info = stat(&path).unwrap();

    assert_eq!(info.mode().perm(), 0o640);
    assert_eq!(info.mode(), FileMeta::mode(&std_fs::metadata(&path).unwrap()));
}

#[test]
fn test_file_info_is_shareable() {
    let dir = TempDir::new().unwrap();
    let info = stat(file_with(dir.path(), "shared", "")).unwrap();

    let names: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| info.user().to_owned())).collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert!(names.windows(2).all(|pair| pair[0] == pair[1]));
}
