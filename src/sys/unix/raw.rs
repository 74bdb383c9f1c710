//! Normalization of `struct stat`, whose timestamp fields are spelled differently per OS.

use libc::stat as Stat;

use crate::fs::{FileType, Mode, RawInfo, Timestamp};

#[cfg(not(any(target_os = "netbsd", target_os = "aix")))]
#[allow(clippy::unnecessary_cast)]
fn times(raw: &Stat) -> [Timestamp; 3] {
    [
        Timestamp::new(raw.st_atime as i64, raw.st_atime_nsec as i64),
        Timestamp::new(raw.st_mtime as i64, raw.st_mtime_nsec as i64),
        Timestamp::new(raw.st_ctime as i64, raw.st_ctime_nsec as i64),
    ]
}

#[cfg(target_os = "netbsd")]
#[allow(clippy::unnecessary_cast)]
fn times(raw: &Stat) -> [Timestamp; 3] {
    [
        Timestamp::new(raw.st_atime as i64, raw.st_atimensec as i64),
        Timestamp::new(raw.st_mtime as i64, raw.st_mtimensec as i64),
        Timestamp::new(raw.st_ctime as i64, raw.st_ctimensec as i64),
    ]
}

#[cfg(target_os = "aix")]
#[allow(clippy::unnecessary_cast)]
fn times(raw: &Stat) -> [Timestamp; 3] {
    [
        Timestamp::new(raw.st_atim.tv_sec as i64, raw.st_atim.tv_nsec as i64),
        Timestamp::new(raw.st_mtim.tv_sec as i64, raw.st_mtim.tv_nsec as i64),
        Timestamp::new(raw.st_ctim.tv_sec as i64, raw.st_ctim.tv_nsec as i64),
    ]
}

#[cfg(any(target_vendor = "apple", target_os = "freebsd"))]
#[allow(clippy::unnecessary_cast)]
fn birth_time(raw: &Stat) -> Option<Timestamp> {
    Some(Timestamp::new(raw.st_birthtime as i64, raw.st_birthtime_nsec as i64))
}

// Linux reports birth time through statx only; it is resolved on first access.
#[cfg(not(any(target_vendor = "apple", target_os = "freebsd")))]
fn birth_time(_raw: &Stat) -> Option<Timestamp> {
    None
}

#[allow(clippy::unnecessary_cast)]
pub(crate) fn raw_info(raw: &Stat) -> RawInfo {
    let [atime, mtime, ctime] = times(raw);
    RawInfo {
        size: raw.st_size as i64,
        mode: Mode::new(FileType::from_stat_mode(raw.st_mode), raw.st_mode as u32 & 0o7777),
        mtime,
        atime,
        ctime,
        btime: birth_time(raw),
        change_time: Some(ctime),
        partition_id: raw.st_dev as u64,
        file_id: raw.st_ino as u64,
        links: raw.st_nlink as u64,
        uid: raw.st_uid as u64,
        gid: raw.st_gid as u64,
        owner: None,
    }
}
