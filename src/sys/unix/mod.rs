mod fd;
mod owner;
mod raw;
mod write;

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::mem::MaybeUninit;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use libc::{c_int, stat as Stat};

pub(crate) use owner::resolve_owner;
pub(crate) use write::*;

use crate::error::{Error, ErrorKind, Op, Result};
use crate::fs::{FileInfo, Timestamp};

/// Converts a path for a syscall. Paths containing NUL can't name anything.
pub(crate) fn cstring(op: Op, path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        Error::os(op, path, io::Error::from(io::ErrorKind::InvalidInput)).with_kind(ErrorKind::Invalid)
    })
}

fn stat_raw(op: Op, path: &Path) -> Result<Stat> {
    let pathname = cstring(op, path)?;
    let mut raw: MaybeUninit<Stat> = MaybeUninit::uninit();
    // SAFETY: pathname is NUL-terminated and raw is large enough for a stat.
    let rc = unsafe {
        match op {
            Op::Lstat => libc::lstat(pathname.as_ptr(), raw.as_mut_ptr()),
            _ => libc::stat(pathname.as_ptr(), raw.as_mut_ptr()),
        }
    };
    if rc == -1 {
        Err(Error::last_os(op, path))?
    }
    // SAFETY: stat and lstat initialize raw when they succeed.
    Ok(unsafe { raw.assume_init() })
}

pub(crate) fn stat(path: &Path) -> Result<FileInfo> {
    let raw = stat_raw(Op::Stat, path)?;
    Ok(FileInfo::from_raw(path.to_path_buf(), true, raw::raw_info(&raw)))
}

pub(crate) fn lstat(path: &Path) -> Result<FileInfo> {
    let raw = stat_raw(Op::Lstat, path)?;
    Ok(FileInfo::from_raw(path.to_path_buf(), false, raw::raw_info(&raw)))
}

pub(crate) fn fstat(file: &File) -> Result<FileInfo> {
    let fd = file.as_raw_fd();
    let path = fd_path(fd)?;
    let mut raw: MaybeUninit<Stat> = MaybeUninit::uninit();
    // SAFETY: fd is open for the lifetime of file and raw is large enough for a stat.
    if unsafe { libc::fstat(fd, raw.as_mut_ptr()) } == -1 {
        Err(Error::last_os(Op::Fstat, &path))?
    }
    // SAFETY: fstat initializes raw when it succeeds.
    let raw = unsafe { raw.assume_init() };
    Ok(FileInfo::from_raw(path, true, raw::raw_info(&raw)))
}

/// The path an open descriptor refers to.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn fd_path(fd: c_int) -> Result<PathBuf> {
    let link = PathBuf::from(format!("/proc/self/fd/{fd}"));
    std::fs::read_link(&link).map_err(|e| Error::os(Op::Readlink, link, e))
}

#[cfg(any(target_vendor = "apple", target_os = "netbsd", target_os = "dragonfly"))]
fn fd_path(fd: c_int) -> Result<PathBuf> {
    use std::ffi::{CStr, OsStr};

    let mut buf = vec![0 as libc::c_char; libc::PATH_MAX as usize];
    // SAFETY: F_GETPATH writes at most PATH_MAX bytes, including the terminator, into buf.
    if unsafe { libc::fcntl(fd, libc::F_GETPATH, buf.as_mut_ptr()) } == -1 {
        Err(Error::last_os(Op::Fstat, format!("fd {fd}")))?
    }
    // SAFETY: on success buf holds a NUL-terminated path.
    let path = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Ok(PathBuf::from(OsStr::from_bytes(path.to_bytes())))
}

#[cfg(target_os = "freebsd")]
fn fd_path(fd: c_int) -> Result<PathBuf> {
    use std::ffi::{CStr, OsStr};

    // SAFETY: kinfo_file is plain data, for which all zeroes is a valid value.
    let mut info: libc::kinfo_file = unsafe { std::mem::zeroed() };
    info.kf_structsize = std::mem::size_of::<libc::kinfo_file>() as c_int;
    // SAFETY: F_KINFO fills at most kf_structsize bytes of info.
    if unsafe { libc::fcntl(fd, libc::F_KINFO, &mut info as *mut libc::kinfo_file) } == -1 {
        Err(Error::last_os(Op::Fstat, format!("fd {fd}")))?
    }
    // SAFETY: on success kf_path holds a NUL-terminated path.
    let path = unsafe { CStr::from_ptr(info.kf_path.as_ptr()) };
    Ok(PathBuf::from(OsStr::from_bytes(path.to_bytes())))
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_vendor = "apple",
    target_os = "netbsd",
    target_os = "dragonfly",
    target_os = "freebsd",
)))]
fn fd_path(fd: c_int) -> Result<PathBuf> {
    Err(Error::unsupported(Op::Fstat, format!("fd {fd}")))
}

/// Birth time through statx. Filesystems that don't record one produce zero, not an error.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
pub(crate) fn resolve_btime(info: &FileInfo) -> Result<Timestamp> {
    let pathname = cstring(Op::Statx, info.path())?;
    let flags = libc::AT_STATX_SYNC_AS_STAT | if info.follow { 0 } else { libc::AT_SYMLINK_NOFOLLOW };
    let mut raw: MaybeUninit<libc::statx> = MaybeUninit::uninit();
    // SAFETY: pathname is NUL-terminated and raw is large enough for a statx.
    let rc = unsafe {
        libc::statx(libc::AT_FDCWD, pathname.as_ptr(), flags, libc::STATX_BTIME, raw.as_mut_ptr())
    };
    if rc == -1 {
        Err(Error::last_os(Op::Statx, info.path()))?
    }
    // SAFETY: statx initializes raw when it succeeds.
    let raw = unsafe { raw.assume_init() };
    if raw.stx_mask & libc::STATX_BTIME == 0 {
        return Ok(Timestamp::ZERO);
    }
    Ok(Timestamp::new(raw.stx_btime.tv_sec, raw.stx_btime.tv_nsec as i64))
}

// Everywhere else birth time is either read eagerly from stat or not supported at all.
#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
pub(crate) fn resolve_btime(info: &FileInfo) -> Result<Timestamp> {
    Err(Error::unsupported(Op::Statx, info.path()))
}

/// POSIX adapters fill the change time eagerly from `st_ctime`.
pub(crate) fn resolve_change_time(info: &FileInfo) -> Result<Timestamp> {
    Ok(info.ctime)
}

pub(crate) const fn is_transient(_code: i32) -> bool {
    false
}

pub(crate) const fn is_cross_device(code: i32) -> bool {
    code == libc::EXDEV
}

/// On Darwin a rename can briefly see `ENOENT` while another process is replacing the file.
pub(crate) const fn is_rename_transient(code: i32) -> bool {
    cfg!(target_vendor = "apple") && code == libc::ENOENT
}

pub(crate) fn symlink(target: &Path, link: &Path) -> Result<()> {
    let target = cstring(Op::Symlink, target)?;
    let linkpath = cstring(Op::Symlink, link)?;
    // SAFETY: both strings are NUL-terminated.
    if unsafe { libc::symlink(target.as_ptr(), linkpath.as_ptr()) } == -1 {
        Err(Error::last_os(Op::Symlink, link))?
    }
    Ok(())
}

/// Gives the link itself (not its target) to the calling user.
pub(crate) fn chown_symlink(link: &Path) -> Result<()> {
    let pathname = cstring(Op::Chown, link)?;
    // SAFETY: pathname is NUL-terminated; getuid and getgid can't fail.
    if unsafe { libc::lchown(pathname.as_ptr(), libc::getuid(), libc::getgid()) } == -1 {
        Err(Error::last_os(Op::Chown, link))?
    }
    Ok(())
}

/// Mirrors the kernel umask. Files are created under the read lock; anything that changes the
/// kernel value, even briefly, holds the write lock.
static UMASK: RwLock<Option<u32>> = RwLock::new(None);

/// Keeps the kernel umask stable while a file is created.
pub(super) fn hold_umask() -> RwLockReadGuard<'static, Option<u32>> {
    UMASK.read().unwrap_or_else(PoisonError::into_inner)
}

/// The `Umask:` line of `/proc/self/status`, present since Linux 4.7.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn proc_umask() -> Option<u32> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let value = status.lines().find_map(|line| line.strip_prefix("Umask:"))?;
    u32::from_str_radix(value.trim(), 8).ok()
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const fn proc_umask() -> Option<u32> {
    None
}

/// Callers hold the UMASK write lock.
fn read_kernel_umask() -> u32 {
    if let Some(mask) = proc_umask() {
        return mask;
    }
    // SAFETY: umask can't fail. The original value is restored straight away.
    unsafe {
        let old = libc::umask(0o022);
        libc::umask(old);
        old as u32
    }
}

pub(crate) fn umask() -> u32 {
    let cached = *hold_umask();
    if let Some(mask) = cached {
        return mask;
    }
    let mut current = UMASK.write().unwrap_or_else(PoisonError::into_inner);
    *current.get_or_insert_with(read_kernel_umask)
}

pub(crate) fn set_umask(mask: u32) -> u32 {
    let mut current = UMASK.write().unwrap_or_else(PoisonError::into_inner);
    // SAFETY: umask can't fail.
    let old = unsafe { libc::umask((mask & 0o777) as libc::mode_t) } as u32;
    *current = Some(mask & 0o777);
    old
}

pub(crate) fn is_root() -> Result<bool> {
    // SAFETY: geteuid can't fail.
    Ok(unsafe { libc::geteuid() } == 0)
}

pub(crate) fn is_admin() -> Result<bool> {
    is_root()
}

pub(crate) fn getuid() -> Result<u64> {
    // SAFETY: getuid can't fail.
    Ok(unsafe { libc::getuid() } as u64)
}

pub(crate) fn getgid() -> Result<u64> {
    // SAFETY: getgid can't fail.
    Ok(unsafe { libc::getgid() } as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_umask_comes_from_proc() {
        let Some(mask) = proc_umask() else {
            // Kernels before 4.7 don't report it.
            return;
        };
        assert_eq!(mask & !0o777, 0);
        assert_eq!(umask(), mask);
    }

    #[test]
    fn test_umask_is_cached() {
        let mask = umask();
        assert_eq!(*hold_umask(), Some(mask));
    }
}
