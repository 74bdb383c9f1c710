mod handle;
mod security;
mod token;
mod volume;
mod write;

use std::borrow::Cow;
use std::env;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::os::windows::io::AsRawHandle;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use windows_sys::Win32::Foundation::{
    ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_INVALID_PARAMETER, ERROR_LOCK_VIOLATION,
    ERROR_NOT_SAME_DEVICE, ERROR_SHARING_VIOLATION, FILETIME, HANDLE,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateSymbolicLinkW, FILE_ATTRIBUTE_DIRECTORY, FILE_ATTRIBUTE_READONLY,
    FILE_ATTRIBUTE_REPARSE_POINT, FILE_NAME_NORMALIZED, GetFinalPathNameByHandleW,
    SYMBOLIC_LINK_FLAG_ALLOW_UNPRIVILEGED_CREATE, SYMBOLIC_LINK_FLAG_DIRECTORY,
};

pub(crate) use super::umask_env::{set_umask, umask};
pub(crate) use write::*;

use self::handle::Handle;
use self::security::FileSecurity;
use self::token::Token;
use crate::error::{Error, ErrorKind, Op, Result};
use crate::fs::{FileInfo, FileType, Mode, Owner, RawInfo, Timestamp, UNKNOWN_ID};
use crate::nt::{self, acl, long_path};
use crate::util;

const IO_REPARSE_TAG_MOUNT_POINT: u32 = 0xA000_0003;
const IO_REPARSE_TAG_SYMLINK: u32 = 0xA000_000C;

/// Enough to read attributes and the security descriptor.
const METADATA_ACCESS: u32 = acl::FILE_READ_ATTRIBUTES | acl::READ_CONTROL;

/// The working directory at first use, for promoting long relative paths.
static CWD: OnceLock<OsString> = OnceLock::new();

fn cwd() -> &'static OsStr {
    CWD.get_or_init(|| env::current_dir().map(PathBuf::into_os_string).unwrap_or_default())
}

/// `path`, promoted to its `\\?\` form if it's too long for `MAX_PATH`.
pub(crate) fn promoted(path: &Path) -> Cow<'_, Path> {
    match long_path::promote(path.as_os_str(), cwd()) {
        Some(long) => Cow::Owned(PathBuf::from(long)),
        None => Cow::Borrowed(path),
    }
}

/// Converts a path for a wide-character API. Paths containing NUL can't name anything.
pub(crate) fn to_wide(op: Op, path: &Path) -> Result<Vec<u16>> {
    let mut wide: Vec<u16> = promoted(path).as_os_str().encode_wide().collect();
    if wide.contains(&0) {
        Err(Error::os(op, path, io::Error::from(io::ErrorKind::InvalidInput)).with_kind(ErrorKind::Invalid))?
    }
    wide.push(0);
    Ok(wide)
}

const fn filetime(ft: FILETIME) -> Timestamp {
    Timestamp::from_filetime(((ft.dwHighDateTime as i64) << 32) | ft.dwLowDateTime as i64)
}

/// Opens `path` for metadata. Falls back to attributes only, and no security descriptor, when the
/// caller may not read the descriptor.
fn open_metadata(op: Op, path: &Path, follow: bool) -> Result<(Handle, bool)> {
    let wide = to_wide(op, path)?;
    match Handle::open(&wide, METADATA_ACCESS, follow) {
        Ok(handle) => Ok((handle, true)),
        Err(e) if e.raw_os_error() == Some(ERROR_ACCESS_DENIED as i32) => {
            let handle = Handle::open(&wide, acl::FILE_READ_ATTRIBUTES, follow)
                .map_err(|e| Error::os(op, path, e))?;
            Ok((handle, false))
        },
        Err(e) => Err(Error::os(op, path, e)),
    }
}

fn stat_path(op: Op, path: &Path, follow: bool) -> Result<FileInfo> {
    let (handle, readable) = open_metadata(op, path, follow)?;
    let security = if readable { read_security(path, security::of_handle(*handle)) } else { None };
    let raw = raw_info(op, path, *handle, follow, security)?;
    Ok(FileInfo::from_raw(path.to_path_buf(), follow, raw))
}

fn read_security(path: &Path, result: io::Result<FileSecurity>) -> Option<FileSecurity> {
    result.inspect_err(|err| {
        tracing::debug!(path = %path.display(), error = %err, "no security descriptor");
    }).ok()
}

fn raw_info(op: Op, path: &Path, handle: HANDLE, follow: bool, security: Option<FileSecurity>) -> Result<RawInfo> {
    let info = handle::file_information(handle).map_err(|e| Error::os(op, path, e))?;
    let attributes = info.dwFileAttributes;

    let is_link = !follow && attributes & FILE_ATTRIBUTE_REPARSE_POINT != 0 && {
        let tag = handle::reparse_tag(handle).map_err(|e| Error::os(op, path, e))?;
        matches!(tag, IO_REPARSE_TAG_SYMLINK | IO_REPARSE_TAG_MOUNT_POINT)
    };
    let file_type = if is_link {
        FileType::Symlink
    } else if attributes & FILE_ATTRIBUTE_DIRECTORY != 0 {
        FileType::Directory
    } else {
        FileType::Regular
    };

    let mut perm = match &security {
        _ if is_link => 0o777,
        Some(security) if volume::has_persistent_acls(handle, info.dwVolumeSerialNumber) => security.perm(),
        _ if file_type.is_dir() => 0o777,
        _ => 0o666,
    };
    if !is_link && attributes & FILE_ATTRIBUTE_READONLY != 0 {
        perm &= !0o222;
    }

    let domain = security::account_domain();
    let (uid, gid) = match &security {
        Some(security) => (nt::posix_id(&security.owner, domain), nt::posix_id(&security.group, domain)),
        None => (UNKNOWN_ID, UNKNOWN_ID),
    };

    Ok(RawInfo {
        size: ((info.nFileSizeHigh as i64) << 32) | info.nFileSizeLow as i64,
        mode: Mode::new(file_type, perm),
        mtime: filetime(info.ftLastWriteTime),
        atime: filetime(info.ftLastAccessTime),
        ctime: Timestamp::ZERO,
        btime: Some(filetime(info.ftCreationTime)),
        change_time: None,
        partition_id: info.dwVolumeSerialNumber as u64,
        file_id: ((info.nFileIndexHigh as u64) << 32) | info.nFileIndexLow as u64,
        links: info.nNumberOfLinks as u64,
        uid,
        gid,
        owner: None,
    })
}

pub(crate) fn stat(path: &Path) -> Result<FileInfo> {
    stat_path(Op::Stat, path, true)
}

pub(crate) fn lstat(path: &Path) -> Result<FileInfo> {
    stat_path(Op::Lstat, path, false)
}

pub(crate) fn fstat(file: &File) -> Result<FileInfo> {
    let handle = file.as_raw_handle() as HANDLE;
    let path = final_path(handle)?;
    // The handle may lack READ_CONTROL, in which case the descriptor is read by name.
    let security = security::of_handle(handle)
        .or_else(|_| to_wide(Op::Fstat, &path).map_err(io::Error::from).and_then(|w| security::of_path(&w)));
    let security = read_security(&path, security);
    let raw = raw_info(Op::Fstat, &path, handle, true, security)?;
    Ok(FileInfo::from_raw(path, true, raw))
}

/// The normalized path an open handle refers to, in `\\?\` form.
fn final_path(handle: HANDLE) -> Result<PathBuf> {
    let mut buf = vec![0_u16; 512];
    loop {
        // SAFETY: buf has the length passed alongside it.
        let n = unsafe {
            GetFinalPathNameByHandleW(handle, buf.as_mut_ptr(), buf.len() as u32, FILE_NAME_NORMALIZED)
        } as usize;
        if n == 0 {
            Err(Error::last_os(Op::Fstat, PathBuf::new()))?
        }
        // Too small a buffer reports the size needed, including the terminator.
        if n < buf.len() {
            buf.truncate(n);
            return Ok(PathBuf::from(OsString::from_wide(&buf)));
        }
        buf.resize(n, 0);
    }
}

/// Birth time is read eagerly from the creation time.
pub(crate) fn resolve_btime(info: &FileInfo) -> Result<Timestamp> {
    Err(Error::unsupported(Op::Stat, info.path()))
}

/// NTFS `ChangeTime`, which `GetFileInformationByHandle` doesn't report.
pub(crate) fn resolve_change_time(info: &FileInfo) -> Result<Timestamp> {
    let op = if info.follow { Op::Stat } else { Op::Lstat };
    let wide = to_wide(op, info.path())?;
    let handle = Handle::open(&wide, acl::FILE_READ_ATTRIBUTES, info.follow)
        .map_err(|e| Error::os(op, info.path(), e))?;
    let basic = handle::basic_information(*handle).map_err(|e| Error::os(op, info.path(), e))?;
    Ok(Timestamp::from_filetime(basic.ChangeTime))
}

/// Account names for the owner and group SIDs.
pub(crate) fn resolve_owner(info: &FileInfo) -> Result<Owner> {
    let path = info.path();
    let wide = to_wide(Op::Lookup, path)?;
    let security = security::of_path(&wide).map_err(|e| Error::os(Op::Security, path, e))?;
    Ok(Owner {
        user: security::account_name(&security.owner).map_err(|e| Error::os(Op::Lookup, path, e))?,
        group: security::account_name(&security.group).map_err(|e| Error::os(Op::Lookup, path, e))?,
    })
}

/// Another process holds the file open in a conflicting mode.
pub(crate) const fn is_transient(code: i32) -> bool {
    matches!(code as u32, ERROR_SHARING_VIOLATION | ERROR_LOCK_VIOLATION)
}

pub(crate) const fn is_cross_device(code: i32) -> bool {
    code as u32 == ERROR_NOT_SAME_DEVICE
}

/// Virus scanners and indexers briefly open files without `FILE_SHARE_DELETE`, which makes a
/// replacing rename fail with any of these.
pub(crate) const fn is_rename_transient(code: i32) -> bool {
    matches!(code as u32, ERROR_ACCESS_DENIED | ERROR_FILE_NOT_FOUND | ERROR_SHARING_VIOLATION)
}

fn token_error(err: io::Error) -> Error {
    Error::os(Op::Token, PathBuf::new(), err)
}

/// Whether the process token is elevated.
pub(crate) fn is_admin() -> Result<bool> {
    Token::current().and_then(|token| token.is_elevated()).map_err(token_error)
}

pub(crate) fn is_root() -> Result<bool> {
    is_admin()
}

pub(crate) fn getuid() -> Result<u64> {
    let user = Token::current().and_then(|token| token.user()).map_err(token_error)?;
    Ok(nt::posix_id(&user, security::account_domain()))
}

pub(crate) fn getgid() -> Result<u64> {
    let group = Token::current().and_then(|token| token.primary_group()).map_err(token_error)?;
    Ok(nt::posix_id(&group, security::account_domain()))
}

pub(crate) fn chown_symlink(link: &Path) -> Result<()> {
    let user = Token::current().and_then(|token| token.user()).map_err(token_error)?;
    let wide = to_wide(Op::Chown, link)?;
    let handle = Handle::open(&wide, acl::WRITE_OWNER, false).map_err(|e| Error::os(Op::Chown, link, e))?;
    security::set_owner(*handle, &user).map_err(|e| Error::os(Op::Chown, link, e))
}

/// Resolves a relative link target against the directory the link is created in.
fn link_target_is_dir(target: &Path, link: &Path) -> bool {
    let resolved = if target.is_absolute() { target.to_path_buf() } else { util::path::parent_dir(link).join(target) };
    std::fs::metadata(resolved).is_ok_and(|meta| meta.is_dir())
}

/// Creates a file or directory symlink, matching what `target` is now. Unprivileged creation is
/// tried first, since it needs developer mode; older systems reject the flag outright.
pub(crate) fn symlink(target: &Path, link: &Path) -> Result<()> {
    let link_wide = to_wide(Op::Symlink, link)?;
    let mut target_wide: Vec<u16> = target.as_os_str().encode_wide().collect();
    target_wide.push(0);

    let mut flags = SYMBOLIC_LINK_FLAG_ALLOW_UNPRIVILEGED_CREATE;
    if link_target_is_dir(target, link) {
        flags |= SYMBOLIC_LINK_FLAG_DIRECTORY;
    }
    loop {
        // SAFETY: both strings are NUL-terminated.
        if unsafe { CreateSymbolicLinkW(link_wide.as_ptr(), target_wide.as_ptr(), flags) } != 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        let unprivileged = flags & SYMBOLIC_LINK_FLAG_ALLOW_UNPRIVILEGED_CREATE != 0;
        if unprivileged && err.raw_os_error() == Some(ERROR_INVALID_PARAMETER as i32) {
            flags &= !SYMBOLIC_LINK_FLAG_ALLOW_UNPRIVILEGED_CREATE;
            continue;
        }
        Err(Error::os(Op::Symlink, link, err))?
    }
}
