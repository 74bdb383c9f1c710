use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::windows::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use windows_sys::Win32::Foundation::{ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND};
use windows_sys::Win32::Storage::FileSystem::{
    DeleteFileW, FILE_ATTRIBUTE_NORMAL, FILE_ATTRIBUTE_READONLY, FILE_FLAG_DELETE_ON_CLOSE,
    FILE_FLAG_WRITE_THROUGH, GetFileAttributesW, INVALID_FILE_ATTRIBUTES, MOVEFILE_REPLACE_EXISTING,
    MOVEFILE_WRITE_THROUGH, MoveFileExW, SetFileAttributesW,
};

use super::handle::{self, Handle};
use super::{promoted, security, stat, to_wide, volume};
use crate::error::{Error, Op, Result};
use crate::nt::acl;
use crate::options::{OpenFlags, Options};
use crate::util::fmt::OctalMode;

/// A file this crate opened for writing.
#[derive(Debug)]
pub(crate) struct WriteHandle {
    file: File,
    path: PathBuf,
}

impl WriteHandle {
    /// Creates `path`, failing with `AlreadyExists` if anything is there. `perm` is left to the
    /// inherited DACL.
    pub(crate) fn create_new(path: &Path, _perm: u32, flags: OpenFlags) -> Result<WriteHandle> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        if flags.contains(OpenFlags::SYNC) {
            options.custom_flags(FILE_FLAG_WRITE_THROUGH);
        }
        WriteHandle::open(Op::CreateTemp, path, &options)
    }

    /// Opens `path` for writing, creating it if needed. Existing content is truncated unless
    /// `flags` asks to append. A new file without owner write permission in `perm` gets the
    /// read-only attribute, unless [`OpenFlags::NO_RO_ATTR`] is set.
    pub(crate) fn create(path: &Path, perm: u32, flags: OpenFlags) -> Result<WriteHandle> {
        let mut options = OpenOptions::new();
        if flags.contains(OpenFlags::APPEND) {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        if flags.contains(OpenFlags::EXCL) {
            options.create_new(true);
        } else {
            options.create(true);
        }

        let mut custom = 0;
        if flags.contains(OpenFlags::SYNC) {
            custom |= FILE_FLAG_WRITE_THROUGH;
        }
        if flags.contains(OpenFlags::DELETE_ON_CLOSE) {
            custom |= FILE_FLAG_DELETE_ON_CLOSE;
            options.write(true).access_mode(acl::GENERIC_WRITE | acl::DELETE);
        }
        options.custom_flags(custom);
        if perm & 0o200 == 0 && !flags.contains(OpenFlags::NO_RO_ATTR) {
            options.attributes(FILE_ATTRIBUTE_READONLY);
        }
        WriteHandle::open(Op::Open, path, &options)
    }

    fn open(op: Op, path: &Path, options: &OpenOptions) -> Result<WriteHandle> {
        let file = options.open(promoted(path)).map_err(|e| Error::os(op, path, e))?;
        Ok(WriteHandle {
            file,
            path: path.to_path_buf(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.file.write_all(buf).map_err(|e| Error::os(Op::Write, &self.path, e))
    }

    pub(crate) fn sync(&self) -> Result<()> {
        self.file.sync_all().map_err(|e| Error::os(Op::Sync, &self.path, e))
    }

    /// The permission bits the new file's DACL grants.
    pub(crate) fn perm(&self) -> Result<u32> {
        Ok(stat(&self.path)?.mode().perm())
    }

    /// Closing the handle is what deletes a `DELETE_ON_CLOSE` file.
    pub(crate) fn close(self) -> Result<()> {
        drop(self.file);
        Ok(())
    }
}

/// Rewrites the DACL to grant `mode`, or on volumes without persistent ACLs sets the read-only
/// attribute when `mode` lacks owner write.
pub(crate) fn chmod(path: &Path, mode: u32) -> Result<()> {
    let os = |e: io::Error| Error::os(Op::Chmod, path, e);
    let wide = to_wide(Op::Chmod, path)?;
    let handle = Handle::open(&wide, acl::FILE_READ_ATTRIBUTES | acl::READ_CONTROL, true).map_err(os)?;
    let info = handle::file_information(*handle).map_err(os)?;

    if !volume::has_persistent_acls(*handle, info.dwVolumeSerialNumber) {
        drop(handle);
        return set_read_only(Op::Chmod, path, &wide, mode & 0o200 == 0);
    }

    let current = security::of_handle(*handle).map_err(os)?;
    drop(handle);
    let aces = acl::aces_from_mode(mode & 0o777, &current.owner, &current.group);
    security::set_dacl(&wide, &aces).map_err(os)?;
    tracing::trace!(path = %path.display(), mode = ?OctalMode(mode), "replaced dacl");
    Ok(())
}

/// Sets or clears `FILE_ATTRIBUTE_READONLY`. A missing file is an error.
fn set_read_only(op: Op, path: &Path, wide: &[u16], read_only: bool) -> Result<()> {
    // SAFETY: wide is NUL-terminated.
    let attributes = unsafe { GetFileAttributesW(wide.as_ptr()) };
    if attributes == INVALID_FILE_ATTRIBUTES {
        Err(Error::last_os(op, path))?
    }
    let next = if read_only {
        attributes | FILE_ATTRIBUTE_READONLY
    } else {
        attributes & !FILE_ATTRIBUTE_READONLY
    };
    if next == attributes {
        return Ok(());
    }
    // FILE_ATTRIBUTE_NORMAL stands for "no attributes" and is only valid alone.
    let next = if next == 0 { FILE_ATTRIBUTE_NORMAL } else { next };
    // SAFETY: wide is NUL-terminated.
    if unsafe { SetFileAttributesW(wide.as_ptr(), next) } == 0 {
        Err(Error::last_os(op, path))?
    }
    Ok(())
}

/// Deletes `path`, clearing its read-only attribute if that is what's in the way.
pub(crate) fn remove_file(path: &Path) -> Result<()> {
    let wide = to_wide(Op::Remove, path)?;
    // SAFETY: wide is NUL-terminated.
    if unsafe { DeleteFileW(wide.as_ptr()) } != 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() != Some(ERROR_ACCESS_DENIED as i32) {
        Err(Error::os(Op::Remove, path, err))?
    }
    set_read_only(Op::Remove, path, &wide, false)?;
    // SAFETY: wide is NUL-terminated.
    if unsafe { DeleteFileW(wide.as_ptr()) } == 0 {
        Err(Error::last_os(Op::Remove, path))?
    }
    Ok(())
}

/// A single `MoveFileEx` attempt, replacing `dst`.
pub(crate) fn rename(src: &Path, dst: &Path) -> Result<()> {
    let from = to_wide(Op::Rename, src)?;
    let to = to_wide(Op::Rename, dst)?;
    // SAFETY: both strings are NUL-terminated.
    let ok = unsafe { MoveFileExW(from.as_ptr(), to.as_ptr(), MOVEFILE_REPLACE_EXISTING | MOVEFILE_WRITE_THROUGH) };
    if ok == 0 {
        Err(Error::last_os(Op::Rename, dst))?
    }
    Ok(())
}

/// With [`ReadOnlyMode::Reset`](crate::ReadOnlyMode::Reset), clears the read-only attribute of an
/// existing destination so it can be replaced.
pub(crate) fn prepare_destination(path: &Path, options: &Options) -> Result<()> {
    if !options.read_only_mode.is_reset() {
        return Ok(());
    }
    let wide = to_wide(Op::Open, path)?;
    match set_read_only(Op::Open, path, &wide, false) {
        Err(err) if err.raw_os_error() == Some(ERROR_FILE_NOT_FOUND as i32) => Ok(()),
        result => result,
    }
}

/// With [`ReadOnlyMode::Set`](crate::ReadOnlyMode::Set), marks the written file read-only.
pub(crate) fn finish_destination(path: &Path, options: &Options) -> Result<()> {
    if !options.read_only_mode.is_set() {
        return Ok(());
    }
    let wide = to_wide(Op::Chmod, path)?;
    set_read_only(Op::Chmod, path, &wide, true)
}
