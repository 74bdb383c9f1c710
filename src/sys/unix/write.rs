use std::path::{Path, PathBuf};

use libc::{O_APPEND, O_CREAT, O_EXCL, O_SYNC, O_TRUNC, O_WRONLY, c_int};

use super::cstring;
use super::fd::Fd;
use crate::error::{Error, Op, Result};
use crate::options::{OpenFlags, Options};

/// A file this crate opened for writing.
#[derive(Debug)]
pub(crate) struct WriteHandle {
    fd: Fd,
    path: PathBuf,
    delete_on_close: bool,
}

impl WriteHandle {
    /// Creates `path`, failing with `AlreadyExists` if anything is there.
    pub(crate) fn create_new(path: &Path, perm: u32, flags: OpenFlags) -> Result<WriteHandle> {
        let mut raw = O_WRONLY | O_CREAT | O_EXCL;
        if flags.contains(OpenFlags::SYNC) {
            raw |= O_SYNC;
        }
        WriteHandle::open(Op::CreateTemp, path, raw, perm, flags)
    }

    /// Opens `path` for writing, creating it with `perm` if needed. Existing content is truncated
    /// unless `flags` asks to append.
    pub(crate) fn create(path: &Path, perm: u32, flags: OpenFlags) -> Result<WriteHandle> {
        let mut raw = O_WRONLY | O_CREAT;
        raw |= if flags.contains(OpenFlags::APPEND) { O_APPEND } else { O_TRUNC };
        if flags.contains(OpenFlags::SYNC) {
            raw |= O_SYNC;
        }
        if flags.contains(OpenFlags::EXCL) {
            raw |= O_EXCL;
        }
        WriteHandle::open(Op::Open, path, raw, perm, flags)
    }

    fn open(op: Op, path: &Path, raw: c_int, perm: u32, flags: OpenFlags) -> Result<WriteHandle> {
        let pathname = cstring(op, path)?;
        let fd = {
            let _umask = super::hold_umask();
            Fd::open(&pathname, raw, perm as libc::mode_t).map_err(|e| Error::os(op, path, e))?
        };
        Ok(WriteHandle {
            fd,
            path: path.to_path_buf(),
            delete_on_close: flags.contains(OpenFlags::DELETE_ON_CLOSE),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.fd.write_all(buf).map_err(|e| Error::os(Op::Write, &self.path, e))
    }

    pub(crate) fn sync(&self) -> Result<()> {
        self.fd.sync().map_err(|e| Error::os(Op::Sync, &self.path, e))
    }

    /// The permission bits the file actually has, after the umask.
    #[allow(clippy::unnecessary_cast)]
    pub(crate) fn perm(&self) -> Result<u32> {
        let raw = self.fd.stat().map_err(|e| Error::os(Op::Fstat, &self.path, e))?;
        Ok(raw.st_mode as u32 & 0o7777)
    }

    pub(crate) fn close(self) -> Result<()> {
        let WriteHandle { fd, path, delete_on_close } = self;
        fd.close().map_err(|e| Error::os(Op::Close, &path, e))?;
        if delete_on_close {
            remove_file(&path)?;
        }
        Ok(())
    }
}

pub(crate) fn chmod(path: &Path, mode: u32) -> Result<()> {
    let pathname = cstring(Op::Chmod, path)?;
    // SAFETY: pathname is NUL-terminated.
    if unsafe { libc::chmod(pathname.as_ptr(), (mode & 0o7777) as libc::mode_t) } == -1 {
        Err(Error::last_os(Op::Chmod, path))?
    }
    Ok(())
}

pub(crate) fn remove_file(path: &Path) -> Result<()> {
    let pathname = cstring(Op::Remove, path)?;
    // SAFETY: pathname is NUL-terminated.
    if unsafe { libc::unlink(pathname.as_ptr()) } == -1 {
        Err(Error::last_os(Op::Remove, path))?
    }
    Ok(())
}

/// A single rename attempt. Same-filesystem renames replace `dst` atomically.
pub(crate) fn rename(src: &Path, dst: &Path) -> Result<()> {
    let from = cstring(Op::Rename, src)?;
    let to = cstring(Op::Rename, dst)?;
    // SAFETY: both strings are NUL-terminated.
    if unsafe { libc::rename(from.as_ptr(), to.as_ptr()) } == -1 {
        Err(Error::last_os(Op::Rename, dst))?
    }
    Ok(())
}

/// POSIX has no read-only attribute to clear.
pub(crate) fn prepare_destination(_path: &Path, _options: &Options) -> Result<()> {
    Ok(())
}

pub(crate) fn finish_destination(_path: &Path, _options: &Options) -> Result<()> {
    Ok(())
}
