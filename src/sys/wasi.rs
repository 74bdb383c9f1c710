//! WASI preview 1. Metadata comes from wasi-libc's `stat`; there are no owners, permissions or
//! symlink creation, and the umask lives in user space.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::mem::MaybeUninit;
use std::path::{Path, PathBuf};

pub(crate) use super::umask_env::{set_umask, umask};

use crate::error::{Error, ErrorKind, Op, Result};
use crate::fs::{FileInfo, FileType, Mode, Owner, RawInfo, Timestamp, UNKNOWN_ID};
use crate::options::{OpenFlags, Options};

fn cstring(op: Op, path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_encoded_bytes()).map_err(|_| {
        Error::os(op, path, io::Error::from(io::ErrorKind::InvalidInput)).with_kind(ErrorKind::Invalid)
    })
}

const fn timespec(ts: libc::timespec) -> Timestamp {
    Timestamp::new(ts.tv_sec, ts.tv_nsec as i64)
}

fn stat_path(op: Op, path: &Path) -> Result<FileInfo> {
    let pathname = cstring(op, path)?;
    let mut raw: MaybeUninit<libc::stat> = MaybeUninit::uninit();
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
    // SAFETY: initialized on success.
    let raw = unsafe { raw.assume_init() };

    // WASI has no permission bits; everything readable is reported writable too.
    let file_type = FileType::from_stat_mode(raw.st_mode);
    let perm = if file_type.is_dir() { 0o777 } else { 0o666 };
    let info = RawInfo {
        size: raw.st_size,
        mode: Mode::new(file_type, perm),
        mtime: timespec(raw.st_mtim),
        atime: timespec(raw.st_atim),
        ctime: timespec(raw.st_ctim),
        btime: Some(Timestamp::ZERO),
        change_time: Some(timespec(raw.st_ctim)),
        partition_id: raw.st_dev,
        file_id: raw.st_ino,
        links: raw.st_nlink,
        uid: UNKNOWN_ID,
        gid: UNKNOWN_ID,
        owner: Some(Owner::default()),
    };
    Ok(FileInfo::from_raw(path.to_path_buf(), op != Op::Lstat, info))
}

pub(crate) fn stat(path: &Path) -> Result<FileInfo> {
    stat_path(Op::Stat, path)
}

pub(crate) fn lstat(path: &Path) -> Result<FileInfo> {
    stat_path(Op::Lstat, path)
}

pub(crate) fn fstat(_file: &File) -> Result<FileInfo> {
    Err(Error::unsupported(Op::Fstat, PathBuf::new()))
}

pub(crate) fn resolve_btime(info: &FileInfo) -> Result<Timestamp> {
    Err(Error::unsupported(Op::Stat, info.path()))
}

pub(crate) fn resolve_change_time(info: &FileInfo) -> Result<Timestamp> {
    Ok(info.ctime)
}

pub(crate) fn resolve_owner(_info: &FileInfo) -> Result<Owner> {
    Ok(Owner::default())
}

pub(crate) const fn is_transient(_code: i32) -> bool {
    false
}

pub(crate) const fn is_cross_device(code: i32) -> bool {
    code == libc::EXDEV
}

pub(crate) const fn is_rename_transient(_code: i32) -> bool {
    false
}

/// A file this crate opened for writing.
#[derive(Debug)]
pub(crate) struct WriteHandle {
    file: File,
    path: PathBuf,
    delete_on_close: bool,
}

impl WriteHandle {
    pub(crate) fn create_new(path: &Path, _perm: u32, _flags: OpenFlags) -> Result<WriteHandle> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        WriteHandle::open(Op::CreateTemp, path, &options, false)
    }

    pub(crate) fn create(path: &Path, _perm: u32, flags: OpenFlags) -> Result<WriteHandle> {
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
        WriteHandle::open(Op::Open, path, &options, flags.contains(OpenFlags::DELETE_ON_CLOSE))
    }

    fn open(op: Op, path: &Path, options: &OpenOptions, delete_on_close: bool) -> Result<WriteHandle> {
        let file = options.open(path).map_err(|e| Error::os(op, path, e))?;
        Ok(WriteHandle {
            file,
            path: path.to_path_buf(),
            delete_on_close,
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

    pub(crate) fn perm(&self) -> Result<u32> {
        Ok(0o666)
    }

    pub(crate) fn close(self) -> Result<()> {
        let WriteHandle { file, path, delete_on_close } = self;
        drop(file);
        if delete_on_close {
            remove_file(&path)?;
        }
        Ok(())
    }
}

/// There are no permission bits to change; the file only has to exist.
pub(crate) fn chmod(path: &Path, _mode: u32) -> Result<()> {
    stat(path).map(drop)
}

pub(crate) fn remove_file(path: &Path) -> Result<()> {
    std::fs::remove_file(path).map_err(|e| Error::os(Op::Remove, path, e))
}

pub(crate) fn rename(src: &Path, dst: &Path) -> Result<()> {
    std::fs::rename(src, dst).map_err(|e| Error::os(Op::Rename, dst, e))
}

pub(crate) fn prepare_destination(_path: &Path, _options: &Options) -> Result<()> {
    Ok(())
}

pub(crate) fn finish_destination(_path: &Path, _options: &Options) -> Result<()> {
    Ok(())
}

pub(crate) fn symlink(_target: &Path, link: &Path) -> Result<()> {
    Err(Error::unsupported(Op::Symlink, link))
}

pub(crate) fn chown_symlink(link: &Path) -> Result<()> {
    Err(Error::unsupported(Op::Chown, link))
}

pub(crate) fn is_root() -> Result<bool> {
    Ok(false)
}

pub(crate) fn is_admin() -> Result<bool> {
    Ok(false)
}

pub(crate) fn getuid() -> Result<u64> {
    Ok(UNKNOWN_ID)
}

pub(crate) fn getgid() -> Result<u64> {
    Ok(UNKNOWN_ID)
}
