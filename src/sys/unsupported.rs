//! Targets without a filesystem, such as `wasm32-unknown-unknown`. Every operation fails with
//! [`ErrorKind::Unsupported`](crate::ErrorKind::Unsupported).

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{Error, Op, Result};
use crate::fs::{FileInfo, Owner, Timestamp};
use crate::options::{OpenFlags, Options};

const UMASK: u32 = 0o022;

pub(crate) fn stat(path: &Path) -> Result<FileInfo> {
    Err(Error::unsupported(Op::Stat, path))
}

pub(crate) fn lstat(path: &Path) -> Result<FileInfo> {
    Err(Error::unsupported(Op::Lstat, path))
}

pub(crate) fn fstat(_file: &File) -> Result<FileInfo> {
    Err(Error::unsupported(Op::Fstat, PathBuf::new()))
}

pub(crate) fn resolve_btime(info: &FileInfo) -> Result<Timestamp> {
    Err(Error::unsupported(Op::Stat, info.path()))
}

pub(crate) fn resolve_change_time(info: &FileInfo) -> Result<Timestamp> {
    Err(Error::unsupported(Op::Stat, info.path()))
}

pub(crate) fn resolve_owner(info: &FileInfo) -> Result<Owner> {
    Err(Error::unsupported(Op::Lookup, info.path()))
}

pub(crate) const fn is_transient(_code: i32) -> bool {
    false
}

pub(crate) const fn is_cross_device(_code: i32) -> bool {
    false
}

pub(crate) const fn is_rename_transient(_code: i32) -> bool {
    false
}

/// Never constructed.
#[derive(Debug)]
pub(crate) struct WriteHandle {
    path: PathBuf,
}

impl WriteHandle {
    pub(crate) fn create_new(path: &Path, _perm: u32, _flags: OpenFlags) -> Result<WriteHandle> {
        Err(Error::unsupported(Op::CreateTemp, path))
    }

    pub(crate) fn create(path: &Path, _perm: u32, _flags: OpenFlags) -> Result<WriteHandle> {
        Err(Error::unsupported(Op::Open, path))
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn write_all(&mut self, _buf: &[u8]) -> Result<()> {
        Err(Error::unsupported(Op::Write, &self.path))
    }

    pub(crate) fn sync(&self) -> Result<()> {
        Err(Error::unsupported(Op::Sync, &self.path))
    }

    pub(crate) fn perm(&self) -> Result<u32> {
        Err(Error::unsupported(Op::Fstat, &self.path))
    }

    pub(crate) fn close(self) -> Result<()> {
        Err(Error::unsupported(Op::Close, &self.path))
    }
}

pub(crate) fn chmod(path: &Path, _mode: u32) -> Result<()> {
    Err(Error::unsupported(Op::Chmod, path))
}

pub(crate) fn remove_file(path: &Path) -> Result<()> {
    Err(Error::unsupported(Op::Remove, path))
}

pub(crate) fn rename(_src: &Path, dst: &Path) -> Result<()> {
    Err(Error::unsupported(Op::Rename, dst))
}

pub(crate) fn prepare_destination(path: &Path, _options: &Options) -> Result<()> {
    Err(Error::unsupported(Op::Open, path))
}

pub(crate) fn finish_destination(path: &Path, _options: &Options) -> Result<()> {
    Err(Error::unsupported(Op::Open, path))
}

pub(crate) fn symlink(_target: &Path, link: &Path) -> Result<()> {
    Err(Error::unsupported(Op::Symlink, link))
}

pub(crate) fn chown_symlink(link: &Path) -> Result<()> {
    Err(Error::unsupported(Op::Chown, link))
}

pub(crate) fn umask() -> u32 {
    UMASK
}

/// There is no umask to change.
pub(crate) fn set_umask(_mask: u32) -> u32 {
    UMASK
}

pub(crate) fn is_root() -> Result<bool> {
    Err(Error::unsupported(Op::Token, PathBuf::new()))
}

pub(crate) fn is_admin() -> Result<bool> {
    Err(Error::unsupported(Op::Token, PathBuf::new()))
}

pub(crate) fn getuid() -> Result<u64> {
    Err(Error::unsupported(Op::Token, PathBuf::new()))
}

pub(crate) fn getgid() -> Result<u64> {
    Err(Error::unsupported(Op::Token, PathBuf::new()))
}
