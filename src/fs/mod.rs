//! File metadata: [`stat`], [`lstat`], [`fstat`] and identity comparisons.

mod file_info;
mod file_type;
mod lazy;
mod mode;
mod time;

#[cfg(test)]
mod tests;

use std::fs::File;
use std::path::Path;

pub use file_info::{FileInfo, FileMeta, UNKNOWN_ID};
pub(crate) use file_info::{Owner, RawInfo};
pub use file_type::FileType;
pub(crate) use lazy::*;
pub use mode::Mode;
pub use time::Timestamp;

use crate::capability::{self, Capability};
use crate::error::{Error, Op, Result};
use crate::sys;

/// Reads metadata for `path`, following symbolic links.
pub fn stat<P: AsRef<Path>>(path: P) -> Result<FileInfo> {
    sys::stat(path.as_ref())
}

/// Reads metadata for `path`. If it is a symbolic link, describes the link itself.
pub fn lstat<P: AsRef<Path>>(path: P) -> Result<FileInfo> {
    sys::lstat(path.as_ref())
}

/// Reads metadata for an open file. The returned [`FileInfo::path`] is the path the descriptor
/// currently resolves to.
///
/// Fails with [`ErrorKind::Unsupported`](crate::ErrorKind::Unsupported) unless
/// [`Capability::Fstat`] is supported.
pub fn fstat(file: &File) -> Result<FileInfo> {
    if !capability::supports(Capability::Fstat) {
        Err(Error::unsupported(Op::Fstat, ""))?
    }
    sys::fstat(file)
}

/// Whether `a` and `b` are on the same partition. `false` unless both came from this crate.
pub fn same_partition<A: FileMeta + ?Sized, B: FileMeta + ?Sized>(a: &A, b: &B) -> bool {
    match (a.as_file_info(), b.as_file_info()) {
        (Some(a), Some(b)) => a.partition_id == b.partition_id,
        _ => false,
    }
}

/// Whether `a` and `b` describe the same file. Names are never compared; two hard links to one
/// file are the same file. `false` unless both came from this crate.
pub fn same_file<A: FileMeta + ?Sized, B: FileMeta + ?Sized>(a: &A, b: &B) -> bool {
    match (a.as_file_info(), b.as_file_info()) {
        (Some(a), Some(b)) => a.partition_id == b.partition_id && a.file_id == b.file_id,
        _ => false,
    }
}

/// [`stat`]s both paths and compares their partitions.
pub fn same_partitions<P: AsRef<Path>, Q: AsRef<Path>>(a: P, b: Q) -> Result<bool> {
    Ok(same_partition(&stat(a)?, &stat(b)?))
}

/// [`stat`]s both paths and compares them with [`same_file`].
pub fn same_files<P: AsRef<Path>, Q: AsRef<Path>>(a: P, b: Q) -> Result<bool> {
    Ok(same_file(&stat(a)?, &stat(b)?))
}
