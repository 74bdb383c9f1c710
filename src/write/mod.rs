//! Writing whole files.
//!
//! [`write_file`] and [`write_reader`] open the destination and write it in place, so a reader can
//! observe a partial file and a crash can leave one behind. [`write_file_atomic`] and
//! [`write_reader_atomic`] instead publish the content with a single rename, so the destination
//! always holds either its old content or all of the new content.

mod atomic;

#[cfg(test)]
mod tests;

use std::io::{self, Read};
use std::path::Path;

pub use atomic::*;

use crate::error::{Error, Op, Result};
use crate::options::Options;
use crate::sys::{self, WriteHandle};

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Writes `data` to `path`, creating it with permissions `mode` (subject to the umask) if needed.
///
/// With [`Options::atomically`] this is [`write_file_atomic`], with `mode` as the default file
/// mode.
pub fn write_file<P: AsRef<Path>>(path: P, data: &[u8], mode: u32, options: &Options) -> Result<()> {
    write_reader(path, data, mode, options)
}

/// Like [`write_file`], streaming the content from `reader`.
pub fn write_reader<P: AsRef<Path>, R: Read>(path: P, reader: R, mode: u32, options: &Options) -> Result<()> {
    let path = path.as_ref();
    if options.atomically {
        let mut options = options.clone();
        if options.default_file_mode.is_none() {
            options.default_file_mode(mode);
        }
        return write_reader_atomic(path, reader, &options);
    }
    if path.as_os_str().is_empty() {
        Err(Error::empty_path(Op::Open))?
    }

    sys::prepare_destination(path, options)?;
    let mut file = WriteHandle::create(path, mode & 0o7777, options.flags)?;
    copy(reader, &mut file)?;
    if let Some(mode) = options.file_mode {
        sys::chmod(path, mode)?;
    }
    file.close()?;
    sys::finish_destination(path, options)
}

/// Applies the permission bits of `mode` to `path`. On Windows this rewrites the file's DACL, or
/// toggles its read-only attribute on volumes without persistent ACLs.
pub fn chmod<P: AsRef<Path>>(path: P, mode: u32) -> Result<()> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        Err(Error::empty_path(Op::Chmod))?
    }
    sys::chmod(path, mode)
}

/// Streams `reader` into `file`. Read failures are reported against the file being written.
pub(crate) fn copy<R: Read>(mut reader: R, file: &mut WriteHandle) -> Result<u64> {
    let mut buf = vec![0; COPY_BUF_SIZE];
    let mut total = 0;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Err(Error::os(Op::Read, file.path(), e))?,
        };
        file.write_all(&buf[..n])?;
        total += n as u64;
    }
}
