use std::io::Read;
use std::path::{Path, PathBuf};

use rand::RngCore;

use super::copy;
use crate::error::{Error, ErrorKind, Op, Result, TEMP_ATTEMPTS, TempNamesExhaustedError};
use crate::options::{OpenFlags, Options};
use crate::sys::{self, WriteHandle};
use crate::util::fmt::OctalMode;
use crate::{fs, rename, util};

/// Permissions of the temporary file when no default file mode is given.
pub const CREATE_TEMP_PERM: u32 = 0o600;

/// A sibling temporary file that is removed on drop unless it was published.
#[derive(Debug)]
struct TempFile {
    path: PathBuf,
    published: bool,
}

impl TempFile {
    /// Creates an unused, randomly named file in `dir`. Only [`OpenFlags::SYNC`] is honored.
    fn create(dir: &Path, perm: u32, flags: OpenFlags) -> Result<(TempFile, WriteHandle)> {
        let mut rng = rand::thread_rng();
        TempFile::create_named(dir, perm, flags, TEMP_ATTEMPTS, || rng.next_u32().to_string())
    }

    /// Tries up to `attempts` names from `next_name`, skipping the ones that already exist.
    fn create_named<F: FnMut() -> String>(
        dir: &Path,
        perm: u32,
        flags: OpenFlags,
        attempts: u32,
        mut next_name: F,
    ) -> Result<(TempFile, WriteHandle)> {
        let flags = flags & OpenFlags::SYNC;
        for _ in 0..attempts {
            let path = dir.join(next_name());
            match WriteHandle::create_new(&path, perm, flags) {
                Ok(handle) => return Ok((TempFile { path, published: false }, handle)),
                Err(err) if err.kind().is_already_exists() => continue,
                Err(err) => return Err(err),
            }
        }
        Err(Error::new(Op::CreateTemp, dir, ErrorKind::AlreadyExists, TempNamesExhaustedError))
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.published {
            return;
        }
        match sys::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed temporary file"),
            Err(err) => tracing::warn!(error = %err, "failed to remove temporary file"),
        }
    }
}

/// Writes `data` to `path` atomically: readers see either the old file or all of `data`, never a
/// mix.
///
/// The content goes to a randomly named file next to `path` which is synced to disk and then
/// renamed over `path`. On any failure the temporary file is removed and `path` is left untouched.
///
/// The final permissions are, in order of precedence: [`Options::file_mode`], the replaced file's
/// permissions with [`Options::keep_file_mode`], [`Options::default_file_mode`] masked by the
/// umask, or else [`CREATE_TEMP_PERM`] as masked by the platform. Only the
/// [`SYNC`](OpenFlags::SYNC) flag applies to atomic writes.
pub fn write_file_atomic<P: AsRef<Path>>(path: P, data: &[u8], options: &Options) -> Result<()> {
    write_reader_atomic(path, data, options)
}

/// Like [`write_file_atomic`], streaming the content from `reader`. A read error fails the write
/// and leaves `path` untouched.
pub fn write_reader_atomic<P: AsRef<Path>, R: Read>(path: P, reader: R, options: &Options) -> Result<()> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        Err(Error::empty_path(Op::CreateTemp))?
    }
    let dir = util::path::parent_dir(path);
    let perm = options.default_file_mode.unwrap_or(CREATE_TEMP_PERM);

    let (mut temp, handle) = TempFile::create(&dir, perm, options.flags)?;
    let temp_perm = fill(handle, reader)?;

    let target_perm = final_perm(path, options, temp_perm)?;
    if target_perm != temp_perm {
        sys::chmod(&temp.path, target_perm)?;
    }

    sys::prepare_destination(path, options)?;
    rename::rename_with_retry(&temp.path, path, options.retry)?;
    temp.published = true;
    tracing::debug!(path = %path.display(), perm = ?OctalMode(target_perm), "published file");

    sys::finish_destination(path, options)
}

/// Writes the content, makes it durable and closes the file. Returns the permissions the file was
/// created with.
fn fill<R: Read>(mut handle: WriteHandle, reader: R) -> Result<u32> {
    copy(reader, &mut handle)?;
    handle.sync()?;
    let perm = handle.perm()?;
    handle.close()?;
    Ok(perm)
}

fn final_perm(dst: &Path, options: &Options, temp_perm: u32) -> Result<u32> {
    if let Some(mode) = options.file_mode {
        return Ok(mode);
    }
    if options.keep_file_mode {
        match fs::stat(dst) {
            Ok(info) => return Ok(info.mode().perm_special()),
            Err(err) if err.kind().is_not_found() => {},
            Err(err) => return Err(err),
        }
    }
    if let Some(mode) = options.default_file_mode {
        return Ok(mode & !sys::umask());
    }
    Ok(temp_perm)
}

#[cfg(test)]
mod tests {
    use std::fs as std_fs;

    use tempfile::TempDir;

    use super::*;
    use crate::error::Cause;

    #[test]
    fn test_temp_names_exhausted() {
        let dir = TempDir::new().unwrap();
        std_fs::write(dir.path().join("taken"), "").unwrap();

        let mut tried = 0;
        let err = TempFile::create_named(dir.path(), CREATE_TEMP_PERM, OpenFlags::empty(), 3, || {
            tried += 1;
            String::from("taken")
        }).unwrap_err();

        assert_eq!(tried, 3);
        assert!(err.kind().is_already_exists(), "{err}");
        assert_eq!(err.op(), Op::CreateTemp);
        assert_eq!(err.path(), dir.path());
        assert!(matches!(err.cause(), Cause::TempNamesExhausted(_)));
    }

    #[test]
    fn test_temp_name_collision_is_skipped() {
        let dir = TempDir::new().unwrap();
        std_fs::write(dir.path().join("first"), "kept").unwrap();
        let mut names = ["first", "second"].into_iter().map(String::from);

        let (temp, handle) = TempFile::create_named(
            dir.path(),
            CREATE_TEMP_PERM,
            OpenFlags::empty(),
            2,
            || names.next().unwrap(),
        ).unwrap();
        handle.close().unwrap();

        assert_eq!(temp.path, dir.path().join("second"));
        assert_eq!(std_fs::read_to_string(dir.path().join("first")).unwrap(), "kept");
        drop(temp);
        assert!(!dir.path().join("second").exists());
    }
}
