//! Replacing rename, with retries for errors caused by other processes briefly holding a file
//! (virus scanners, indexers).

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Op, Result};
use crate::options::Options;
use crate::sys;

const INITIAL_BACKOFF: Duration = Duration::from_millis(1);
const MAX_BACKOFF: Duration = Duration::from_millis(500);

/// Renames `src` to `dst`, replacing `dst` if it exists.
///
/// Renaming across partitions fails with [`ErrorKind::CrossDevice`](crate::ErrorKind::CrossDevice);
/// the file is never copied. Errors that other processes cause transiently (sharing violations on
/// Windows, `ENOENT` on Darwin) are retried with exponential backoff for up to
/// [`Options::retry`]. On Windows both paths are promoted to the `\\?\` form when they are too
/// long for `MAX_PATH`.
pub fn rename<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q, options: &Options) -> Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    if src.as_os_str().is_empty() || dst.as_os_str().is_empty() {
        Err(Error::empty_path(Op::Rename))?
    }
    rename_with_retry(src, dst, options.retry)
}

pub(crate) fn rename_with_retry(src: &Path, dst: &Path, budget: Duration) -> Result<()> {
    let start = Instant::now();
    let mut delay = INITIAL_BACKOFF;
    let mut attempt: u32 = 1;
    loop {
        let err = match sys::rename(src, dst) {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        let transient = err.raw_os_error().is_some_and(sys::is_rename_transient);
        if !transient || start.elapsed() + delay > budget {
            return Err(err);
        }
        tracing::debug!(
            src = %src.display(),
            dst = %dst.display(),
            attempt,
            ?delay,
            error = %err,
            "retrying rename",
        );
        thread::sleep(delay);
        delay = (delay * 2).min(MAX_BACKOFF);
        attempt += 1;
    }
}
