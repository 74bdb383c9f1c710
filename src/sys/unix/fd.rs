use std::ffi::CStr;
use std::fmt::{self, Debug, Formatter};
use std::io;
use std::mem::{ManuallyDrop, MaybeUninit};
use std::ops::Deref;

use libc::{EINTR, c_int, stat as Stat};

/// An owned file descriptor.
pub(crate) struct Fd(pub c_int);

impl Fd {
    pub fn open(pathname: &CStr, flags: c_int, mode: libc::mode_t) -> io::Result<Fd> {
        loop {
            // SAFETY: pathname is a valid NUL-terminated string. The mode is passed as an unsigned
            // int to match the variadic promotion open expects.
            match unsafe { libc::open(pathname.as_ptr(), flags | libc::O_CLOEXEC, mode as libc::c_uint) } {
                -1 => match io::Error::last_os_error() {
                    e if e.raw_os_error() == Some(EINTR) => continue,
                    e => return Err(e),
                },
                fd => return Ok(Fd(fd)),
            }
        }
    }

    pub fn stat(&self) -> io::Result<Stat> {
        let mut raw: MaybeUninit<Stat> = MaybeUninit::uninit();
        // SAFETY: raw points to writable memory large enough for a stat.
        if unsafe { libc::fstat(self.0, raw.as_mut_ptr()) } == -1 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: fstat initializes raw when it succeeds.
        Ok(unsafe { raw.assume_init() })
    }

    pub fn write_all(&self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            // SAFETY: buf is a valid slice for its whole length.
            match unsafe { libc::write(self.0, buf.as_ptr().cast(), buf.len()) } {
                -1 => match io::Error::last_os_error() {
                    e if e.raw_os_error() == Some(EINTR) => continue,
                    e => return Err(e),
                },
                0 => return Err(io::ErrorKind::WriteZero.into()),
                n => buf = &buf[n as usize..],
            }
        }
        Ok(())
    }

    /// Flushes data and metadata to the device.
    pub fn sync(&self) -> io::Result<()> {
        // macOS fsync only reaches the drive's cache; F_FULLFSYNC asks the drive to flush it.
        #[cfg(target_vendor = "apple")]
        {
            // SAFETY: F_FULLFSYNC takes no argument beyond the descriptor.
            if unsafe { libc::fcntl(self.0, libc::F_FULLFSYNC) } != -1 {
                return Ok(());
            }
        }
        // SAFETY: fsync only reads the descriptor.
        match unsafe { libc::fsync(self.0) } {
            -1 => Err(io::Error::last_os_error()),
            _ => Ok(()),
        }
    }

    pub fn close(self) -> io::Result<()> {
        // Drop must not close the descriptor a second time.
        let fd = ManuallyDrop::new(self);
        // SAFETY: close invalidates the descriptor regardless of the outcome, so this method takes
        // ownership of self. EINTR is not retried for the same reason.
        match unsafe { libc::close(fd.0) } {
            -1 => match io::Error::last_os_error() {
                e if e.raw_os_error() == Some(EINTR) => Ok(()),
                e => Err(e),
            },
            _ => Ok(()),
        }
    }
}

impl Deref for Fd {
    type Target = c_int;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for Fd {
    fn drop(&mut self) {
        // SAFETY: the descriptor is owned and never used again.
        if unsafe { libc::close(self.0) } == -1 {
            tracing::warn!(fd = self.0, error = %io::Error::last_os_error(), "error while dropping file descriptor");
        }
    }
}

impl Debug for Fd {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Fd({})", self.0)
    }
}
