//! Error values shared by every operation in this crate.
//!
//! Each failure is an [`Error`] that names the operation ([`Op`]) and the path it was acting on,
//! classifies the failure into an [`ErrorKind`] the caller can branch on, and keeps the underlying
//! [`Cause`] for display and [`source`](std::error::Error::source) chains.

use std::fmt::{self, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use derive_more::{Display, Error, From, IsVariant};

use crate::sys;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Number of names the atomic writer tries before giving up on a temporary file.
pub const TEMP_ATTEMPTS: u32 = 10_000;

#[derive(Debug, Display, Clone, Copy, Error)]
#[display("path is empty")]
pub struct EmptyPathError;

#[derive(Debug, Display, Clone, Copy, Error)]
#[display("no unused temporary name after {TEMP_ATTEMPTS} attempts")]
pub struct TempNamesExhaustedError;

#[derive(Debug, Display, Clone, Copy, Error)]
#[display("operation not supported on this platform")]
pub struct UnsupportedError;

#[derive(Debug, Display, Clone, Copy, Error)]
#[display("file info was not produced by this library")]
pub struct ForeignInfoError;

/// The underlying reason for an [`Error`].
#[derive(Debug, Display, Clone, From, Error)]
pub enum Cause {
    #[from(skip)]
    Os(Arc<io::Error>),
    EmptyPath(EmptyPathError),
    TempNamesExhausted(TempNamesExhaustedError),
    Unsupported(UnsupportedError),
    ForeignInfo(ForeignInfoError),
}

impl From<io::Error> for Cause {
    fn from(value: io::Error) -> Self {
        Cause::Os(Arc::new(value))
    }
}

/// What the caller should do about an error, independent of the platform that produced it.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum ErrorKind {
    #[display("not found")]
    NotFound,
    #[display("permission denied")]
    PermissionDenied,
    #[display("not a directory")]
    NotADirectory,
    #[display("is a directory")]
    IsADirectory,
    #[display("invalid argument")]
    Invalid,
    #[display("already exists")]
    AlreadyExists,
    #[display("unsupported")]
    Unsupported,
    #[display("transient")]
    Transient,
    #[display("cross-device")]
    CrossDevice,
    #[display("other")]
    Other,
}

impl ErrorKind {
    pub(crate) fn classify(err: &io::Error) -> ErrorKind {
        if let Some(code) = err.raw_os_error() {
            if sys::is_transient(code) {
                return ErrorKind::Transient;
            }
            if sys::is_cross_device(code) {
                return ErrorKind::CrossDevice;
            }
        }
        match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            io::ErrorKind::NotADirectory => ErrorKind::NotADirectory,
            io::ErrorKind::IsADirectory => ErrorKind::IsADirectory,
            io::ErrorKind::InvalidInput => ErrorKind::Invalid,
            io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            io::ErrorKind::Unsupported => ErrorKind::Unsupported,
            io::ErrorKind::CrossesDevices => ErrorKind::CrossDevice,
            _ => ErrorKind::Other,
        }
    }
}

/// The operation that failed.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    #[display("stat")]
    Stat,
    #[display("lstat")]
    Lstat,
    #[display("fstat")]
    Fstat,
    #[display("open")]
    Open,
    #[display("read")]
    Read,
    #[display("write")]
    Write,
    #[display("sync")]
    Sync,
    #[display("close")]
    Close,
    #[display("chmod")]
    Chmod,
    #[display("chown")]
    Chown,
    #[display("rename")]
    Rename,
    #[display("createtemp")]
    CreateTemp,
    #[display("remove")]
    Remove,
    #[display("symlink")]
    Symlink,
    #[display("readlink")]
    Readlink,
    #[display("statx")]
    Statx,
    #[display("lookup")]
    Lookup,
    #[display("security")]
    Security,
    #[display("token")]
    Token,
}

/// An operation failure: `op path: cause`.
#[derive(Debug, Clone, Error)]
pub struct Error {
    op: Op,
    path: PathBuf,
    kind: ErrorKind,
    #[error(source)]
    cause: Cause,
}

impl Error {
    pub(crate) fn new<P: Into<PathBuf>, C: Into<Cause>>(op: Op, path: P, kind: ErrorKind, cause: C) -> Error {
        Error {
            op,
            path: path.into(),
            kind,
            cause: cause.into(),
        }
    }

    /// Wraps an OS error, classifying it into an [`ErrorKind`].
    pub(crate) fn os<P: Into<PathBuf>>(op: Op, path: P, err: io::Error) -> Error {
        let kind = ErrorKind::classify(&err);
        Error::new(op, path, kind, err)
    }

    /// Wraps the calling thread's last OS error.
    pub(crate) fn last_os<P: Into<PathBuf>>(op: Op, path: P) -> Error {
        Error::os(op, path, io::Error::last_os_error())
    }

    pub(crate) fn empty_path(op: Op) -> Error {
        Error::new(op, PathBuf::new(), ErrorKind::Invalid, EmptyPathError)
    }

    pub(crate) fn unsupported<P: Into<PathBuf>>(op: Op, path: P) -> Error {
        Error::new(op, path, ErrorKind::Unsupported, UnsupportedError)
    }

    pub(crate) fn with_kind(mut self, kind: ErrorKind) -> Error {
        self.kind = kind;
        self
    }

    pub const fn op(&self) -> Op {
        self.op
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub const fn cause(&self) -> &Cause {
        &self.cause
    }

    /// The raw OS error code, if this error came from a system call.
    pub fn raw_os_error(&self) -> Option<i32> {
        match &self.cause {
            Cause::Os(err) => err.raw_os_error(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.op, self.path.display(), self.cause)
    }
}

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        let kind = match value.kind {
            ErrorKind::NotFound => io::ErrorKind::NotFound,
            ErrorKind::PermissionDenied => io::ErrorKind::PermissionDenied,
            ErrorKind::NotADirectory => io::ErrorKind::NotADirectory,
            ErrorKind::IsADirectory => io::ErrorKind::IsADirectory,
            ErrorKind::Invalid => io::ErrorKind::InvalidInput,
            ErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
            ErrorKind::Unsupported => io::ErrorKind::Unsupported,
            ErrorKind::CrossDevice => io::ErrorKind::CrossesDevices,
            ErrorKind::Transient | ErrorKind::Other => match &value.cause {
                Cause::Os(err) => err.kind(),
                _ => io::ErrorKind::Other,
            },
        };
        io::Error::new(kind, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_op_and_path() {
        let err = Error::os(Op::Stat, "/no/such/file", io::Error::from(io::ErrorKind::NotFound));
        let text = err.to_string();
        assert!(text.starts_with("stat /no/such/file: "), "unexpected display: {text}");
        assert!(err.kind().is_not_found());
    }

    #[test]
    fn test_empty_path_is_invalid() {
        let err = Error::empty_path(Op::Rename);
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(err.op(), Op::Rename);
        assert!(matches!(err.cause(), Cause::EmptyPath(_)));
        assert_eq!(err.raw_os_error(), None);
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let err = Error::unsupported(Op::Fstat, "f");
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_clone_shares_os_error() {
        let err = Error::os(Op::Open, "x", io::Error::from_raw_os_error(2));
        let copy = err.clone();
        assert_eq!(copy.raw_os_error(), err.raw_os_error());
        assert_eq!(copy.to_string(), err.to_string());
    }
}
