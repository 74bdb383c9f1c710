//! Platform adapters.
//!
//! Exactly one adapter is compiled in. Each exposes the same set of items, which the rest of the
//! crate calls without further `cfg`s:
//!
//! - `stat`, `lstat`, `fstat`: fill a [`FileInfo`](crate::fs::FileInfo).
//! - `resolve_btime`, `resolve_change_time`, `resolve_owner`: lazy field resolvers.
//! - `is_transient`, `is_cross_device`, `is_rename_transient`: error code predicates.
//! - `WriteHandle`, `chmod`, `remove_file`, `rename`, `prepare_destination`,
//!   `finish_destination`: the write path.
//! - `symlink`, `chown_symlink`: link creation.
//! - `umask`, `set_umask`, `is_root`, `is_admin`, `getuid`, `getgid`: process state.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub(crate) use unix::*;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use windows::*;

#[cfg(target_os = "wasi")]
mod wasi;
#[cfg(target_os = "wasi")]
pub(crate) use wasi::*;

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
mod unsupported;
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub(crate) use unsupported::*;

#[cfg(any(windows, target_os = "wasi", test))]
pub(crate) mod umask_env;
