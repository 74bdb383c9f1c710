//! A portable layer over file metadata and safe file replacement.
//!
//! # Metadata
//! [`fs::stat`], [`fs::lstat`] and [`fs::fstat`] return a [`FileInfo`] with the same fields on
//! every platform: POSIX-style mode bits (derived from the DACL on Windows), nanosecond
//! timestamps, partition and file ids for identity comparisons ([`fs::same_file`],
//! [`fs::same_partition`]), and numeric owner ids (translated from SIDs on Windows, see
//! [`nt::posix_id`]).
//!
//! Not every platform records every field. The [`capability`] table says which ones this build
//! supports; accessors for the others return zero instead of failing:
//!
//! ```
//! use fscompat::capability::{self, Capability};
//!
//! let info = fscompat::fs::stat(".").unwrap();
//! if capability::supports(Capability::BTime) {
//!     println!("created {:?}", info.btime());
//! }
//! ```
//!
//! # Writing
//! [`write::write_file_atomic`] writes to a temporary sibling file, syncs it and renames it over the
//! destination, so the destination never holds a partial write. [`rename::rename`] replaces
//! existing files on every platform and retries the transient failures Windows and macOS produce
//! while other processes hold a file open.
//!
//! # Errors
//! Every operation returns an [`Error`] naming the operation and path that failed, with an
//! [`ErrorKind`] to branch on.

#![warn(clippy::missing_safety_doc)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(clippy::missing_const_for_fn)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_inception)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod capability;
pub mod error;
pub mod fs;
pub mod link;
pub mod nt;
pub mod options;
#[cfg(feature = "process")]
pub mod process;
pub mod rename;
#[cfg(feature = "write")]
pub mod write;

pub(crate) mod sys;
pub(crate) mod util;

pub use capability::{Capability, supports};
pub use error::{Error, ErrorKind, Result};
pub use fs::{FileInfo, FileMeta, UNKNOWN_ID};
pub use options::{OpenFlags, Options, ReadOnlyMode};
