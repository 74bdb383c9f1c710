use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use super::{FileType, Lazy, Mode, Timestamp};
use crate::capability::{self, Capability};
use crate::error::Error;
use crate::{sys, util};

/// Returned for owner and group ids that can't be expressed numerically.
pub const UNKNOWN_ID: u64 = u64::MAX;

/// Textual owner and group names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Owner {
    pub user: String,
    pub group: String,
}

/// The fields a platform adapter fills in from its native stat record. `None` in a lazy field
/// means "resolve on first access".
#[derive(Debug, Clone)]
pub(crate) struct RawInfo {
    pub size: i64,
    pub mode: Mode,
    pub mtime: Timestamp,
    pub atime: Timestamp,
    pub ctime: Timestamp,
    pub btime: Option<Timestamp>,
    pub change_time: Option<Timestamp>,
    pub partition_id: u64,
    pub file_id: u64,
    pub links: u64,
    pub uid: u64,
    pub gid: u64,
    pub owner: Option<Owner>,
}

/// Metadata about a file, produced by [`stat`](super::stat), [`lstat`](super::lstat) or
/// [`fstat`](super::fstat).
///
/// Accessors for fields this build doesn't support (see [`capability::supports`]) return zero
/// rather than failing. A few fields are computed on first access; if that fails the accessor
/// returns zero and the failure is kept for [`FileInfo::error`].
///
/// `FileInfo` is cheap to share between threads: lazy fields are resolved at most once, however
/// many threads ask for them.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub(crate) name: OsString,
    pub(crate) path: PathBuf,
    pub(crate) follow: bool,
    pub(crate) size: i64,
    pub(crate) mode: Mode,
    pub(crate) mtime: Timestamp,
    pub(crate) atime: Timestamp,
    pub(crate) ctime: Timestamp,
    pub(crate) btime: Lazy<Timestamp>,
    pub(crate) change_time: Lazy<Timestamp>,
    pub(crate) partition_id: u64,
    pub(crate) file_id: u64,
    pub(crate) links: u64,
    pub(crate) uid: u64,
    pub(crate) gid: u64,
    pub(crate) owner: Lazy<Owner>,
}

fn lazy_from<T>(value: Option<T>) -> Lazy<T> {
    match value {
        Some(value) => Lazy::resolved(value),
        None => Lazy::unresolved(),
    }
}

impl FileInfo {
    /// `follow` records whether the record describes a symlink's target (stat/fstat) or the link
    /// itself (lstat), so lazy lookups repeat the same choice.
    pub(crate) fn from_raw(path: PathBuf, follow: bool, raw: RawInfo) -> FileInfo {
        let gated = |cap, value: Timestamp| {
            if capability::supports(cap) { value } else { Timestamp::ZERO }
        };
        FileInfo {
            name: util::path::base_name(&path),
            follow,
            size: raw.size,
            mode: raw.mode,
            mtime: raw.mtime,
            atime: gated(Capability::ATime, raw.atime),
            ctime: gated(Capability::CTime, raw.ctime),
            btime: lazy_from(raw.btime),
            change_time: lazy_from(raw.change_time),
            partition_id: raw.partition_id,
            file_id: raw.file_id,
            links: if capability::supports(Capability::Links) { raw.links } else { 0 },
            uid: raw.uid,
            gid: raw.gid,
            owner: lazy_from(raw.owner),
            path,
        }
    }

    /// The final component of the path this was read from.
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// The path this was read from. For [`fstat`](super::fstat), the path the descriptor resolves
    /// to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn size(&self) -> i64 {
        self.size
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub const fn file_type(&self) -> FileType {
        self.mode.file_type()
    }

    pub const fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    /// Last modification time.
    pub const fn mtime(&self) -> Timestamp {
        self.mtime
    }

    /// Alias of [`FileInfo::mtime`].
    pub const fn mod_time(&self) -> Timestamp {
        self.mtime
    }

    /// Last access time, or zero without [`Capability::ATime`].
    pub const fn atime(&self) -> Timestamp {
        self.atime
    }

    /// Birth time, or zero without [`Capability::BTime`]. Also zero when the filesystem doesn't
    /// record one.
    pub fn btime(&self) -> Timestamp {
        if !capability::supports(Capability::BTime) {
            return Timestamp::ZERO;
        }
        self.btime.get_or_resolve(|| sys::resolve_btime(self)).copied().unwrap_or_default()
    }

    /// POSIX inode change time, or zero without [`Capability::CTime`].
    pub const fn ctime(&self) -> Timestamp {
        self.ctime
    }

    /// The time the file's metadata last changed: the inode change time on POSIX systems, the NTFS
    /// `ChangeTime` on Windows. Unlike [`FileInfo::ctime`] this is available wherever the platform
    /// records something equivalent.
    pub fn change_time(&self) -> Timestamp {
        self.change_time.get_or_resolve(|| sys::resolve_change_time(self)).copied().unwrap_or_default()
    }

    /// Identifies the filesystem the file lives on.
    pub const fn partition_id(&self) -> u64 {
        self.partition_id
    }

    /// Identifies the file within its partition.
    pub const fn file_id(&self) -> u64 {
        self.file_id
    }

    /// Hard link count, or zero without [`Capability::Links`].
    pub const fn links(&self) -> u64 {
        self.links
    }

    /// Owner id, translated according to [`capability::identity`]. [`UNKNOWN_ID`] when the owner
    /// has no numeric form.
    pub const fn uid(&self) -> u64 {
        self.uid
    }

    pub const fn gid(&self) -> u64 {
        self.gid
    }

    /// Owner name, resolved on first access. Empty if it can't be looked up.
    pub fn user(&self) -> &str {
        self.owner().map_or("", |owner| owner.user.as_str())
    }

    /// Group name, resolved on first access. Empty if it can't be looked up.
    pub fn group(&self) -> &str {
        self.owner().map_or("", |owner| owner.group.as_str())
    }

    fn owner(&self) -> Option<&Owner> {
        self.owner.get_or_resolve(|| sys::resolve_owner(self))
    }

    /// The first error left behind by a lazily computed field, if any.
    ///
    /// Fields that haven't been accessed yet can't have failed, so this only reports on accessors
    /// that have already returned a zero value.
    pub fn error(&self) -> Option<&Error> {
        self.btime.error()
            .or_else(|| self.change_time.error())
            .or_else(|| self.owner.error())
    }
}

/// The basic metadata contract, shared by this crate's [`FileInfo`] and
/// [`std::fs::Metadata`].
///
/// Identity comparisons ([`same_file`](super::same_file),
/// [`same_partition`](super::same_partition)) only work on values that came from this crate and
/// are always `false` otherwise.
pub trait FileMeta {
    fn name(&self) -> &OsStr;
    fn size(&self) -> i64;
    fn mode(&self) -> Mode;
    fn mod_time(&self) -> Timestamp;

    fn is_dir(&self) -> bool {
        self.mode().is_dir()
    }

    #[doc(hidden)]
    fn as_file_info(&self) -> Option<&FileInfo> {
        None
    }
}

impl FileMeta for FileInfo {
    fn name(&self) -> &OsStr {
        FileInfo::name(self)
    }

    fn size(&self) -> i64 {
        self.size
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn mod_time(&self) -> Timestamp {
        self.mtime
    }

    fn as_file_info(&self) -> Option<&FileInfo> {
        Some(self)
    }
}

impl FileMeta for std::fs::Metadata {
    /// `Metadata` doesn't know its own name.
    fn name(&self) -> &OsStr {
        OsStr::new("")
    }

    fn size(&self) -> i64 {
        self.len() as i64
    }

    #[cfg(unix)]
    fn mode(&self) -> Mode {
        use std::os::unix::fs::MetadataExt;
        Mode::from_bits(MetadataExt::mode(self))
    }

    #[cfg(not(unix))]
    fn mode(&self) -> Mode {
        let file_type = self.file_type();
        let (file_type, perm) = if file_type.is_symlink() {
            (FileType::Symlink, 0o777)
        } else if file_type.is_dir() {
            (FileType::Directory, 0o777)
        } else {
            (FileType::Regular, 0o666)
        };
        let mode = Mode::new(file_type, perm);
        if self.permissions().readonly() {
            mode.with_perm(perm & !0o222)
        } else {
            mode
        }
    }

    fn mod_time(&self) -> Timestamp {
        self.modified().map(Timestamp::from).unwrap_or_default()
    }
}
