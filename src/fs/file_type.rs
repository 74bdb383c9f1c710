#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    BlockDevice,
    CharDevice,
    Directory,
    Fifo,
    Symlink,
    Regular,
    Socket,
    Other,
}

use FileType::*;

// Portable type bits, independent of the host's libc.
pub(crate) const S_IFMT: u32 = 0o170000;
pub(crate) const S_IFSOCK: u32 = 0o140000;
pub(crate) const S_IFLNK: u32 = 0o120000;
pub(crate) const S_IFREG: u32 = 0o100000;
pub(crate) const S_IFBLK: u32 = 0o060000;
pub(crate) const S_IFDIR: u32 = 0o040000;
pub(crate) const S_IFCHR: u32 = 0o020000;
pub(crate) const S_IFIFO: u32 = 0o010000;

impl FileType {
    /// Decodes the portable type bits of a [`Mode`](super::Mode).
    #[inline(always)]
    pub(crate) const fn from_mode_bits(bits: u32) -> FileType {
        match bits & S_IFMT {
            S_IFBLK => BlockDevice,
            S_IFCHR => CharDevice,
            S_IFDIR => Directory,
            S_IFIFO => Fifo,
            S_IFLNK => Symlink,
            S_IFREG => Regular,
            S_IFSOCK => Socket,
            _ => Other,
        }
    }

    pub(crate) const fn mode_bits(self) -> u32 {
        match self {
            BlockDevice => S_IFBLK,
            CharDevice => S_IFCHR,
            Directory => S_IFDIR,
            Fifo => S_IFIFO,
            Symlink => S_IFLNK,
            Regular => S_IFREG,
            Socket => S_IFSOCK,
            Other => 0,
        }
    }

    /// Decodes the native `st_mode` type bits.
    #[cfg(any(unix, target_os = "wasi"))]
    #[allow(clippy::unnecessary_cast)]
    pub(crate) const fn from_stat_mode(st_mode: libc::mode_t) -> FileType {
        match st_mode & libc::S_IFMT {
            libc::S_IFBLK => BlockDevice,
            libc::S_IFCHR => CharDevice,
            libc::S_IFDIR => Directory,
            libc::S_IFIFO => Fifo,
            libc::S_IFLNK => Symlink,
            libc::S_IFREG => Regular,
            libc::S_IFSOCK => Socket,
            _ => Other,
        }
    }

    pub const fn is_dir(self) -> bool {
        matches!(self, Directory)
    }

    pub const fn is_file(self) -> bool {
        matches!(self, Regular)
    }

    pub const fn is_symlink(self) -> bool {
        matches!(self, Symlink)
    }
}
