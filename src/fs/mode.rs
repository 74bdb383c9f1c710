use std::fmt::{self, Debug, Display, Formatter};
use std::ops::{BitAnd, BitOr};

use super::FileType;
use super::file_type::S_IFMT;

/// POSIX-style file mode: type bits plus the permission, setuid, setgid and sticky bits.
///
/// The type bits use the traditional `S_IF*` encoding on every platform, so a mode read on Windows
/// compares equal to the same mode read elsewhere.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Mode(u32);

impl Mode {
    pub const PERM: u32 = 0o777;
    pub const SETUID: u32 = 0o4000;
    pub const SETGID: u32 = 0o2000;
    pub const STICKY: u32 = 0o1000;

    pub const OWNER_READ: u32 = 0o400;
    pub const OWNER_WRITE: u32 = 0o200;
    pub const OWNER_EXEC: u32 = 0o100;

    pub const fn from_bits(bits: u32) -> Mode {
        Mode(bits)
    }

    pub const fn new(file_type: FileType, perm: u32) -> Mode {
        Mode(file_type.mode_bits() | (perm & 0o7777))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// The `rwxrwxrwx` bits.
    pub const fn perm(self) -> u32 {
        self.0 & Self::PERM
    }

    /// Permission bits including setuid, setgid and sticky.
    pub const fn perm_special(self) -> u32 {
        self.0 & 0o7777
    }

    pub const fn file_type(self) -> FileType {
        FileType::from_mode_bits(self.0)
    }

    pub const fn is_dir(self) -> bool {
        self.file_type().is_dir()
    }

    pub const fn is_symlink(self) -> bool {
        self.file_type().is_symlink()
    }

    pub const fn is_regular(self) -> bool {
        self.file_type().is_file()
    }

    /// The same type bits with different permissions.
    pub const fn with_perm(self, perm: u32) -> Mode {
        Mode((self.0 & S_IFMT) | (perm & 0o7777))
    }
}

impl BitAnd<u32> for Mode {
    type Output = u32;

    fn bitand(self, rhs: u32) -> Self::Output {
        self.0 & rhs
    }
}

impl BitOr<u32> for Mode {
    type Output = Mode;

    fn bitor(self, rhs: u32) -> Self::Output {
        Mode(self.0 | rhs)
    }
}

impl Debug for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Mode({:?}, 0o{:04o})", self.file_type(), self.perm_special())
    }
}

/// Formats like `ls -l`, e.g. `drwxr-xr-x`.
impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = match self.file_type() {
            FileType::BlockDevice => 'b',
            FileType::CharDevice => 'c',
            FileType::Directory => 'd',
            FileType::Fifo => 'p',
            FileType::Symlink => 'l',
            FileType::Socket => 's',
            FileType::Regular | FileType::Other => '-',
        };
        write!(f, "{kind}")?;
        for shift in [6, 3, 0] {
            let triplet = (self.0 >> shift) & 0o7;
            write!(
                f,
                "{}{}{}",
                if triplet & 0o4 != 0 { 'r' } else { '-' },
                if triplet & 0o2 != 0 { 'w' } else { '-' },
                if triplet & 0o1 != 0 { 'x' } else { '-' },
            )?;
        }
        Ok(())
    }
}
