//! Which [`FileInfo`](crate::fs::FileInfo) fields and process features this build target supports.
//!
//! The table is fixed at compile time. Targets that are missing from it fail to build, so adding a
//! platform means deciding its capabilities here first.
//!
//! Accessors for unsupported fields stay callable and return zero values; use [`supports`] to tell
//! a real zero apart from a missing field.

use bitflags::bitflags;
use derive_more::{Display, IsVariant};

bitflags! {
    /// A set of [`Capability`] bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const LINKS    = 1 << 0;
        const ATIME    = 1 << 1;
        const BTIME    = 1 << 2;
        const CTIME    = 1 << 3;
        const FSTAT    = 1 << 4;
        const NICE     = 1 << 5;
        const SYMLINKS = 1 << 6;
    }
}

/// A single optional feature.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Hard link counts.
    Links,
    /// Last access time.
    ATime,
    /// Birth (creation) time.
    BTime,
    /// POSIX inode change time.
    CTime,
    /// Metadata from an open handle.
    Fstat,
    /// Process priority adjustment.
    Nice,
    /// Symbolic links.
    Symlinks,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::Links,
        Capability::ATime,
        Capability::BTime,
        Capability::CTime,
        Capability::Fstat,
        Capability::Nice,
        Capability::Symlinks,
    ];

    pub const fn bit(self) -> Capabilities {
        match self {
            Capability::Links => Capabilities::LINKS,
            Capability::ATime => Capabilities::ATIME,
            Capability::BTime => Capabilities::BTIME,
            Capability::CTime => Capabilities::CTIME,
            Capability::Fstat => Capabilities::FSTAT,
            Capability::Nice => Capabilities::NICE,
            Capability::Symlinks => Capabilities::SYMLINKS,
        }
    }
}

/// How numeric owner and group identities are produced.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum IdentityModel {
    /// Native numeric uid/gid.
    Int,
    /// Windows SIDs, translated to POSIX-style integers.
    Sid,
    /// Textual names, hashed to integers.
    String,
    /// No identity information.
    None,
}

#[cfg(unix)]
const POSIX_NO_BTIME: Capabilities = Capabilities::LINKS
    .union(Capabilities::ATIME)
    .union(Capabilities::CTIME)
    .union(Capabilities::NICE)
    .union(Capabilities::SYMLINKS);

#[cfg(all(target_os = "linux", target_env = "gnu"))]
pub const SUPPORTED: Capabilities = Capabilities::all();

// statx is only bound for glibc, so birth time is unavailable on the other Linux environments.
#[cfg(any(all(target_os = "linux", not(target_env = "gnu")), target_os = "android"))]
pub const SUPPORTED: Capabilities = POSIX_NO_BTIME.union(Capabilities::FSTAT);

#[cfg(target_vendor = "apple")]
pub const SUPPORTED: Capabilities = Capabilities::all();

#[cfg(target_os = "freebsd")]
pub const SUPPORTED: Capabilities = POSIX_NO_BTIME.union(Capabilities::BTIME).union(Capabilities::FSTAT);

#[cfg(any(target_os = "netbsd", target_os = "dragonfly"))]
pub const SUPPORTED: Capabilities = POSIX_NO_BTIME.union(Capabilities::FSTAT);

// No fcntl on OpenBSD reports the path of a descriptor.
#[cfg(any(
    target_os = "openbsd",
    target_os = "solaris",
    target_os = "illumos",
    target_os = "aix",
))]
pub const SUPPORTED: Capabilities = POSIX_NO_BTIME;

#[cfg(windows)]
pub const SUPPORTED: Capabilities = Capabilities::LINKS
    .union(Capabilities::ATIME)
    .union(Capabilities::BTIME)
    .union(Capabilities::FSTAT)
    .union(Capabilities::NICE)
    .union(Capabilities::SYMLINKS);

#[cfg(target_os = "wasi")]
pub const SUPPORTED: Capabilities = Capabilities::LINKS
    .union(Capabilities::ATIME)
    .union(Capabilities::CTIME);

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub const SUPPORTED: Capabilities = Capabilities::empty();

#[cfg(unix)]
pub const IDENTITY: IdentityModel = IdentityModel::Int;

#[cfg(windows)]
pub const IDENTITY: IdentityModel = IdentityModel::Sid;

#[cfg(any(target_os = "wasi", all(target_family = "wasm", target_os = "unknown")))]
pub const IDENTITY: IdentityModel = IdentityModel::None;

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_vendor = "apple",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
    target_os = "solaris",
    target_os = "illumos",
    target_os = "aix",
    windows,
    target_os = "wasi",
    all(target_family = "wasm", target_os = "unknown"),
)))]
compile_error!("this target has no entry in the capability table");

/// Whether this build supports `cap`.
pub const fn supports(cap: Capability) -> bool {
    SUPPORTED.contains(cap.bit())
}

/// The identity model for this build.
pub const fn identity() -> IdentityModel {
    IDENTITY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::UNKNOWN_ID;

    #[test]
    fn test_supports_matches_table() {
        for cap in Capability::ALL {
            assert_eq!(supports(cap), SUPPORTED.contains(cap.bit()), "{cap} disagrees with the table");
        }
    }

    #[test]
    fn test_bits_are_distinct() {
        let mut seen = Capabilities::empty();
        for cap in Capability::ALL {
            assert!(!seen.intersects(cap.bit()), "{cap} reuses a bit");
            seen |= cap.bit();
        }
        assert_eq!(seen, Capabilities::all());
    }

    #[test]
    fn test_identity_agrees_with_process_ids() {
        let uid = crate::sys::getuid();
        match identity() {
            IdentityModel::Int | IdentityModel::Sid => assert_ne!(uid.unwrap(), UNKNOWN_ID),
            IdentityModel::String | IdentityModel::None => {
                assert!(uid.is_err() || uid.is_ok_and(|id| id == UNKNOWN_ID));
            },
        }
    }
}
