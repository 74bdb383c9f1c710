//! Process identity and the file creation mask.

use crate::error::Result;
use crate::sys;

/// Whether the process runs with superuser privileges: effective uid 0 on POSIX, an elevated token
/// on Windows.
pub fn is_root() -> Result<bool> {
    sys::is_root()
}

/// Whether the process has administrative rights. The same as [`is_root`] on POSIX; on Windows,
/// whether the token is elevated.
pub fn is_admin() -> Result<bool> {
    sys::is_admin()
}

/// The real user id. On Windows, the POSIX translation of the process token's user SID.
pub fn getuid() -> Result<u64> {
    sys::getuid()
}

/// The real group id. On Windows, the POSIX translation of the token's primary group SID.
pub fn getgid() -> Result<u64> {
    sys::getgid()
}

/// The permission bits removed from the default mode of files this crate creates.
///
/// On POSIX this mirrors the kernel's umask. On Windows and WASI it is kept by this crate, starting
/// from the octal `UMASK` environment variable (`022` if unset or invalid).
pub fn umask() -> u32 {
    sys::umask()
}

/// Replaces the umask and returns the previous one.
pub fn set_umask(mask: u32) -> u32 {
    sys::set_umask(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{self, IdentityModel};
    use crate::fs::UNKNOWN_ID;

    #[test]
    fn test_umask_round_trip() {
        let original = umask();
        assert!(original <= 0o777);
        assert_eq!(set_umask(original), original);
        assert_eq!(umask(), original);
    }

    #[test]
    fn test_root_implies_admin() {
        if is_root().unwrap() {
            assert!(is_admin().unwrap());
        }
    }

    #[test]
    fn test_ids_follow_identity_model() {
        match capability::identity() {
            IdentityModel::Int | IdentityModel::Sid => {
                assert_ne!(getuid().unwrap(), UNKNOWN_ID);
                assert_ne!(getgid().unwrap(), UNKNOWN_ID);
            },
            IdentityModel::String | IdentityModel::None => {},
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_root_is_uid_zero() {
        // SAFETY: geteuid can't fail.
        let euid = unsafe { libc::geteuid() };
        assert_eq!(is_root().unwrap(), euid == 0);
    }
}
