//! Symbolic link creation.

use std::path::Path;

use crate::capability::{self, Capability};
use crate::error::{Error, Op, Result};
use crate::options::Options;
use crate::sys;

/// Creates a symbolic link at `link` pointing to `target`.
///
/// With [`Options::set_symlink_owner`], the link itself is then given to the calling user: `lchown`
/// to the real uid/gid on POSIX, the token's user SID on Windows. Fails with
/// [`ErrorKind::Unsupported`](crate::ErrorKind::Unsupported) without [`Capability::Symlinks`].
pub fn symlink<P: AsRef<Path>, Q: AsRef<Path>>(target: P, link: Q, options: &Options) -> Result<()> {
    let (target, link) = (target.as_ref(), link.as_ref());
    if !capability::supports(Capability::Symlinks) {
        Err(Error::unsupported(Op::Symlink, link))?
    }
    if target.as_os_str().is_empty() || link.as_os_str().is_empty() {
        Err(Error::empty_path(Op::Symlink))?
    }
    sys::symlink(target, link)?;
    if options.set_symlink_owner {
        sys::chown_symlink(link)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_symlink_points_at_target() {
        if !capability::supports(Capability::Symlinks) {
            return;
        }
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        fs::write(&target, "content").unwrap();

        let mut options = Options::new();
        options.set_symlink_owner(true);
        match symlink(&target, &link, &options) {
            // Unprivileged Windows accounts may not create links.
            Err(err) if err.kind().is_permission_denied() => return,
            result => result.unwrap(),
        }

        assert_eq!(fs::read_link(&link).unwrap(), target);
        assert_eq!(fs::read_to_string(&link).unwrap(), "content");
    }

    #[test]
    fn test_symlink_existing_link_fails() {
        if !capability::supports(Capability::Symlinks) {
            return;
        }
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("link");
        fs::write(&link, "").unwrap();

        let err = symlink("anything", &link, &Options::new()).unwrap_err();
        assert!(err.kind().is_already_exists(), "{err}");
    }

    #[test]
    fn test_symlink_empty_paths() {
        let expected = if capability::supports(Capability::Symlinks) {
            ErrorKind::Invalid
        } else {
            ErrorKind::Unsupported
        };
        assert_eq!(symlink("", "link", &Options::new()).unwrap_err().kind(), expected);
    }
}
