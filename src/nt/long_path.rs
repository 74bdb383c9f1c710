//! Promotion of long Win32 paths to the `\\?\` namespace.
//!
//! Win32 calls reject paths longer than `MAX_PATH` unless they are written in the extended-length
//! form, which also switches off the usual normalization. Promotion therefore resolves the path
//! against the working directory and removes `.`/`..` components before adding the prefix.

use std::ffi::{OsStr, OsString};

/// Longest path (in bytes) left untouched. Directory APIs reserve 12 characters of `MAX_PATH` for
/// an 8.3 file name, leaving 248 with the terminator.
pub const MAX_SHORT_PATH: usize = 247;

const VERBATIM: &[u8] = br"\\?\";
const NT_OBJECT: &[u8] = br"\??\";
const DEVICE: &[u8] = br"\\.\";
const VERBATIM_UNC: &[u8] = br"\\?\UNC\";

fn is_sep(b: u8) -> bool {
    b == b'\\' || b == b'/'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// `C:\dir`
    DriveAbsolute,
    /// `C:dir`
    DriveRelative,
    /// `\\server\share\dir`
    Unc,
    /// `\dir`
    Rooted,
    /// `dir`
    Relative,
}

fn kind(path: &[u8]) -> Kind {
    match path {
        [a, b, ..] if is_sep(*a) && is_sep(*b) => Kind::Unc,
        [a, ..] if is_sep(*a) => Kind::Rooted,
        [d, b':', s, ..] if d.is_ascii_alphabetic() && is_sep(*s) => Kind::DriveAbsolute,
        [d, b':', ..] if d.is_ascii_alphabetic() => Kind::DriveRelative,
        _ => Kind::Relative,
    }
}

/// Whether `path` already names something outside the Win32 namespace and must not be rewritten.
pub fn is_verbatim(path: &OsStr) -> bool {
    let bytes = path.as_encoded_bytes();
    [VERBATIM, NT_OBJECT, DEVICE].iter().any(|prefix| bytes.starts_with(prefix))
}

/// Returns the `\\?\` form of `path` if it (resolved against `cwd` when relative) is longer than
/// [`MAX_SHORT_PATH`], or `None` when the path can be used as it is.
///
/// UNC paths become `\\?\UNC\server\share\…`. Paths that are already verbatim, device paths and
/// drive-relative paths (`C:dir`) are never promoted.
pub fn promote(path: &OsStr, cwd: &OsStr) -> Option<OsString> {
    if is_verbatim(path) {
        return None;
    }
    let bytes = path.as_encoded_bytes();
    let cwd = cwd.as_encoded_bytes();

    let full: Vec<u8> = match kind(bytes) {
        Kind::DriveAbsolute | Kind::Unc => bytes.to_vec(),
        Kind::DriveRelative => return None,
        Kind::Rooted => {
            let root = root_of(cwd)?;
            [root, bytes].concat()
        },
        Kind::Relative => {
            if !matches!(kind(cwd), Kind::DriveAbsolute | Kind::Unc) {
                return None;
            }
            let mut full = cwd.to_vec();
            if !full.last().copied().is_some_and(is_sep) {
                full.push(b'\\');
            }
            full.extend_from_slice(bytes);
            full
        },
    };
    if full.len() <= MAX_SHORT_PATH {
        return None;
    }

    let promoted = normalize(&full)?;
    tracing::trace!(?path, "promoting long path");
    // SAFETY: `normalize` only splits the input at ASCII separators and joins the pieces with ASCII
    // bytes, so every non-ASCII sequence from the valid `OsStr` inputs is carried over intact.
    Some(unsafe { OsString::from_encoded_bytes_unchecked(promoted) })
}

/// `C:` for a drive path, `\\server\share` for a UNC path.
fn root_of(path: &[u8]) -> Option<&[u8]> {
    match kind(path) {
        Kind::DriveAbsolute => Some(&path[..2]),
        Kind::Unc => {
            let (server, share) = unc_parts(path)?;
            Some(&path[..2 + server.len() + 1 + share.len()])
        },
        _ => None,
    }
}

fn unc_parts(path: &[u8]) -> Option<(&[u8], &[u8])> {
    let mut parts = path[2..].split(|b| is_sep(*b));
    let server = parts.next().filter(|s| !s.is_empty())?;
    let share = parts.next().filter(|s| !s.is_empty())?;
    Some((server, share))
}

fn normalize(full: &[u8]) -> Option<Vec<u8>> {
    let (mut out, rest) = match kind(full) {
        Kind::DriveAbsolute => {
            let mut out = VERBATIM.to_vec();
            out.extend_from_slice(&full[..2]);
            (out, &full[2..])
        },
        Kind::Unc => {
            let (server, share) = unc_parts(full)?;
            let mut out = VERBATIM_UNC.to_vec();
            out.extend_from_slice(server);
            out.push(b'\\');
            out.extend_from_slice(share);
            (out, &full[2 + server.len() + 1 + share.len()..])
        },
        _ => return None,
    };

    let mut components: Vec<&[u8]> = Vec::new();
    for component in rest.split(|b| is_sep(*b)) {
        match component {
            b"" | b"." => {},
            b".." => {
                components.pop();
            },
            other => components.push(other),
        }
    }
    if components.is_empty() {
        out.push(b'\\');
    }
    for component in components {
        out.push(b'\\');
        out.extend_from_slice(component);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn long_name(len: usize) -> String {
        "a".repeat(len)
    }

    fn promote_str(path: &str, cwd: &str) -> Option<String> {
        promote(OsStr::new(path), OsStr::new(cwd)).map(|p| p.into_string().unwrap())
    }

    #[test]
    fn test_short_paths_untouched() {
        assert_eq!(promote_str(r"C:\short\file.txt", r"C:\"), None);
        assert_eq!(promote_str("file.txt", r"C:\work"), None);
    }

    #[test]
    fn test_boundary() {
        let at_limit = format!(r"C:\{}", long_name(MAX_SHORT_PATH - 3));
        assert_eq!(at_limit.len(), MAX_SHORT_PATH);
        assert_eq!(promote_str(&at_limit, r"C:\"), None);

        let over = format!(r"C:\{}", long_name(MAX_SHORT_PATH - 2));
        assert_eq!(promote_str(&over, r"C:\"), Some(format!(r"\\?\{over}")));
    }

    #[test]
    fn test_relative_joins_cwd() {
        let dir = long_name(200);
        let cwd = format!(r"C:\{dir}");
        let path = format!(r"sub\.\{}\..\file.txt", long_name(60));
        assert_eq!(
            promote_str(&path, &cwd),
            Some(format!(r"\\?\C:\{dir}\sub\file.txt")),
        );
    }

    #[test]
    fn test_rooted_takes_cwd_drive() {
        let path = format!(r"\{}", long_name(260));
        assert_eq!(promote_str(&path, r"D:\work"), Some(format!(r"\\?\D:{path}")));
    }

    #[test]
    fn test_unc() {
        let path = format!(r"\\server\share\{}\f", long_name(250));
        assert_eq!(
            promote_str(&path, r"C:\"),
            Some(format!(r"\\?\UNC\server\share\{}\f", long_name(250))),
        );
    }

    #[test]
    fn test_forward_slashes() {
        let path = format!("C:/{}/f", long_name(250));
        assert_eq!(promote_str(&path, r"C:\"), Some(format!(r"\\?\C:\{}\f", long_name(250))));
    }

    #[rstest]
    #[case(r"\\?\C:\")]
    #[case(r"\??\C:\")]
    #[case(r"\\.\PhysicalDrive0\")]
    fn test_verbatim_never_promoted(#[case] prefix: &str) {
        let path = format!("{prefix}{}", long_name(300));
        assert!(is_verbatim(OsStr::new(&path)));
        assert_eq!(promote_str(&path, r"C:\"), None);
    }

    #[test]
    fn test_drive_relative_untouched() {
        let path = format!("C:{}", long_name(300));
        assert_eq!(promote_str(&path, r"C:\"), None);
    }
}
