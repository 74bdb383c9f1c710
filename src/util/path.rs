use std::ffi::{OsStr, OsString};
use std::path::{self, Path, PathBuf};

const fn is_separator(byte: u8) -> bool {
    byte == b'/' || (cfg!(windows) && byte == b'\\')
}

/// The last element of `path` as written, ignoring trailing separators: `..` and `.` are kept
/// rather than resolved. A path of only separators is the separator; an empty path is `.`.
pub(crate) fn base_name(path: &Path) -> OsString {
    let mut bytes = path.as_os_str().as_encoded_bytes();
    if cfg!(windows) && bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        bytes = &bytes[2..];
    }
    if bytes.is_empty() {
        return OsString::from(".");
    }
    let Some(end) = bytes.iter().rposition(|&b| !is_separator(b)) else {
        return OsString::from(path::MAIN_SEPARATOR_STR);
    };
    let start = bytes[..end].iter().rposition(|&b| is_separator(b)).map_or(0, |i| i + 1);
    // SAFETY: the slice was cut next to ASCII separators or a drive prefix of the original
    // encoded bytes.
    unsafe { OsStr::from_encoded_bytes_unchecked(&bytes[start..=end]) }.to_owned()
}

/// The directory containing `path`. A bare file name lives in `.`.
pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("dir/file.txt", "file.txt")]
    #[case("file.txt", "file.txt")]
    #[case("dir/sub/", "sub")]
    #[case("/", std::path::MAIN_SEPARATOR_STR)]
    #[case("", ".")]
    #[case("/tmp/..", "..")]
    #[case("a/.", ".")]
    #[case("..", "..")]
    #[case("dir//name//", "name")]
    fn test_base_name(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(base_name(Path::new(path)), OsString::from(expected));
    }

    #[rstest]
    #[case("dir/file.txt", "dir")]
    #[case("file.txt", ".")]
    #[case("/file.txt", "/")]
    fn test_parent_dir(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(parent_dir(Path::new(path)), PathBuf::from(expected));
    }
}
