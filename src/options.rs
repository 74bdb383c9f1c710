use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use bitflags::bitflags;
use derive_more::IsVariant;

use crate::util::fmt::OctalModeOpt;

bitflags! {
    /// Extra flags for opening the destination of a write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpenFlags: u32 {
        /// Append instead of truncating. Ignored by atomic writes.
        const APPEND          = 1 << 0;
        /// Open for synchronous I/O.
        const SYNC            = 1 << 1;
        /// Fail if the destination already exists.
        const EXCL            = 1 << 2;
        /// Remove the file once the writer closes it.
        const DELETE_ON_CLOSE = 1 << 3;
        /// On Windows, don't mark a file created without owner-write permission as read-only.
        const NO_RO_ATTR      = 1 << 4;
    }
}

/// What to do with the Windows read-only attribute of a destination. Other platforms ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IsVariant)]
pub enum ReadOnlyMode {
    /// Leave the attribute as it is.
    #[default]
    Ignore,
    /// Set the attribute once the write has finished.
    Set,
    /// Clear the attribute before writing.
    Reset,
}

/// A builder for the options shared by the write, rename and link operations.
///
/// ```
/// # use fscompat::Options;
/// let mut options = Options::new();
/// options.file_mode(0o600).retry_seconds(2);
/// ```
///
/// When more than one mode option is set, the final permissions of a written file are, in order of
/// precedence: [`file_mode`](Options::file_mode), the existing file's mode with
/// [`keep_file_mode`](Options::keep_file_mode), [`default_file_mode`](Options::default_file_mode)
/// (masked by the umask), and finally whatever the file was created with.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub(crate) file_mode: Option<u32>,
    pub(crate) default_file_mode: Option<u32>,
    pub(crate) keep_file_mode: bool,
    pub(crate) flags: OpenFlags,
    pub(crate) read_only_mode: ReadOnlyMode,
    pub(crate) set_symlink_owner: bool,
    pub(crate) atomically: bool,
    pub(crate) retry: Duration,
}

impl Options {
    pub fn new() -> Options {
        Options::default()
    }

    /// Permissions applied to the written file, verbatim.
    pub const fn file_mode(&mut self, mode: u32) -> &mut Self {
        self.file_mode = Some(mode & 0o7777);
        self
    }

    /// Permissions for a file that doesn't exist yet, subject to the umask.
    pub const fn default_file_mode(&mut self, mode: u32) -> &mut Self {
        self.default_file_mode = Some(mode & 0o7777);
        self
    }

    /// Keep the permissions of the file being replaced.
    pub const fn keep_file_mode(&mut self, value: bool) -> &mut Self {
        self.keep_file_mode = value;
        self
    }

    pub const fn flags(&mut self, flags: OpenFlags) -> &mut Self {
        self.flags = self.flags.union(flags);
        self
    }

    pub const fn read_only_mode(&mut self, mode: ReadOnlyMode) -> &mut Self {
        self.read_only_mode = mode;
        self
    }

    /// Make the calling user the owner of a created symlink, rather than whoever the system picks.
    pub const fn set_symlink_owner(&mut self, value: bool) -> &mut Self {
        self.set_symlink_owner = value;
        self
    }

    /// Route [`write_file`](crate::write::write_file) and
    /// [`write_reader`](crate::write::write_reader) through the atomic writer.
    pub const fn atomically(&mut self, value: bool) -> &mut Self {
        self.atomically = value;
        self
    }

    /// How long a rename may keep retrying errors caused by other processes briefly holding the
    /// file. Zero (the default) disables retries.
    pub const fn retry(&mut self, budget: Duration) -> &mut Self {
        self.retry = budget;
        self
    }

    pub const fn retry_seconds(&mut self, secs: u64) -> &mut Self {
        self.retry = Duration::from_secs(secs);
        self
    }

    pub(crate) const fn has_flag(&self, flag: OpenFlags) -> bool {
        self.flags.contains(flag)
    }
}

impl Debug for Options {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("file_mode", &OctalModeOpt(self.file_mode))
            .field("default_file_mode", &OctalModeOpt(self.default_file_mode))
            .field("keep_file_mode", &self.keep_file_mode)
            .field("flags", &self.flags)
            .field("read_only_mode", &self.read_only_mode)
            .field("set_symlink_owner", &self.set_symlink_owner)
            .field("atomically", &self.atomically)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chains() {
        let mut options = Options::new();
        options
            .file_mode(0o100644)
            .keep_file_mode(true)
            .flags(OpenFlags::SYNC)
            .flags(OpenFlags::NO_RO_ATTR)
            .retry_seconds(3);

        assert_eq!(options.file_mode, Some(0o644));
        assert!(options.keep_file_mode);
        assert!(options.has_flag(OpenFlags::SYNC | OpenFlags::NO_RO_ATTR));
        assert!(!options.has_flag(OpenFlags::EXCL));
        assert_eq!(options.retry, Duration::from_secs(3));
        assert!(options.read_only_mode.is_ignore());
    }

    #[test]
    fn test_debug_prints_octal() {
        let mut options = Options::new();
        options.default_file_mode(0o640);
        let text = format!("{options:?}");
        assert!(text.contains("default_file_mode: Some(0o640)"), "{text}");
        assert!(text.contains("file_mode: None"), "{text}");
    }
}
