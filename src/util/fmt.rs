use std::fmt::{self, Debug, Formatter};

/// Debug-formats a permission value in octal, the way it is written in a shell.
pub(crate) struct OctalMode(pub u32);

impl Debug for OctalMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0o{:03o}", self.0)
    }
}

/// [`OctalMode`] for an optional value.
pub(crate) struct OctalModeOpt(pub Option<u32>);

impl Debug for OctalModeOpt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(mode) => f.debug_tuple("Some").field(&OctalMode(mode)).finish(),
            None => f.write_str("None"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octal_mode() {
        assert_eq!(format!("{:?}", OctalMode(0o644)), "0o644");
        assert_eq!(format!("{:?}", OctalMode(0o7)), "0o007");
        assert_eq!(format!("{:?}", OctalModeOpt(Some(0o4755))), "Some(0o4755)");
        assert_eq!(format!("{:?}", OctalModeOpt(None)), "None");
    }
}
