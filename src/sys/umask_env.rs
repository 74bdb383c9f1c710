//! A user-space umask for platforms whose kernel has none, seeded from the `UMASK` environment
//! variable.

use std::env;
use std::sync::{Mutex, PoisonError};

pub(crate) const DEFAULT_UMASK: u32 = 0o022;

static UMASK: Mutex<Option<u32>> = Mutex::new(None);

/// Parses an octal umask such as `022`, `0o027` or `77`. Anything else is `None`.
pub(crate) fn parse_umask(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits = value.strip_prefix("0o")
        .or_else(|| value.strip_prefix("0O"))
        .unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| matches!(b, b'0'..=b'7')) {
        return None;
    }
    let mask = u32::from_str_radix(digits, 8).ok()?;
    (mask <= 0o777).then_some(mask)
}

fn initial() -> u32 {
    match env::var("UMASK") {
        Ok(value) => parse_umask(&value).unwrap_or_else(|| {
            tracing::debug!(%value, "ignoring invalid UMASK");
            DEFAULT_UMASK
        }),
        Err(_) => DEFAULT_UMASK,
    }
}

pub(crate) fn umask() -> u32 {
    let mut current = UMASK.lock().unwrap_or_else(PoisonError::into_inner);
    *current.get_or_insert_with(initial)
}

pub(crate) fn set_umask(mask: u32) -> u32 {
    let mut current = UMASK.lock().unwrap_or_else(PoisonError::into_inner);
    let old = *current.get_or_insert_with(initial);
    *current = Some(mask & 0o777);
    old
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("022", Some(0o022))]
    #[case("0o027", Some(0o027))]
    #[case("0O077", Some(0o077))]
    #[case("77", Some(0o077))]
    #[case(" 002 ", Some(0o002))]
    #[case("0", Some(0))]
    #[case("", None)]
    #[case("0o", None)]
    #[case("8", None)]
    #[case("+22", None)]
    #[case("1777", None)]
    #[case("abc", None)]
    fn test_parse_umask(#[case] value: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_umask(value), expected);
    }
}
