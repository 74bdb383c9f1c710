use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use derive_more::{Display, Error};

use crate::fs::UNKNOWN_ID;

/// Id shared by every logon-session SID (`S-1-5-5-X-Y`).
pub const LOGON_SESSION_ID: u64 = 0xFFF;
const BUILTIN_BASE: u64 = 0x20000;
const FOREIGN_DOMAIN_BASE: u64 = 0x30000;
const PRIMARY_DOMAIN_BASE: u64 = 0x40000;
const WELL_KNOWN_BASE: u64 = 0x30000;

const NT_AUTHORITY: u64 = 5;
const LOGON_SESSION_RID: u32 = 5;
const BUILTIN_RID: u32 = 32;
const NON_UNIQUE_RID: u32 = 21;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Error)]
#[display("malformed SID string")]
pub struct SidParseError;

/// A Windows security identifier, e.g. `S-1-5-32-544`.
///
/// This is the decoded form of a SID; it doesn't need Windows to exist, which keeps the identity
/// rules below testable everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sid {
    revision: u8,
    authority: u64,
    sub_authorities: Vec<u32>,
}

impl Sid {
    pub fn new(authority: u64, sub_authorities: &[u32]) -> Sid {
        Sid {
            revision: 1,
            authority,
            sub_authorities: sub_authorities.to_vec(),
        }
    }

    /// Decodes the binary `SID` layout: revision, sub-authority count, a 48-bit big-endian
    /// authority, then little-endian sub-authorities. `None` if `bytes` is too short.
    pub fn from_bytes(bytes: &[u8]) -> Option<Sid> {
        let (&revision, rest) = bytes.split_first()?;
        let (&count, rest) = rest.split_first()?;
        let authority = rest.get(..6)?
            .iter()
            .fold(0_u64, |acc, b| acc << 8 | *b as u64);
        let sub_authorities = rest.get(6..6 + 4 * count as usize)?
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Some(Sid { revision, authority, sub_authorities })
    }

    /// The binary form read by [`Sid::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        out.push(self.revision);
        out.push(self.sub_authorities.len() as u8);
        out.extend_from_slice(&self.authority.to_be_bytes()[2..]);
        for sub in &self.sub_authorities {
            out.extend_from_slice(&sub.to_le_bytes());
        }
        out
    }

    pub fn byte_len(&self) -> usize {
        8 + 4 * self.sub_authorities.len()
    }

    /// `S-1-1-0`, Everyone.
    pub fn everyone() -> Sid {
        Sid::new(1, &[0])
    }

    /// `S-1-3-2`, stands in for the file's owner in an ACE.
    pub fn creator_owner_proxy() -> Sid {
        Sid::new(3, &[2])
    }

    /// `S-1-3-3`, stands in for the file's group in an ACE.
    pub fn creator_group_proxy() -> Sid {
        Sid::new(3, &[3])
    }

    /// `S-1-5-18`, the local SYSTEM account.
    pub fn local_system() -> Sid {
        Sid::new(NT_AUTHORITY, &[18])
    }

    /// `S-1-5-32-544`, the built-in Administrators group.
    pub fn administrators() -> Sid {
        Sid::new(NT_AUTHORITY, &[BUILTIN_RID, 544])
    }

    pub const fn revision(&self) -> u8 {
        self.revision
    }

    pub const fn authority(&self) -> u64 {
        self.authority
    }

    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }

    /// The relative identifier: the last sub-authority.
    pub fn rid(&self) -> Option<u32> {
        self.sub_authorities.last().copied()
    }

    /// The SID with its RID removed, i.e. the issuing domain.
    pub fn domain(&self) -> Option<Sid> {
        let (_, rest) = self.sub_authorities.split_last()?;
        Some(Sid {
            revision: self.revision,
            authority: self.authority,
            sub_authorities: rest.to_vec(),
        })
    }

    /// Whether this is an `S-1-5-21-A-B-C-RID` account SID issued by `domain`.
    pub fn is_in_domain(&self, domain: &Sid) -> bool {
        self.authority == domain.authority
            && self.sub_authorities.len() == domain.sub_authorities.len() + 1
            && self.sub_authorities.starts_with(&domain.sub_authorities)
    }
}

impl FromStr for Sid {
    type Err = SidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        if !parts.next().is_some_and(|p| p.eq_ignore_ascii_case("S")) {
            Err(SidParseError)?
        }
        let revision = parts.next().and_then(|p| p.parse::<u8>().ok()).ok_or(SidParseError)?;
        let authority = match parts.next() {
            Some(p) if p.starts_with("0x") || p.starts_with("0X") => {
                u64::from_str_radix(&p[2..], 16).map_err(|_| SidParseError)?
            },
            Some(p) => p.parse::<u64>().map_err(|_| SidParseError)?,
            None => Err(SidParseError)?,
        };
        if authority >= 1 << 48 {
            Err(SidParseError)?
        }
        let sub_authorities = parts
            .map(|p| p.parse::<u32>().map_err(|_| SidParseError))
            .collect::<Result<Vec<_>, _>>()?;
        if sub_authorities.len() > 15 {
            Err(SidParseError)?
        }
        Ok(Sid { revision, authority, sub_authorities })
    }
}

impl Display for Sid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}-", self.revision)?;
        if self.authority >= 1 << 32 {
            write!(f, "0x{:012X}", self.authority)?;
        } else {
            write!(f, "{}", self.authority)?;
        }
        for sub in &self.sub_authorities {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

/// Maps a SID to a stable POSIX-style id, matching what Cygwin-based tools report.
///
/// | SID                             | id                   |
/// |---------------------------------|----------------------|
/// | `S-1-5-5-*` (logon session)     | `0xFFF`              |
/// | `S-1-5-32-RID` (built-in group) | `0x20000 + RID`      |
/// | `S-1-5-21-*-RID`, primary domain| `0x40000 + RID`      |
/// | `S-1-5-21-*-RID`, other domain  | `0x30000 + RID`      |
/// | `S-1-A-R` (well-known)          | `0x30000 \| A << 9 \| (R + 1)` |
///
/// Anything else is [`UNKNOWN_ID`].
pub fn posix_id(sid: &Sid, primary_domain: Option<&Sid>) -> u64 {
    let subs = sid.sub_authorities();
    match (sid.authority(), subs) {
        (NT_AUTHORITY, [LOGON_SESSION_RID, ..]) if subs.len() > 1 => LOGON_SESSION_ID,
        (NT_AUTHORITY, [BUILTIN_RID, rid]) => BUILTIN_BASE + *rid as u64,
        (NT_AUTHORITY, [NON_UNIQUE_RID, .., rid]) if subs.len() >= 5 => {
            if primary_domain.is_some_and(|domain| sid.is_in_domain(domain)) {
                PRIMARY_DOMAIN_BASE + *rid as u64
            } else {
                FOREIGN_DOMAIN_BASE + *rid as u64
            }
        },
        (authority, [rid]) if authority < 0x80 && *rid < 0x1FF => {
            WELL_KNOWN_BASE | authority << 9 | (*rid as u64 + 1)
        },
        _ => UNKNOWN_ID,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn sid(s: &str) -> Sid {
        s.parse().unwrap()
    }

    #[rstest]
    #[case("S-1-1-0")]
    #[case("S-1-5-32-544")]
    #[case("S-1-5-21-3623811015-3361044348-30300820-1013")]
    #[case("S-1-0x123456789ABC-7")]
    fn test_parse_display(#[case] text: &str) {
        assert_eq!(sid(text).to_string(), text);
    }

    #[rstest]
    #[case("")]
    #[case("S")]
    #[case("X-1-5")]
    #[case("S-1-5-x")]
    #[case("S-1-0x1000000000000-1")]
    #[case("S-1-5-1-2-3-4-5-6-7-8-9-10-11-12-13-14-15-16")]
    fn test_parse_rejects(#[case] text: &str) {
        assert_eq!(text.parse::<Sid>(), Err(SidParseError));
    }

    #[test]
    fn test_well_known_ids() {
        assert_eq!(posix_id(&Sid::everyone(), None), 0x30201);
        assert_eq!(posix_id(&sid("S-1-5-5-0-12345"), None), LOGON_SESSION_ID);
        assert_eq!(posix_id(&Sid::administrators(), None), 0x20000 + 544);
        assert_eq!(posix_id(&sid("S-1-5-32-545"), None), 0x20221);
    }

    #[test]
    fn test_domain_ids() {
        let machine = sid("S-1-5-21-1-2-3");
        let local_user = sid("S-1-5-21-1-2-3-1001");
        let foreign_user = sid("S-1-5-21-9-9-9-1001");

        assert_eq!(posix_id(&local_user, Some(&machine)), 0x40000 + 1001);
        assert_eq!(posix_id(&foreign_user, Some(&machine)), 0x30000 + 1001);
        // Without a known primary domain, every domain is foreign.
        assert_eq!(posix_id(&local_user, None), 0x30000 + 1001);
    }

    #[test]
    fn test_unknown_id() {
        assert_eq!(posix_id(&sid("S-1-5-80-1-2-3-4-5"), None), UNKNOWN_ID);
        assert_eq!(posix_id(&sid("S-1-16-12288-1"), None), UNKNOWN_ID);
    }

    #[test]
    fn test_binary_form() {
        let admins = Sid::administrators();
        let bytes = admins.to_bytes();
        assert_eq!(bytes, [1, 2, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0, 0x20, 0x02, 0, 0]);
        assert_eq!(bytes.len(), admins.byte_len());
        assert_eq!(Sid::from_bytes(&bytes), Some(admins));
        assert_eq!(Sid::from_bytes(&bytes[..12]), None);
    }

    #[test]
    fn test_domain_membership() {
        let user = sid("S-1-5-21-1-2-3-500");
        assert_eq!(user.domain(), Some(sid("S-1-5-21-1-2-3")));
        assert_eq!(user.rid(), Some(500));
        assert!(user.is_in_domain(&sid("S-1-5-21-1-2-3")));
        assert!(!user.is_in_domain(&sid("S-1-5-21-1-2")));
    }
}
