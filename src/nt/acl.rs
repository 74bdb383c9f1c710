//! Translation between Windows discretionary ACLs and POSIX permission triplets.
//!
//! Only access-allowed entries contribute to a mode. Deny entries, inherit-only entries and the
//! SYSTEM/Administrators entries Windows adds to almost everything are skipped, so a file written
//! with [`aces_from_mode`] reads back with the same permission bits.

use super::Sid;

pub const FILE_READ_DATA: u32 = 0x0001;
pub const FILE_WRITE_DATA: u32 = 0x0002;
pub const FILE_APPEND_DATA: u32 = 0x0004;
pub const FILE_READ_EA: u32 = 0x0008;
pub const FILE_WRITE_EA: u32 = 0x0010;
pub const FILE_EXECUTE: u32 = 0x0020;
pub const FILE_DELETE_CHILD: u32 = 0x0040;
pub const FILE_READ_ATTRIBUTES: u32 = 0x0080;
pub const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
pub const DELETE: u32 = 0x0001_0000;
pub const READ_CONTROL: u32 = 0x0002_0000;
pub const WRITE_DAC: u32 = 0x0004_0000;
pub const WRITE_OWNER: u32 = 0x0008_0000;
pub const SYNCHRONIZE: u32 = 0x0010_0000;
pub const GENERIC_ALL: u32 = 0x1000_0000;
pub const GENERIC_EXECUTE: u32 = 0x2000_0000;
pub const GENERIC_WRITE: u32 = 0x4000_0000;
pub const GENERIC_READ: u32 = 0x8000_0000;

pub const FILE_ALL_ACCESS: u32 = 0x001F_01FF;

/// The rights that together mean "read".
pub const READ: u32 = FILE_READ_DATA | FILE_READ_ATTRIBUTES;
/// The rights that together mean "write".
pub const WRITE: u32 = FILE_WRITE_DATA | FILE_APPEND_DATA | FILE_WRITE_ATTRIBUTES | FILE_WRITE_EA;
/// The rights that together mean "execute".
pub const EXECUTE: u32 = FILE_READ_DATA | FILE_EXECUTE;

/// Rights every generated entry carries so the trustee can still inspect the file.
const BASELINE: u32 = READ_CONTROL | SYNCHRONIZE | FILE_READ_EA;

/// `INHERIT_ONLY_ACE`: the entry applies to children only.
pub const INHERIT_ONLY: u8 = 0x08;

pub const ACL_REVISION: u8 = 2;

const ACL_HEADER_LEN: usize = 8;
const ACE_HEADER_LEN: usize = 8;
const ACCESS_ALLOWED_ACE_TYPE: u8 = 0;
const ACCESS_DENIED_ACE_TYPE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AceKind {
    Allow,
    Deny,
}

/// One access control entry, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ace {
    pub kind: AceKind,
    pub flags: u8,
    pub mask: u32,
    pub trustee: Sid,
}

impl Ace {
    pub fn allow(trustee: Sid, mask: u32) -> Ace {
        Ace {
            kind: AceKind::Allow,
            flags: 0,
            mask,
            trustee,
        }
    }
}

/// Expands `GENERIC_*` bits into the file rights they stand for.
pub const fn expand_generic(mask: u32) -> u32 {
    let mut out = mask & !(GENERIC_ALL | GENERIC_EXECUTE | GENERIC_WRITE | GENERIC_READ);
    if mask & GENERIC_ALL != 0 {
        out |= FILE_ALL_ACCESS;
    }
    if mask & GENERIC_READ != 0 {
        out |= READ | FILE_READ_EA | READ_CONTROL | SYNCHRONIZE;
    }
    if mask & GENERIC_WRITE != 0 {
        out |= WRITE | READ_CONTROL | SYNCHRONIZE;
    }
    if mask & GENERIC_EXECUTE != 0 {
        out |= FILE_EXECUTE | FILE_READ_ATTRIBUTES | READ_CONTROL | SYNCHRONIZE;
    }
    out
}

/// Reduces an access mask to an `rwx` value in `0..=7`. A bit is set only when every right it
/// stands for is granted.
pub const fn rwx_from_mask(mask: u32) -> u32 {
    let mask = expand_generic(mask);
    let mut rwx = 0;
    if mask & READ == READ {
        rwx |= 0o4;
    }
    if mask & WRITE == WRITE {
        rwx |= 0o2;
    }
    if mask & EXECUTE == EXECUTE {
        rwx |= 0o1;
    }
    rwx
}

/// The access mask granted for an `rwx` value.
pub const fn mask_from_rwx(rwx: u32, is_owner: bool) -> u32 {
    let mut mask = BASELINE;
    if rwx & 0o4 != 0 {
        mask |= READ;
    }
    if rwx & 0o2 != 0 {
        mask |= WRITE;
        if is_owner {
            mask |= DELETE;
        }
    }
    if rwx & 0o1 != 0 {
        mask |= EXECUTE;
    }
    mask
}

/// Whether `sid` is SYSTEM or Administrators. Their entries never contribute to a mode.
fn is_privileged(sid: &Sid) -> bool {
    *sid == Sid::local_system() || *sid == Sid::administrators()
}

/// Derives the `0o777` permission bits described by `aces` for a file owned by `owner`/`group`.
///
/// SYSTEM and Administrators entries are skipped even when one of them owns the file; an
/// elevated-owned file only gets owner bits from the `CREATOR OWNER` proxy.
pub fn mode_from_aces(aces: &[Ace], owner: &Sid, group: &Sid) -> u32 {
    let owner_proxy = Sid::creator_owner_proxy();
    let group_proxy = Sid::creator_group_proxy();
    let everyone = Sid::everyone();

    let mut mode = 0;
    for ace in aces {
        if ace.kind != AceKind::Allow || ace.flags & INHERIT_ONLY != 0 || is_privileged(&ace.trustee) {
            continue;
        }
        let rwx = rwx_from_mask(ace.mask);
        let trustee = &ace.trustee;
        let mut matched = false;
        if trustee == owner || *trustee == owner_proxy {
            mode |= rwx << 6;
            matched = true;
        }
        if trustee == group || *trustee == group_proxy {
            mode |= rwx << 3;
            matched = true;
        }
        if !matched && *trustee == everyone {
            mode |= rwx;
        }
    }
    mode
}

/// Builds the allow entries that [`mode_from_aces`] maps back to `mode`, followed by full control
/// for SYSTEM and Administrators.
///
/// A triplet whose trustee is SYSTEM or Administrators is written against the matching creator
/// proxy instead.
pub fn aces_from_mode(mode: u32, owner: &Sid, group: &Sid) -> Vec<Ace> {
    let mut aces = Vec::with_capacity(5);
    let triplets = [
        (owner, Sid::creator_owner_proxy(), (mode >> 6) & 0o7, true),
        (group, Sid::creator_group_proxy(), (mode >> 3) & 0o7, false),
    ];
    for (trustee, proxy, rwx, is_owner) in triplets {
        if rwx != 0 {
            let trustee = if is_privileged(trustee) { proxy } else { trustee.clone() };
            aces.push(Ace::allow(trustee, mask_from_rwx(rwx, is_owner)));
        }
    }
    if mode & 0o7 != 0 {
        aces.push(Ace::allow(Sid::everyone(), mask_from_rwx(mode & 0o7, false)));
    }
    aces.push(Ace::allow(Sid::local_system(), FILE_ALL_ACCESS));
    aces.push(Ace::allow(Sid::administrators(), FILE_ALL_ACCESS));
    aces
}

/// Decodes a binary `ACL`. Entries other than plain allow and deny (object and callback entries)
/// are skipped. `None` if the buffer is shorter than its headers claim.
pub fn decode_acl(bytes: &[u8]) -> Option<Vec<Ace>> {
    let header = bytes.get(..ACL_HEADER_LEN)?;
    let size = u16::from_le_bytes([header[2], header[3]]) as usize;
    let count = u16::from_le_bytes([header[4], header[5]]);
    let body = bytes.get(..size)?;

    let mut aces = Vec::with_capacity(count as usize);
    let mut offset = ACL_HEADER_LEN;
    for _ in 0..count {
        let head = body.get(offset..offset + 4)?;
        let ace_len = u16::from_le_bytes([head[2], head[3]]) as usize;
        let entry = body.get(offset..offset + ace_len)?;
        offset += ace_len;

        let kind = match head[0] {
            ACCESS_ALLOWED_ACE_TYPE => AceKind::Allow,
            ACCESS_DENIED_ACE_TYPE => AceKind::Deny,
            _ => continue,
        };
        let mask = entry.get(4..ACE_HEADER_LEN)?;
        aces.push(Ace {
            kind,
            flags: head[1],
            mask: u32::from_le_bytes([mask[0], mask[1], mask[2], mask[3]]),
            trustee: Sid::from_bytes(&entry[ACE_HEADER_LEN..])?,
        });
    }
    Some(aces)
}

/// Encodes `aces` as a binary `ACL`, in order.
pub fn encode_acl(aces: &[Ace]) -> Vec<u8> {
    let size = ACL_HEADER_LEN + aces.iter()
        .map(|ace| ACE_HEADER_LEN + ace.trustee.byte_len())
        .sum::<usize>();

    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&[ACL_REVISION, 0]);
    out.extend_from_slice(&(size as u16).to_le_bytes());
    out.extend_from_slice(&(aces.len() as u16).to_le_bytes());
    out.extend_from_slice(&[0, 0]);
    for ace in aces {
        let ace_type = match ace.kind {
            AceKind::Allow => ACCESS_ALLOWED_ACE_TYPE,
            AceKind::Deny => ACCESS_DENIED_ACE_TYPE,
        };
        let ace_len = (ACE_HEADER_LEN + ace.trustee.byte_len()) as u16;
        out.extend_from_slice(&[ace_type, ace.flags]);
        out.extend_from_slice(&ace_len.to_le_bytes());
        out.extend_from_slice(&ace.mask.to_le_bytes());
        out.extend_from_slice(&ace.trustee.to_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn owner() -> Sid {
        "S-1-5-21-1-2-3-1001".parse().unwrap()
    }

    fn group() -> Sid {
        "S-1-5-21-1-2-3-513".parse().unwrap()
    }

    #[rstest]
    #[case(READ, 0o4)]
    #[case(WRITE, 0o2)]
    #[case(EXECUTE, 0o1)]
    #[case(FILE_READ_DATA, 0)]
    #[case(READ | FILE_EXECUTE, 0o5)]
    #[case(FILE_ALL_ACCESS, 0o7)]
    #[case(GENERIC_ALL, 0o7)]
    #[case(GENERIC_READ | GENERIC_EXECUTE, 0o5)]
    #[case(GENERIC_WRITE, 0o2)]
    fn test_rwx_from_mask(#[case] mask: u32, #[case] rwx: u32) {
        assert_eq!(rwx_from_mask(mask), rwx);
    }

    #[rstest]
    #[case(0o764)]
    #[case(0o644)]
    #[case(0o600)]
    #[case(0o755)]
    #[case(0o000)]
    #[case(0o007)]
    fn test_mode_round_trips(#[case] mode: u32) {
        let aces = aces_from_mode(mode, &owner(), &group());
        assert_eq!(mode_from_aces(&aces, &owner(), &group()), mode);
    }

    #[test]
    fn test_0o764_entries() {
        let aces = aces_from_mode(0o764, &owner(), &group());
        let rights = |sid: &Sid| {
            aces.iter().find(|ace| ace.trustee == *sid).map(|ace| rwx_from_mask(ace.mask))
        };
        assert_eq!(rights(&owner()), Some(0o7));
        assert_eq!(rights(&group()), Some(0o6));
        assert_eq!(rights(&Sid::everyone()), Some(0o4));
        assert_eq!(rights(&Sid::local_system()), Some(0o7));
        assert_eq!(rights(&Sid::administrators()), Some(0o7));
    }

    #[test]
    fn test_skips_deny_and_inherit_only() {
        let mut inherited = Ace::allow(owner(), FILE_ALL_ACCESS);
        inherited.flags = INHERIT_ONLY;
        let denied = Ace {
            kind: AceKind::Deny,
            flags: 0,
            mask: FILE_ALL_ACCESS,
            trustee: group(),
        };
        let aces = [inherited, denied, Ace::allow(Sid::everyone(), READ)];
        assert_eq!(mode_from_aces(&aces, &owner(), &group()), 0o004);
    }

    #[test]
    fn test_proxies_and_admins() {
        let aces = [
            Ace::allow(Sid::creator_owner_proxy(), READ | WRITE),
            Ace::allow(Sid::creator_group_proxy(), READ),
            Ace::allow(Sid::local_system(), FILE_ALL_ACCESS),
            Ace::allow(Sid::administrators(), FILE_ALL_ACCESS),
        ];
        assert_eq!(mode_from_aces(&aces, &owner(), &group()), 0o640);
    }

    #[rstest]
    #[case::administrators_owner(Sid::administrators(), group())]
    #[case::system_owner(Sid::local_system(), group())]
    #[case::administrators_group(owner(), Sid::administrators())]
    fn test_privileged_entries_give_no_bits(#[case] file_owner: Sid, #[case] file_group: Sid) {
        let aces = [
            Ace::allow(Sid::administrators(), FILE_ALL_ACCESS),
            Ace::allow(Sid::local_system(), FILE_ALL_ACCESS),
        ];
        assert_eq!(mode_from_aces(&aces, &file_owner, &file_group), 0);
    }

    #[rstest]
    #[case(0o764)]
    #[case(0o640)]
    #[case(0o000)]
    fn test_mode_round_trips_for_administrators_owner(#[case] mode: u32) {
        let admins = Sid::administrators();
        let aces = aces_from_mode(mode, &admins, &group());
        assert_eq!(mode_from_aces(&aces, &admins, &group()), mode);
        if mode & 0o700 != 0 {
            assert!(aces.iter().any(|ace| ace.trustee == Sid::creator_owner_proxy()));
        }
    }

    #[test]
    fn test_binary_acl() {
        let aces = aces_from_mode(0o640, &owner(), &group());
        let bytes = encode_acl(&aces);
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]) as usize, bytes.len());
        assert_eq!(decode_acl(&bytes), Some(aces));
        assert_eq!(decode_acl(&bytes[..bytes.len() - 1]), None);
    }

    #[test]
    fn test_decode_skips_object_entries() {
        // Everyone: read, preceded by an object entry (type 5) that only carries a header.
        let mut bytes = vec![ACL_REVISION, 0, 0, 0, 2, 0, 0, 0];
        bytes.extend_from_slice(&[5, 0, 8, 0, 0xff, 0xff, 0xff, 0xff]);
        bytes.extend_from_slice(&[0, 0, 20, 0]);
        bytes.extend_from_slice(&READ.to_le_bytes());
        bytes.extend_from_slice(&Sid::everyone().to_bytes());
        let size = bytes.len() as u16;
        bytes[2..4].copy_from_slice(&size.to_le_bytes());

        let aces = decode_acl(&bytes).unwrap();
        assert_eq!(aces, [Ace::allow(Sid::everyone(), READ)]);
    }

    #[test]
    fn test_administrators_as_owner() {
        let admins = Sid::administrators();
        let aces = aces_from_mode(0o640, &admins, &group());
        assert_eq!(aces.iter().filter(|ace| ace.trustee == admins).count(), 1);
        assert_eq!(mode_from_aces(&aces, &admins, &group()), 0o640);
    }
}
