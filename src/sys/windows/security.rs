//! File security descriptors, account names and the machine's account domain.

use std::ffi::c_void;
use std::io;
use std::ptr;
use std::slice;
use std::sync::OnceLock;

use windows_sys::Win32::Foundation::{
    ERROR_INSUFFICIENT_BUFFER, ERROR_NONE_MAPPED, HANDLE, LocalFree, UNICODE_STRING,
};
use windows_sys::Win32::Security::Authentication::Identity::{
    LSA_HANDLE, LSA_OBJECT_ATTRIBUTES, LsaClose, LsaFreeMemory, LsaNtStatusToWinError,
    LsaOpenPolicy, LsaQueryInformationPolicy, POLICY_ACCOUNT_DOMAIN_INFO,
    POLICY_VIEW_LOCAL_INFORMATION, PolicyAccountDomainInformation,
};
use windows_sys::Win32::Security::Authorization::{
    GetNamedSecurityInfoW, GetSecurityInfo, SE_FILE_OBJECT, SetNamedSecurityInfoW, SetSecurityInfo,
};
use windows_sys::Win32::Security::{
    ACL, DACL_SECURITY_INFORMATION, GROUP_SECURITY_INFORMATION, GetLengthSid, IsValidSid,
    LookupAccountSidW, OWNER_SECURITY_INFORMATION, PROTECTED_DACL_SECURITY_INFORMATION, PSID,
    PSECURITY_DESCRIPTOR, SID_NAME_USE,
};

use crate::nt::acl::{self, Ace};
use crate::nt::Sid;

/// A security descriptor allocated by the system, freed with `LocalFree`.
struct Descriptor(PSECURITY_DESCRIPTOR);

impl Drop for Descriptor {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the descriptor came from GetSecurityInfo or GetNamedSecurityInfoW, which
            // allocate with LocalAlloc.
            unsafe { LocalFree(self.0) };
        }
    }
}

/// A copy of the parts of a file's security descriptor this crate reads.
#[derive(Debug, Clone)]
pub(crate) struct FileSecurity {
    pub owner: Sid,
    pub group: Sid,
    /// `None` for a null DACL, which grants everyone everything.
    pub dacl: Option<Vec<Ace>>,
}

impl FileSecurity {
    /// The permission bits the DACL describes.
    pub(crate) fn perm(&self) -> u32 {
        match &self.dacl {
            Some(aces) => acl::mode_from_aces(aces, &self.owner, &self.group),
            None => 0o777,
        }
    }
}

const QUERY: u32 = OWNER_SECURITY_INFORMATION | GROUP_SECURITY_INFORMATION | DACL_SECURITY_INFORMATION;

/// Reads owner, group and DACL from an open handle, which needs `READ_CONTROL`.
pub(crate) fn of_handle(handle: HANDLE) -> io::Result<FileSecurity> {
    let (mut owner, mut group, mut dacl, mut descriptor) =
        (ptr::null_mut(), ptr::null_mut(), ptr::null_mut(), ptr::null_mut());
    // SAFETY: every out-pointer is valid; the pointers written into owner, group and dacl point
    // into descriptor, which is freed after they have been copied.
    let rc = unsafe {
        GetSecurityInfo(
            handle,
            SE_FILE_OBJECT,
            QUERY,
            &mut owner,
            &mut group,
            &mut dacl,
            ptr::null_mut(),
            &mut descriptor,
        )
    };
    let _descriptor = Descriptor(descriptor);
    if rc != 0 {
        Err(io::Error::from_raw_os_error(rc as i32))?
    }
    // SAFETY: the pointers are either null or point into the live descriptor.
    unsafe { copy_security(owner, group, dacl) }
}

/// Reads owner, group and DACL by name. `wide` is NUL-terminated.
pub(crate) fn of_path(wide: &[u16]) -> io::Result<FileSecurity> {
    let (mut owner, mut group, mut dacl, mut descriptor) =
        (ptr::null_mut(), ptr::null_mut(), ptr::null_mut(), ptr::null_mut());
    // SAFETY: as in of_handle; wide is NUL-terminated.
    let rc = unsafe {
        GetNamedSecurityInfoW(
            wide.as_ptr(),
            SE_FILE_OBJECT,
            QUERY,
            &mut owner,
            &mut group,
            &mut dacl,
            ptr::null_mut(),
            &mut descriptor,
        )
    };
    let _descriptor = Descriptor(descriptor);
    if rc != 0 {
        Err(io::Error::from_raw_os_error(rc as i32))?
    }
    // SAFETY: the pointers are either null or point into the live descriptor.
    unsafe { copy_security(owner, group, dacl) }
}

/// # Safety
/// Each pointer must be null or point to a valid structure of its type.
unsafe fn copy_security(owner: PSID, group: PSID, dacl: *mut ACL) -> io::Result<FileSecurity> {
    let invalid = || io::Error::from(io::ErrorKind::InvalidData);
    // SAFETY: forwarded from the caller.
    let (owner, group) = unsafe { (copy_sid(owner), copy_sid(group)) };
    let dacl = if dacl.is_null() {
        None
    } else {
        // SAFETY: dacl points to an ACL whose AclSize covers the whole list.
        let bytes = unsafe { slice::from_raw_parts(dacl.cast::<u8>(), (*dacl).AclSize as usize) };
        Some(acl::decode_acl(bytes).ok_or_else(invalid)?)
    };
    Ok(FileSecurity {
        owner: owner.ok_or_else(invalid)?,
        group: group.ok_or_else(invalid)?,
        dacl,
    })
}

/// # Safety
/// `sid` must be null or point to a SID.
pub(crate) unsafe fn copy_sid(sid: PSID) -> Option<Sid> {
    // SAFETY: IsValidSid checks the header before GetLengthSid trusts it.
    unsafe {
        if sid.is_null() || IsValidSid(sid) == 0 {
            return None;
        }
        let len = GetLengthSid(sid) as usize;
        Sid::from_bytes(slice::from_raw_parts(sid.cast::<u8>(), len))
    }
}

/// Copies `bytes` into 4-byte aligned storage, as ACL and SID structures require.
fn aligned(bytes: &[u8]) -> Vec<u32> {
    bytes.chunks(4)
        .map(|chunk| {
            let mut word = [0; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_ne_bytes(word)
        })
        .collect()
}

/// Replaces the DACL of the file named by `wide` with `aces`, without inherited entries.
pub(crate) fn set_dacl(wide: &[u16], aces: &[Ace]) -> io::Result<()> {
    let list = aligned(&acl::encode_acl(aces));
    // SAFETY: wide is NUL-terminated and list holds a well-formed ACL.
    let rc = unsafe {
        SetNamedSecurityInfoW(
            wide.as_ptr(),
            SE_FILE_OBJECT,
            DACL_SECURITY_INFORMATION | PROTECTED_DACL_SECURITY_INFORMATION,
            ptr::null_mut(),
            ptr::null_mut(),
            list.as_ptr().cast::<ACL>(),
            ptr::null(),
        )
    };
    if rc != 0 {
        Err(io::Error::from_raw_os_error(rc as i32))?
    }
    Ok(())
}

/// Makes `owner` the owner of the object behind `handle`, which needs `WRITE_OWNER`.
pub(crate) fn set_owner(handle: HANDLE, owner: &Sid) -> io::Result<()> {
    let mut sid = aligned(&owner.to_bytes());
    // SAFETY: sid holds a well-formed SID that outlives the call.
    let rc = unsafe {
        SetSecurityInfo(
            handle,
            SE_FILE_OBJECT,
            OWNER_SECURITY_INFORMATION,
            sid.as_mut_ptr().cast::<c_void>(),
            ptr::null_mut(),
            ptr::null(),
            ptr::null(),
        )
    };
    if rc != 0 {
        Err(io::Error::from_raw_os_error(rc as i32))?
    }
    Ok(())
}

/// `DOMAIN\name` for `sid`, or the bare name for accounts without a domain. SIDs that map to no
/// account are returned in their `S-1-…` form.
pub(crate) fn account_name(sid: &Sid) -> io::Result<String> {
    let mut raw = aligned(&sid.to_bytes());
    let psid: PSID = raw.as_mut_ptr().cast();
    let (mut name_len, mut domain_len) = (0_u32, 0_u32);
    let mut sid_use: SID_NAME_USE = 0;

    // SAFETY: null buffers with zero lengths ask for the required sizes.
    let ok = unsafe {
        LookupAccountSidW(
            ptr::null(),
            psid,
            ptr::null_mut(),
            &mut name_len,
            ptr::null_mut(),
            &mut domain_len,
            &mut sid_use,
        )
    };
    if ok == 0 {
        let err = io::Error::last_os_error();
        match err.raw_os_error().map(|code| code as u32) {
            Some(ERROR_INSUFFICIENT_BUFFER) => {},
            Some(ERROR_NONE_MAPPED) => return Ok(sid.to_string()),
            _ => Err(err)?,
        }
    }

    let mut name = vec![0_u16; name_len as usize];
    let mut domain = vec![0_u16; domain_len as usize];
    // SAFETY: both buffers have the lengths passed alongside them.
    let ok = unsafe {
        LookupAccountSidW(
            ptr::null(),
            psid,
            name.as_mut_ptr(),
            &mut name_len,
            domain.as_mut_ptr(),
            &mut domain_len,
            &mut sid_use,
        )
    };
    if ok == 0 {
        Err(io::Error::last_os_error())?
    }

    // On success the lengths exclude the terminator.
    let name = String::from_utf16_lossy(&name[..name_len as usize]);
    let domain = String::from_utf16_lossy(&domain[..domain_len as usize]);
    Ok(if domain.is_empty() { name } else { format!("{domain}\\{name}") })
}

static ACCOUNT_DOMAIN: OnceLock<Option<Sid>> = OnceLock::new();

/// The SID of this machine's account domain, read once from the local security policy. `None`
/// if the policy can't be read, in which case every domain SID counts as foreign.
pub(crate) fn account_domain() -> Option<&'static Sid> {
    ACCOUNT_DOMAIN.get_or_init(|| match query_account_domain() {
        Ok(domain) => {
            tracing::debug!(domain = %domain, "read account domain");
            Some(domain)
        },
        Err(err) => {
            tracing::debug!(error = %err, "failed to read account domain");
            None
        },
    }).as_ref()
}

fn query_account_domain() -> io::Result<Sid> {
    let lsa_error = |status: i32| {
        // SAFETY: plain value conversion.
        io::Error::from_raw_os_error(unsafe { LsaNtStatusToWinError(status) } as i32)
    };

    // SAFETY: an all-zero LSA_OBJECT_ATTRIBUTES is the documented default.
    let attributes: LSA_OBJECT_ATTRIBUTES = unsafe { std::mem::zeroed() };
    // SAFETY: LSA_HANDLE is a plain handle value.
    let mut policy: LSA_HANDLE = unsafe { std::mem::zeroed() };
    // SAFETY: a null system name means the local machine.
    let status = unsafe {
        LsaOpenPolicy(ptr::null::<UNICODE_STRING>(), &attributes, POLICY_VIEW_LOCAL_INFORMATION, &mut policy)
    };
    if status != 0 {
        Err(lsa_error(status))?
    }

    let mut buffer: *mut c_void = ptr::null_mut();
    // SAFETY: policy is open; buffer receives an LSA allocation.
    let status = unsafe { LsaQueryInformationPolicy(policy, PolicyAccountDomainInformation, &mut buffer) };
    // SAFETY: policy is open and not used afterwards.
    unsafe { LsaClose(policy) };
    if status != 0 {
        Err(lsa_error(status))?
    }

    // SAFETY: the query returns a POLICY_ACCOUNT_DOMAIN_INFO whose SID lives in the same
    // allocation, which is copied before it is freed.
    let domain = unsafe {
        let info = &*buffer.cast::<POLICY_ACCOUNT_DOMAIN_INFO>();
        let domain = copy_sid(info.DomainSid);
        LsaFreeMemory(buffer);
        domain
    };
    domain.ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
}
