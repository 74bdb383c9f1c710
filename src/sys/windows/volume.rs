//! Per-volume filesystem flags, probed once per volume serial number.

use std::collections::HashMap;
use std::io;
use std::ptr;
use std::sync::{LazyLock, PoisonError, RwLock};

use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::Storage::FileSystem::GetVolumeInformationByHandleW;

/// `FILE_PERSISTENT_ACLS`
const PERSISTENT_ACLS: u32 = 0x0000_0008;

static PERSISTENT: LazyLock<RwLock<HashMap<u32, bool>>> = LazyLock::new(Default::default);

/// Whether the volume `handle` lives on stores ACLs. FAT and most network shares don't, so their
/// permissions come from the read-only attribute instead.
pub(crate) fn has_persistent_acls(handle: HANDLE, serial: u32) -> bool {
    if let Some(&known) = PERSISTENT.read().unwrap_or_else(PoisonError::into_inner).get(&serial) {
        return known;
    }

    let mut flags = 0_u32;
    // SAFETY: only the flags out-parameter is requested; every buffer is null with a zero length.
    let ok = unsafe {
        GetVolumeInformationByHandleW(
            handle,
            ptr::null_mut(),
            0,
            ptr::null_mut(),
            ptr::null_mut(),
            &mut flags,
            ptr::null_mut(),
            0,
        )
    };
    if ok == 0 {
        // Don't cache a failed probe.
        tracing::debug!(serial, error = %io::Error::last_os_error(), "volume probe failed");
        return true;
    }

    let persistent = flags & PERSISTENT_ACLS != 0;
    tracing::trace!(serial, persistent, "probed volume");
    PERSISTENT.write().unwrap_or_else(PoisonError::into_inner).insert(serial, persistent);
    persistent
}
