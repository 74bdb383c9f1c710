use std::io;
use std::mem::{self, MaybeUninit};
use std::ops::Deref;
use std::ptr;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{
    BY_HANDLE_FILE_INFORMATION, CreateFileW, FILE_ATTRIBUTE_TAG_INFO, FILE_BASIC_INFO,
    FILE_FLAG_BACKUP_SEMANTICS, FILE_FLAG_OPEN_REPARSE_POINT, FILE_SHARE_DELETE, FILE_SHARE_READ,
    FILE_SHARE_WRITE, FileAttributeTagInfo, FileBasicInfo, GetFileInformationByHandle,
    GetFileInformationByHandleEx, OPEN_EXISTING,
};

/// An owned file handle, closed on drop.
#[derive(Debug)]
pub(crate) struct Handle(HANDLE);

impl Handle {
    /// Opens an existing file or directory without following a final symlink unless `follow`.
    /// Every share mode is granted so the open never blocks other users of the file.
    pub(crate) fn open(wide: &[u16], access: u32, follow: bool) -> io::Result<Handle> {
        let mut flags = FILE_FLAG_BACKUP_SEMANTICS;
        if !follow {
            flags |= FILE_FLAG_OPEN_REPARSE_POINT;
        }
        // SAFETY: wide is NUL-terminated and the other arguments are plain values.
        let raw = unsafe {
            CreateFileW(
                wide.as_ptr(),
                access,
                FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
                ptr::null(),
                OPEN_EXISTING,
                flags,
                ptr::null_mut(),
            )
        };
        if raw == INVALID_HANDLE_VALUE {
            Err(io::Error::last_os_error())?
        }
        Ok(Handle(raw))
    }

    /// Takes ownership of `raw`.
    pub(crate) const fn from_raw(raw: HANDLE) -> Handle {
        Handle(raw)
    }
}

impl Deref for Handle {
    type Target = HANDLE;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        // SAFETY: the handle is owned and closed exactly once.
        if unsafe { CloseHandle(self.0) } == 0 {
            tracing::warn!(error = %io::Error::last_os_error(), "failed to close handle");
        }
    }
}

pub(crate) fn file_information(handle: HANDLE) -> io::Result<BY_HANDLE_FILE_INFORMATION> {
    let mut info: MaybeUninit<BY_HANDLE_FILE_INFORMATION> = MaybeUninit::uninit();
    // SAFETY: info is large enough for the record.
    if unsafe { GetFileInformationByHandle(handle, info.as_mut_ptr()) } == 0 {
        Err(io::Error::last_os_error())?
    }
    // SAFETY: initialized on success.
    Ok(unsafe { info.assume_init() })
}

/// Reads a fixed-size record from `GetFileInformationByHandleEx`.
///
/// # Safety
/// `T` must be the record type that `class` produces.
unsafe fn information_ex<T>(handle: HANDLE, class: i32) -> io::Result<T> {
    let mut info: MaybeUninit<T> = MaybeUninit::uninit();
    // SAFETY: info is size_of::<T>() bytes, which the call is told.
    let ok = unsafe {
        GetFileInformationByHandleEx(handle, class, info.as_mut_ptr().cast(), mem::size_of::<T>() as u32)
    };
    if ok == 0 {
        Err(io::Error::last_os_error())?
    }
    // SAFETY: initialized on success, and the caller guarantees the layout matches.
    Ok(unsafe { info.assume_init() })
}

pub(crate) fn basic_information(handle: HANDLE) -> io::Result<FILE_BASIC_INFO> {
    // SAFETY: FileBasicInfo produces a FILE_BASIC_INFO.
    unsafe { information_ex(handle, FileBasicInfo) }
}

/// The reparse tag of a reparse point, or 0.
pub(crate) fn reparse_tag(handle: HANDLE) -> io::Result<u32> {
    // SAFETY: FileAttributeTagInfo produces a FILE_ATTRIBUTE_TAG_INFO.
    let info: FILE_ATTRIBUTE_TAG_INFO = unsafe { information_ex(handle, FileAttributeTagInfo) }?;
    Ok(info.ReparseTag)
}
