use std::ffi::c_void;
use std::io;
use std::mem::{self, MaybeUninit};

use windows_sys::Win32::Foundation::{ERROR_INSUFFICIENT_BUFFER, HANDLE};
use windows_sys::Win32::Security::{
    GetTokenInformation, TOKEN_ELEVATION, TOKEN_INFORMATION_CLASS, TOKEN_PRIMARY_GROUP, TOKEN_QUERY,
    TOKEN_USER, TokenElevation, TokenPrimaryGroup, TokenUser,
};
use windows_sys::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

use super::handle::Handle;
use super::security::copy_sid;
use crate::nt::Sid;

/// The calling process's access token.
#[derive(Debug)]
pub(crate) struct Token(Handle);

impl Token {
    pub(crate) fn current() -> io::Result<Token> {
        let mut raw: MaybeUninit<HANDLE> = MaybeUninit::uninit();
        // SAFETY: GetCurrentProcess returns a pseudo-handle that needs no closing.
        if unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, raw.as_mut_ptr()) } == 0 {
            Err(io::Error::last_os_error())?
        }
        // SAFETY: initialized on success, and owned from here on.
        Ok(Token(Handle::from_raw(unsafe { raw.assume_init() })))
    }

    /// Variable-length token information, in 8-byte aligned storage.
    fn information(&self, class: TOKEN_INFORMATION_CLASS) -> io::Result<Vec<u64>> {
        let mut len = 0_u32;
        // SAFETY: a null buffer with zero length asks for the required size.
        let ok = unsafe { GetTokenInformation(*self.0, class, std::ptr::null_mut(), 0, &mut len) };
        if ok == 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(ERROR_INSUFFICIENT_BUFFER as i32) {
                Err(err)?
            }
        }
        let mut buf = vec![0_u64; (len as usize).div_ceil(mem::size_of::<u64>())];
        // SAFETY: buf holds at least len bytes.
        let ok = unsafe {
            GetTokenInformation(*self.0, class, buf.as_mut_ptr().cast::<c_void>(), len, &mut len)
        };
        if ok == 0 {
            Err(io::Error::last_os_error())?
        }
        Ok(buf)
    }

    pub(crate) fn user(&self) -> io::Result<Sid> {
        let buf = self.information(TokenUser)?;
        // SAFETY: TokenUser yields a TOKEN_USER whose SID lives in the same buffer.
        let sid = unsafe { copy_sid((*buf.as_ptr().cast::<TOKEN_USER>()).User.Sid) };
        sid.ok_or_else(|| io::Error::from(io::ErrorKind::InvalidData))
    }

    pub(crate) fn primary_group(&self) -> io::Result<Sid> {
        let buf = self.information(TokenPrimaryGroup)?;
        // SAFETY: TokenPrimaryGroup yields a TOKEN_PRIMARY_GROUP whose SID lives in the same
        // buffer.
        let sid = unsafe { copy_sid((*buf.as_ptr().cast::<TOKEN_PRIMARY_GROUP>()).PrimaryGroup) };
        sid.ok_or_else(|| io::Error::from(io::ErrorKind::InvalidData))
    }

    pub(crate) fn is_elevated(&self) -> io::Result<bool> {
        let buf = self.information(TokenElevation)?;
        // SAFETY: TokenElevation yields a TOKEN_ELEVATION.
        Ok(unsafe { (*buf.as_ptr().cast::<TOKEN_ELEVATION>()).TokenIsElevated } != 0)
    }
}
