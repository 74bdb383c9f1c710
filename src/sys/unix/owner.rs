//! User and group name lookup through the password and group databases.

use std::ffi::{CStr, c_char};
use std::io;
use std::mem::MaybeUninit;
use std::ptr;

use libc::{ERANGE, gid_t, uid_t};

use crate::error::{Error, Op, Result};
use crate::fs::{FileInfo, Owner};

const INITIAL_BUF: usize = 1024;
const MAX_BUF: usize = 1 << 20;

/// Runs a reentrant `get*_r` lookup, growing the scratch buffer while it reports `ERANGE`.
/// Returns `None` when the database has no entry.
fn lookup<T, F, N>(mut call: F, name_of: N) -> io::Result<Option<String>>
where
    F: FnMut(*mut T, *mut c_char, usize, *mut *mut T) -> libc::c_int,
    N: Fn(&T) -> *const c_char,
{
    let mut buf: Vec<c_char> = vec![0; INITIAL_BUF];
    loop {
        let mut entry = MaybeUninit::<T>::uninit();
        let mut result: *mut T = ptr::null_mut();
        match call(entry.as_mut_ptr(), buf.as_mut_ptr(), buf.len(), &mut result) {
            ERANGE if buf.len() < MAX_BUF => {
                let len = buf.len() * 2;
                buf.resize(len, 0);
            },
            // Some implementations report a missing entry as an error instead of a null result.
            0 | libc::ENOENT | libc::ESRCH | libc::EBADF | libc::EPERM if result.is_null() => return Ok(None),
            0 => {
                // SAFETY: on success with a non-null result, the entry is initialized and its
                // strings point into buf, which is still alive.
                let name = unsafe { CStr::from_ptr(name_of(&*result)) };
                return Ok(Some(name.to_string_lossy().into_owned()));
            },
            code => return Err(io::Error::from_raw_os_error(code)),
        }
    }
}

pub(crate) fn user_name(uid: uid_t) -> io::Result<Option<String>> {
    lookup(
        // SAFETY: every pointer is valid for the length passed with it.
        |pwd, buf, len, result| unsafe { libc::getpwuid_r(uid, pwd, buf, len, result) },
        |pwd: &libc::passwd| pwd.pw_name,
    )
}

pub(crate) fn group_name(gid: gid_t) -> io::Result<Option<String>> {
    lookup(
        // SAFETY: every pointer is valid for the length passed with it.
        |grp, buf, len, result| unsafe { libc::getgrgid_r(gid, grp, buf, len, result) },
        |grp: &libc::group| grp.gr_name,
    )
}

/// Ids without a database entry are reported as their decimal form, like `ls -l` does.
pub(crate) fn resolve_owner(info: &FileInfo) -> Result<Owner> {
    let uid = info.uid() as uid_t;
    let gid = info.gid() as gid_t;
    let user = user_name(uid)
        .map_err(|e| Error::os(Op::Lookup, info.path(), e))?
        .unwrap_or_else(|| uid.to_string());
    let group = group_name(gid)
        .map_err(|e| Error::os(Op::Lookup, info.path(), e))?
        .unwrap_or_else(|| gid.to_string());
    Ok(Owner { user, group })
}
