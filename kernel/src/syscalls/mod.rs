// Syscall implementations, grouped the way the dispatch table groups them.
// BSD 3-Clause License

pub mod mm;
pub mod process;
pub mod process_jobctl;
pub mod signal;
pub mod time;

use alloc::string::String;

use crate::error::Error;
use crate::process::Pid;
use crate::Kernel;

/// How a syscall left the calling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Finished with this return value.
    Done(isize),
    /// Parked; the return value comes from a later
    /// [`Kernel::return_to_user`].
    Blocked,
}

pub type SysResult = Result<Outcome, Error>;

#[inline]
pub(crate) fn done(value: isize) -> SysResult {
    Ok(Outcome::Done(value))
}

/// Longest path accepted from user space, NUL included.
const USER_STR_MAX: usize = 256;

/// Copy a NUL-terminated string out of the caller's address space. Only
/// pages the process has actually touched are readable from here; a
/// pointer into an unfaulted page is EFAULT, same as a stray one.
pub(crate) fn read_user_cstr(k: &Kernel, pid: Pid, addr: usize) -> Result<String, Error> {
    let p = k.table.get(pid).ok_or(Error::NoSuchProcess)?;
    let mut bytes = alloc::vec::Vec::new();
    for i in 0..USER_STR_MAX {
        let mut b = [0u8];
        p.aspace.read(&k.frames, addr + i, &mut b)?;
        if b[0] == 0 {
            return String::from_utf8(bytes).map_err(|_| Error::InvalidArgument);
        }
        bytes.push(b[0]);
    }
    Err(Error::InvalidArgument)
}
