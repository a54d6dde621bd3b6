// Memory syscalls: mmap, munmap, mprotect.
// BSD 3-Clause License

use super::{done, SysResult};
use crate::error::Error;
use crate::mm::{Backing, MapFlags, Prot};
use crate::Kernel;

/// BSD Semantics:
/// - Anonymous private mappings only; returns the chosen base address.
/// - No frames move here. The first touch of each page faults one in,
///   zero-filled.
pub fn sys_mmap(
    k: &mut Kernel,
    addr: usize,
    length: usize,
    prot_bits: u32,
    flags_bits: u32,
) -> SysResult {
    let prot = Prot::from_bits(prot_bits).ok_or(Error::InvalidArgument)?;
    let flags = MapFlags::from_bits(flags_bits).ok_or(Error::InvalidArgument)?;
    if !flags.contains(MapFlags::ANONYMOUS) || !flags.contains(MapFlags::PRIVATE) {
        return Err(Error::InvalidArgument);
    }
    let pid = k.current_pid()?;
    let p = k.table.get_mut(pid).ok_or(Error::NoSuchProcess)?;
    let base = p.aspace.map_region(addr, length, prot, flags, Backing::Anonymous)?;
    done(base as isize)
}

/// BSD Semantics:
/// - Page-aligned address, nonzero length.
/// - Frames inside the span go back to the allocator; promises straddling
///   an edge are split. Unmapping a hole is a successful no-op.
pub fn sys_munmap(k: &mut Kernel, addr: usize, length: usize) -> SysResult {
    let pid = k.current_pid()?;
    let Kernel { frames, table, .. } = k;
    let p = table.get_mut(pid).ok_or(Error::NoSuchProcess)?;
    p.aspace.unmap(frames, addr, length)?;
    done(0)
}

/// BSD Semantics:
/// - The whole span must be promised; ENOMEM otherwise.
/// - Only future accesses are affected; pages already faulted in keep
///   their frames.
pub fn sys_mprotect(k: &mut Kernel, addr: usize, length: usize, prot_bits: u32) -> SysResult {
    let prot = Prot::from_bits(prot_bits).ok_or(Error::InvalidArgument)?;
    let pid = k.current_pid()?;
    let p = k.table.get_mut(pid).ok_or(Error::NoSuchProcess)?;
    p.aspace.protect(addr, length, prot)?;
    done(0)
}
