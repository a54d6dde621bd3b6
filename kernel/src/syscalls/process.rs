// Process lifecycle syscalls: exit, fork, execve, the wait family.
// BSD 3-Clause License

use alloc::string::String;

use larch_abi::wait_status::{
    w_make_exited, w_make_stopped, WCONTINUED, WNOHANG, WUNTRACED, W_CONTINUED,
};

use super::{done, read_user_cstr, Outcome, SysResult};
use crate::error::Error;
use crate::mm::{AddressSpace, Backing, MapFlags, Prot};
use crate::process::{JobNote, ParkedCall, Pid, Process};
use crate::signal::types::Disposition;
use crate::signal::SigAction;
use crate::Kernel;

/// 64 KiB of initial stack below a fixed top. Grown-on-demand stacks are
/// a region-resize away but nothing here needs them.
const USER_STACK_TOP: usize = 0x7fff_0000_0000;
const USER_STACK_SIZE: usize = 64 * 1024;

/// BSD Semantics:
/// - Never returns to the caller.
/// - Children are inherited by init, frames are released immediately.
/// - The status word stays readable by the parent until reaped.
pub fn sys_exit(k: &mut Kernel, code: i32) -> SysResult {
    let pid = k.current_pid()?;
    k.terminate(pid, w_make_exited(code));
    done(0)
}

/// BSD Semantics:
/// - Child gets a private copy of every fulfilled page; promises are
///   shared by value, not by reference.
/// - Inherits pgid, sid, signal mask and dispositions.
/// - Pending signals and handler frames do not cross fork.
pub fn sys_fork(k: &mut Kernel) -> SysResult {
    let parent_pid = k.current_pid()?;
    if k.table.len() >= k.table.capacity() {
        return Err(Error::TryAgain);
    }
    let child_pid = k.table.alloc_pid();

    let (aspace, name, pgid, sid, mask, actions) = {
        let Kernel { frames, table, .. } = k;
        let parent = table.get(parent_pid).ok_or(Error::NoSuchProcess)?;
        let aspace = parent.aspace.clone_into(frames).ok_or(Error::OutOfMemory)?;
        (aspace, parent.name.clone(), parent.pgid, parent.sid, parent.mask, parent.actions)
    };

    let mut child = Process::new(child_pid, parent_pid, name);
    child.aspace = aspace;
    child.pgid = pgid;
    child.sid = sid;
    child.mask = mask;
    child.actions = actions;
    k.table.insert(child)?;
    k.sched.on_spawn(child_pid);
    log::debug!("pid {parent_pid} forked {child_pid}");
    done(child_pid as isize)
}

/// BSD Semantics:
/// - On success the old image is gone: new regions, empty stack, entry
///   point from the registered program.
/// - On any failure the caller keeps its old image untouched.
/// - Caught dispositions reset to default; ignored ones and the mask
///   survive, as do pending signals.
pub fn sys_execve(k: &mut Kernel, path_ptr: usize) -> SysResult {
    let pid = k.current_pid()?;
    let path = read_user_cstr(k, pid, path_ptr)?;
    exec_named(k, pid, &path)?;
    done(0)
}

/// Exec core, addressable by name. Returns the image entry point.
pub fn exec_named(k: &mut Kernel, pid: Pid, path: &str) -> Result<usize, Error> {
    let image = k.programs.get(path).cloned().ok_or(Error::NotFound)?;

    // Assemble the replacement space first; mapping makes no frame
    // demands, so failure here leaves the process fully intact.
    let mut aspace = AddressSpace::new();
    for seg in &image.segments {
        aspace.map_region(
            seg.vaddr,
            seg.memsz,
            seg.prot,
            MapFlags::PRIVATE | MapFlags::FIXED,
            Backing::Bytes { data: seg.bytes.clone(), offset: 0 },
        )?;
    }
    aspace.map_region(
        USER_STACK_TOP - USER_STACK_SIZE,
        USER_STACK_SIZE,
        Prot::READ | Prot::WRITE,
        MapFlags::PRIVATE | MapFlags::ANONYMOUS | MapFlags::FIXED,
        Backing::Anonymous,
    )?;

    let Kernel { frames, table, .. } = k;
    let p = table.get_mut(pid).ok_or(Error::NoSuchProcess)?;
    p.aspace.release_all(frames);
    p.aspace = aspace;
    p.name = String::from(path);
    for action in p.actions.iter_mut() {
        if matches!(action.disposition, Disposition::Handler(_)) {
            *action = SigAction::default();
        }
    }
    p.sig_frames.clear();
    p.journal.clear();
    log::debug!("pid {pid} execs {path}, entry {:#x}", image.entry);
    Ok(image.entry)
}

pub fn sys_getpid(k: &mut Kernel) -> SysResult {
    done(k.current_pid()? as isize)
}

pub fn sys_getppid(k: &mut Kernel) -> SysResult {
    let pid = k.current_pid()?;
    let p = k.table.get(pid).ok_or(Error::NoSuchProcess)?;
    done(p.parent as isize)
}

pub fn sys_yield(k: &mut Kernel) -> SysResult {
    k.sched.schedule();
    done(0)
}

// ==== The wait family ====

pub fn sys_wait(k: &mut Kernel, status_ptr: usize) -> SysResult {
    wait_common(k, -1, status_ptr, 0, 0)
}

/// BSD Semantics:
/// - pid -1: any child; pid > 0: that child; pid 0: caller's process
///   group; pid < -1: group -pid.
/// - WNOHANG returns 0 instead of parking.
/// - WUNTRACED/WCONTINUED report each stop/continue transition once.
/// - ECHILD when nothing matching could ever be waited for.
pub fn sys_waitpid(k: &mut Kernel, pid_arg: Pid, status_ptr: usize, options: u32) -> SysResult {
    wait_common(k, pid_arg, status_ptr, options, 0)
}

pub fn sys_wait3(k: &mut Kernel, status_ptr: usize, options: u32, rusage_ptr: usize) -> SysResult {
    wait_common(k, -1, status_ptr, options, rusage_ptr)
}

pub fn sys_wait4(
    k: &mut Kernel,
    pid_arg: Pid,
    status_ptr: usize,
    options: u32,
    rusage_ptr: usize,
) -> SysResult {
    wait_common(k, pid_arg, status_ptr, options, rusage_ptr)
}

fn wait_common(
    k: &mut Kernel,
    target: Pid,
    status_ptr: usize,
    options: u32,
    rusage_ptr: usize,
) -> SysResult {
    if options & !(WNOHANG | WUNTRACED | WCONTINUED) != 0 {
        return Err(Error::InvalidArgument);
    }
    let caller = k.current_pid()?;
    match try_collect(k, caller, target, status_ptr, options, rusage_ptr)? {
        Some(child) => done(child as isize),
        None if options & WNOHANG != 0 => done(0),
        None => {
            let p = k.table.get_mut(caller).ok_or(Error::NoSuchProcess)?;
            p.parked = Some(ParkedCall::Wait { target, status_ptr, options, rusage_ptr });
            k.sched.on_block(caller);
            Ok(Outcome::Blocked)
        }
    }
}

/// One evaluation of a wait: reap a zombie, or report a job-control note
/// when the options ask for it. `Ok(None)` means "children exist but no
/// event yet", the parking case.
pub(crate) fn try_collect(
    k: &mut Kernel,
    caller: Pid,
    target: Pid,
    status_ptr: usize,
    options: u32,
    rusage_ptr: usize,
) -> Result<Option<Pid>, Error> {
    // rusage out-pointers are accepted and left untouched; this kernel
    // keeps no per-process accounting to report.
    let _ = rusage_ptr;

    let caller_pgid = k.table.get(caller).ok_or(Error::NoSuchProcess)?.pgid;
    let selected = |p: &Process| {
        p.parent == caller
            && match target {
                -1 => true,
                0 => p.pgid == caller_pgid,
                t if t > 0 => p.pid == t,
                t => p.pgid == -t,
            }
    };

    let mut any = false;
    let mut zombie = None;
    let mut stopped = None;
    let mut continued = None;
    for p in k.table.iter() {
        if !selected(p) {
            continue;
        }
        any = true;
        if p.is_zombie() && zombie.is_none() {
            zombie = Some((p.pid, p.exit_status.unwrap_or(0)));
        }
        match p.job_note {
            Some(JobNote::Stopped(sig)) if stopped.is_none() => stopped = Some((p.pid, sig)),
            Some(JobNote::Continued) if continued.is_none() => continued = Some(p.pid),
            _ => {}
        }
    }
    if !any {
        return Err(Error::NoChildren);
    }

    if let Some((pid, status)) = zombie {
        write_status(status_ptr, status);
        k.table.remove(pid);
        log::debug!("pid {caller} reaped {pid}");
        return Ok(Some(pid));
    }
    if options & WUNTRACED != 0 {
        if let Some((pid, sig)) = stopped {
            if let Some(p) = k.table.get_mut(pid) {
                p.job_note = None;
            }
            write_status(status_ptr, w_make_stopped(sig));
            return Ok(Some(pid));
        }
    }
    if options & WCONTINUED != 0 {
        if let Some(pid) = continued {
            if let Some(p) = k.table.get_mut(pid) {
                p.job_note = None;
            }
            write_status(status_ptr, W_CONTINUED);
            return Ok(Some(pid));
        }
    }
    Ok(None)
}

fn write_status(ptr: usize, status: i32) {
    if ptr == 0 {
        return;
    }
    // Out-pointers follow the harness convention of host addresses; a
    // trap path on real hardware would translate through the mapping.
    unsafe { (ptr as *mut i32).write(status) };
}
