// Job control: process groups, sessions, kill fan-out, terminal foreground.
// BSD 3-Clause License

use alloc::vec::Vec;

use super::{done, SysResult};
use crate::error::Error;
use crate::process::{Pid, INIT_PID};
use crate::signal::types::{is_valid_signal, Disposition, SIGTTOU};
use crate::signal::post_signal;
use crate::Kernel;

/// BSD Semantics:
/// - pid 0 means the caller, pgid 0 means "same as pid".
/// - Only the caller or one of its children may be moved.
/// - Session leaders cannot change groups; a nonzero pgid other than the
///   target's own must already exist inside the target's session.
pub fn sys_setpgid(k: &mut Kernel, pid: Pid, pgid: Pid) -> SysResult {
    if pgid < 0 {
        return Err(Error::InvalidArgument);
    }
    let caller = k.current_pid()?;
    let target = if pid == 0 { caller } else { pid };
    let pgid = if pgid == 0 { target } else { pgid };

    let (target_sid, target_parent, is_leader) = {
        let p = k.table.get(target).ok_or(Error::NoSuchProcess)?;
        (p.sid, p.parent, p.sid == p.pid)
    };
    if target != caller && target_parent != caller {
        return Err(Error::NoSuchProcess);
    }
    if is_leader {
        return Err(Error::NotPermitted);
    }
    if pgid != target {
        let exists = k.table.iter().any(|p| p.pgid == pgid && p.sid == target_sid);
        if !exists {
            return Err(Error::NotPermitted);
        }
    }
    if let Some(p) = k.table.get_mut(target) {
        p.pgid = pgid;
    }
    done(0)
}

pub fn sys_getpgid(k: &mut Kernel, pid: Pid) -> SysResult {
    let caller = k.current_pid()?;
    let target = if pid == 0 { caller } else { pid };
    let p = k.table.get(target).ok_or(Error::NoSuchProcess)?;
    done(p.pgid as isize)
}

/// BSD Semantics:
/// - Fails for a group leader; otherwise the caller becomes leader of a
///   new session and group, with no controlling terminal.
pub fn sys_setsid(k: &mut Kernel) -> SysResult {
    let caller = k.current_pid()?;
    let p = k.table.get_mut(caller).ok_or(Error::NoSuchProcess)?;
    if p.pgid == caller {
        return Err(Error::NotPermitted);
    }
    p.pgid = caller;
    p.sid = caller;
    done(caller as isize)
}

pub fn sys_getsid(k: &mut Kernel, pid: Pid) -> SysResult {
    let caller = k.current_pid()?;
    let target = if pid == 0 { caller } else { pid };
    let p = k.table.get(target).ok_or(Error::NoSuchProcess)?;
    done(p.sid as isize)
}

/// BSD Semantics:
/// - pid > 0: that process. pid 0: the caller's group. pid -1: everyone
///   except init. pid < -1: group -pid.
/// - sig 0 probes existence and permission without posting anything.
pub fn sys_kill(k: &mut Kernel, pid: Pid, sig: i32) -> SysResult {
    if sig != 0 && !is_valid_signal(sig) {
        return Err(Error::InvalidArgument);
    }
    match pid {
        p if p > 0 => {
            k.table.get(p).ok_or(Error::NoSuchProcess)?;
            if sig != 0 {
                post_signal(k, p, sig)?;
            }
            done(0)
        }
        0 => {
            let caller = k.current_pid()?;
            let pgid = k.table.get(caller).ok_or(Error::NoSuchProcess)?.pgid;
            signal_group(k, pgid, sig)
        }
        -1 => {
            let victims: Vec<Pid> = k
                .table
                .iter()
                .filter(|p| p.pid != INIT_PID)
                .map(|p| p.pid)
                .collect();
            if victims.is_empty() {
                return Err(Error::NoSuchProcess);
            }
            if sig != 0 {
                for v in victims {
                    let _ = post_signal(k, v, sig);
                }
            }
            done(0)
        }
        group => signal_group(k, -group, sig),
    }
}

pub fn sys_killpg(k: &mut Kernel, pgid: Pid, sig: i32) -> SysResult {
    if pgid <= 0 {
        return Err(Error::InvalidArgument);
    }
    if sig != 0 && !is_valid_signal(sig) {
        return Err(Error::InvalidArgument);
    }
    signal_group(k, pgid, sig)
}

fn signal_group(k: &mut Kernel, pgid: Pid, sig: i32) -> SysResult {
    let members: Vec<Pid> = k
        .table
        .iter()
        .filter(|p| p.pgid == pgid)
        .map(|p| p.pid)
        .collect();
    if members.is_empty() {
        return Err(Error::NoSuchProcess);
    }
    if sig != 0 {
        for pid in members {
            let _ = post_signal(k, pid, sig);
        }
    }
    done(0)
}

/// BSD Semantics:
/// - Only fds 0..=2 carry the terminal.
/// - The group must exist in the caller's session.
/// - A background caller that has not opted out of SIGTTOU gets it posted
///   to its whole group and the call fails with EINTR.
pub fn sys_tcsetpgrp(k: &mut Kernel, fd: i32, pgid: Pid) -> SysResult {
    if !(0..=2).contains(&fd) {
        return Err(Error::BadFileDescriptor);
    }
    if pgid <= 0 {
        return Err(Error::InvalidArgument);
    }
    let caller = k.current_pid()?;
    let (caller_pgid, caller_sid, ttou_ignored) = {
        let p = k.table.get(caller).ok_or(Error::NoSuchProcess)?;
        let ignored = p.action(SIGTTOU).disposition == Disposition::Ignore
            || p.mask.contains(SIGTTOU);
        (p.pgid, p.sid, ignored)
    };
    if !k.table.iter().any(|p| p.pgid == pgid && p.sid == caller_sid) {
        return Err(Error::NotPermitted);
    }
    if let Some(fg) = k.foreground_pgid {
        if fg != caller_pgid && !ttou_ignored {
            let _ = signal_group(k, caller_pgid, SIGTTOU);
            return Err(Error::Interrupted);
        }
    }
    k.foreground_pgid = Some(pgid);
    done(0)
}

pub fn sys_tcgetpgrp(k: &mut Kernel, fd: i32) -> SysResult {
    if !(0..=2).contains(&fd) {
        return Err(Error::BadFileDescriptor);
    }
    let fg = k.foreground_pgid.ok_or(Error::NotATty)?;
    done(fg as isize)
}
