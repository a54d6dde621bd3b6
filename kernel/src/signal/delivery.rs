// Signal posting: pending-set discipline and immediate actions.
// BSD 3-Clause License
//
// Posting and delivery are separate moments. post_signal runs in the
// sender's context and only touches the target's pending set, except for
// the three signals whose effect cannot wait: SIGKILL, SIGSTOP, SIGCONT.

use super::handlers::{continue_process, stop_process, terminate_process};
use super::types::{
    default_action, is_valid_signal, DefaultAction, Disposition, SIGCONT, SIGKILL, SIGSTOP,
    STOP_SIGNALS,
};
use crate::error::Error;
use crate::process::{Pid, ProcessState};
use crate::Kernel;

use larch_abi::wait_status::w_make_signaled;

/// Post `sig` to `pid`. The target must exist; a zombie target accepts
/// the signal and drops it (its pid is still live until reaped).
pub fn post_signal(k: &mut Kernel, pid: Pid, sig: i32) -> Result<(), Error> {
    if !is_valid_signal(sig) {
        return Err(Error::InvalidArgument);
    }
    let target = k.table.get(pid).ok_or(Error::NoSuchProcess)?;
    if target.is_zombie() {
        return Ok(());
    }
    log::trace!("post {} -> pid {pid}", super::types::sig_name(sig));

    // Immediate, uncatchable, unblockable.
    match sig {
        SIGKILL => {
            terminate_process(k, pid, w_make_signaled(SIGKILL));
            return Ok(());
        }
        SIGSTOP => {
            stop_process(k, pid, SIGSTOP);
            return Ok(());
        }
        // The resume itself cannot be blocked; any handler for SIGCONT
        // still goes through the normal pending path below.
        SIGCONT => continue_process(k, pid),
        s if STOP_SIGNALS.contains(s) => {
            // A stop request cancels an undelivered resume and vice versa.
            if let Some(p) = k.table.get_mut(pid) {
                let _ = p.pending.remove(SIGCONT);
            }
        }
        _ => {}
    }

    let p = k.table.get_mut(pid).ok_or(Error::NoSuchProcess)?;
    let discard = match p.action(sig).disposition {
        Disposition::Ignore => true,
        Disposition::Default => default_action(sig) == DefaultAction::Ignore,
        Disposition::Handler(_) => false,
    };
    if discard {
        return Ok(());
    }
    let _ = p.pending.add(sig);

    // Interruptible sleeps end when an unmasked signal arrives.
    if p.parked.is_some() && p.state == ProcessState::Running && p.deliverable().contains(sig) {
        k.sched.on_wake(pid);
    }
    Ok(())
}
