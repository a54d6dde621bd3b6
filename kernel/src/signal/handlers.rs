// Signal delivery on return to user mode, and the shared lifecycle
// transitions (terminate, stop, continue) that default actions invoke.
// BSD 3-Clause License

use larch_abi::wait_status::w_make_signaled;

use super::delivery::post_signal;
use super::types::{
    default_action, DefaultAction, Disposition, SaFlags, SigAction, SigSet, SignalFrame,
    SIGCHLD, SIGCONT, SIGKILL, SIGSTOP, STOP_SIGNALS,
};
use crate::process::{JobNote, ParkedCall, Pid, ProcessState, INIT_PID};
use crate::Kernel;

/// What signal delivery did to the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivered {
    /// Nothing deliverable.
    None,
    /// A handler frame was pushed; the handler is considered to have run.
    Caught { signo: i32, restart: bool },
    /// A stop signal took effect.
    Stopped,
    /// A fatal default action ran; the PCB is now a zombie.
    Terminated,
}

/// Deliver pending unmasked signals to `pid`, lowest number first.
///
/// Discardable signals (ignored, or default-ignore) are consumed in one
/// sweep; the first signal with a real effect ends delivery, because a
/// caught handler or a stop changes what "pending and unmasked" means.
pub fn deliver_pending(k: &mut Kernel, pid: Pid) -> Delivered {
    loop {
        let Some(p) = k.table.get_mut(pid) else {
            return Delivered::None;
        };
        if p.state != ProcessState::Running {
            return Delivered::None;
        }
        let Some(sig) = p.deliverable().lowest() else {
            return Delivered::None;
        };
        let action = p.action(sig);
        let _ = p.pending.remove(sig);

        match action.disposition {
            Disposition::Ignore => continue,
            Disposition::Default => match default_action(sig) {
                // A resume's work happened at post time.
                DefaultAction::Ignore | DefaultAction::Continue => continue,
                DefaultAction::Terminate => {
                    terminate_process(k, pid, w_make_signaled(sig));
                    return Delivered::Terminated;
                }
                DefaultAction::Stop => {
                    stop_process(k, pid, sig);
                    return Delivered::Stopped;
                }
            },
            Disposition::Handler(_) => {
                p.sig_frames.push(SignalFrame { signo: sig, saved_mask: p.mask });
                let mut during = p.mask.union(action.mask);
                if !action.flags.contains(SaFlags::NODEFER) {
                    let _ = during.add(sig);
                }
                p.mask = during.without(SigSet::of(&[SIGKILL, SIGSTOP]));
                if action.flags.contains(SaFlags::RESETHAND) {
                    p.actions[sig as usize] = SigAction::default();
                }
                p.journal.push(sig);
                log::trace!("pid {pid}: caught {}", super::types::sig_name(sig));
                return Delivered::Caught {
                    signo: sig,
                    restart: action.flags.contains(SaFlags::RESTART),
                };
            }
        }
    }
}

/// Turn `pid` into a zombie holding `status`.
///
/// Order matters: children are reparented before the parent is told,
/// so init never sees a child appear after the SIGCHLD that announces
/// this death; frames go back before the zombie lingers.
pub(crate) fn terminate_process(k: &mut Kernel, pid: Pid, status: i32) {
    let Some(p) = k.table.get(pid) else { return };
    if p.is_zombie() {
        return;
    }
    let parent = p.parent;

    // Orphans go to init.
    let mut orphaned = false;
    for child in k.table.iter_mut().filter(|c| c.parent == pid) {
        child.parent = INIT_PID;
        orphaned = true;
    }
    if orphaned {
        wake_parked_waiter(k, INIT_PID);
    }

    let Kernel { frames, table, .. } = k;
    if let Some(p) = table.get_mut(pid) {
        p.aspace.release_all(frames);
        p.exit_status = Some(status);
        p.state = ProcessState::Zombie;
        p.parked = None;
        p.job_note = None;
        p.pending = SigSet::EMPTY;
    }
    k.sched.on_exit(pid);
    log::debug!("pid {pid} exited, status {status:#x}");

    if parent > 0 {
        let _ = post_signal(k, parent, SIGCHLD);
        wake_parked_waiter(k, parent);
    }
}

/// Halt `pid` until SIGCONT and leave a job note for waitpid.
pub(crate) fn stop_process(k: &mut Kernel, pid: Pid, sig: i32) {
    let Some(p) = k.table.get_mut(pid) else { return };
    if p.is_zombie() {
        return;
    }
    let _ = p.pending.remove(SIGCONT);
    p.state = ProcessState::Stopped;
    p.job_note = Some(JobNote::Stopped(sig));
    let parent = p.parent;
    k.sched.on_stop(pid);

    if parent > 0 {
        notify_parent_of_job_event(k, parent);
    }
}

/// Resume `pid` if it is stopped. Safe to call on a running process;
/// the resume is then a no-op apart from clearing pending stop signals.
pub(crate) fn continue_process(k: &mut Kernel, pid: Pid) {
    let Some(p) = k.table.get_mut(pid) else { return };
    if p.is_zombie() {
        return;
    }
    p.pending = p.pending.without(STOP_SIGNALS);
    if p.state != ProcessState::Stopped {
        return;
    }
    p.state = ProcessState::Running;
    p.job_note = Some(JobNote::Continued);
    let parent = p.parent;
    k.sched.on_continue(pid);

    if parent > 0 {
        notify_parent_of_job_event(k, parent);
    }
}

/// SIGCHLD for a stop or continue, honoring the parent's NOCLDSTOP, and
/// a wake for any wait parked on the event.
fn notify_parent_of_job_event(k: &mut Kernel, parent: Pid) {
    let suppress = k
        .table
        .get(parent)
        .map_or(true, |pp| pp.action(SIGCHLD).flags.contains(SaFlags::NOCLDSTOP));
    if !suppress {
        let _ = post_signal(k, parent, SIGCHLD);
    }
    wake_parked_waiter(k, parent);
}

/// Waits re-evaluate their own match conditions; waking a non-matching
/// waiter only costs one re-park. A stopped waiter stays off the ready
/// queue; SIGCONT re-queues it and the parked call is retried then.
fn wake_parked_waiter(k: &mut Kernel, pid: Pid) {
    if k.table.get(pid).is_some_and(|p| {
        p.state == ProcessState::Running && matches!(p.parked, Some(ParkedCall::Wait { .. }))
    }) {
        k.sched.on_wake(pid);
    }
}
