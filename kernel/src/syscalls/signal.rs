// Signal syscalls: dispositions, masks, suspension, handler return.
// BSD 3-Clause License

use larch_abi::signal_abi::{SIG_BLOCK, SIG_DFL, SIG_IGN, SIG_SETMASK, SIG_UNBLOCK};

use super::{done, Outcome, SysResult};
use crate::error::Error;
use crate::process::ParkedCall;
use crate::signal::types::{
    is_unblockable, is_valid_signal, Disposition, SaFlags, SigAction, SigSet, SIGKILL, SIGSTOP,
};
use crate::Kernel;

fn handler_word(d: Disposition) -> isize {
    match d {
        Disposition::Default => SIG_DFL as isize,
        Disposition::Ignore => SIG_IGN as isize,
        Disposition::Handler(addr) => addr as isize,
    }
}

fn disposition_from(word: usize) -> Disposition {
    match word {
        SIG_DFL => Disposition::Default,
        SIG_IGN => Disposition::Ignore,
        addr => Disposition::Handler(addr),
    }
}

/// BSD Semantics:
/// - Installs the full action (handler, flags, handler mask) and returns
///   the previous handler word.
/// - SIGKILL and SIGSTOP cannot be redirected.
/// - The handler mask can never smuggle SIGKILL/SIGSTOP in.
pub fn sys_sigaction(
    k: &mut Kernel,
    sig: i32,
    handler: usize,
    flags: u32,
    mask_bits: u32,
) -> SysResult {
    if !is_valid_signal(sig) || is_unblockable(sig) {
        return Err(Error::InvalidArgument);
    }
    let flags = SaFlags::from_bits(flags).ok_or(Error::InvalidArgument)?;
    let mask = SigSet::from_bits(mask_bits).without(SigSet::of(&[SIGKILL, SIGSTOP]));

    let pid = k.current_pid()?;
    let p = k.table.get_mut(pid).ok_or(Error::NoSuchProcess)?;
    let old = handler_word(p.actions[sig as usize].disposition);
    p.actions[sig as usize] = SigAction { disposition: disposition_from(handler), mask, flags };
    done(old)
}

/// BSD Semantics:
/// - The classic BSD signal(): handler plus SA_RESTART, empty mask.
pub fn sys_signal(k: &mut Kernel, sig: i32, handler: usize) -> SysResult {
    sys_sigaction(k, sig, handler, SaFlags::RESTART.bits(), 0)
}

/// BSD Semantics:
/// - how is BLOCK, UNBLOCK or SETMASK; anything else is EINVAL.
/// - Returns the previous mask as a bit word.
/// - SIGKILL and SIGSTOP are silently excluded from every result.
pub fn sys_sigprocmask(k: &mut Kernel, how: u32, set_bits: u32) -> SysResult {
    let pid = k.current_pid()?;
    let p = k.table.get_mut(pid).ok_or(Error::NoSuchProcess)?;
    let old = p.mask;
    let set = SigSet::from_bits(set_bits);
    let new = match how {
        SIG_BLOCK => old.union(set),
        SIG_UNBLOCK => old.without(set),
        SIG_SETMASK => set,
        _ => return Err(Error::InvalidArgument),
    };
    p.mask = new.without(SigSet::of(&[SIGKILL, SIGSTOP]));
    done(old.bits() as isize)
}

pub fn sys_sigpending(k: &mut Kernel) -> SysResult {
    let pid = k.current_pid()?;
    let p = k.table.get(pid).ok_or(Error::NoSuchProcess)?;
    done(p.pending.bits() as isize)
}

/// BSD Semantics:
/// - Atomically installs the given mask and parks until a caught signal.
/// - Always fails with EINTR; the original mask is back in place first.
pub fn sys_sigsuspend(k: &mut Kernel, mask_bits: u32) -> SysResult {
    let pid = k.current_pid()?;
    let p = k.table.get_mut(pid).ok_or(Error::NoSuchProcess)?;
    let saved_mask = p.mask;
    p.mask = SigSet::from_bits(mask_bits).without(SigSet::of(&[SIGKILL, SIGSTOP]));
    p.parked = Some(ParkedCall::Sigsuspend { saved_mask });
    k.sched.on_block(pid);
    Ok(Outcome::Blocked)
}

/// BSD Semantics:
/// - Parks until any signal is delivered; stop/continue do not count.
pub fn sys_pause(k: &mut Kernel) -> SysResult {
    let pid = k.current_pid()?;
    let p = k.table.get_mut(pid).ok_or(Error::NoSuchProcess)?;
    p.parked = Some(ParkedCall::Pause);
    k.sched.on_block(pid);
    Ok(Outcome::Blocked)
}

/// BSD Semantics:
/// - Pops the most recent handler frame and restores its saved mask.
/// - Calling with no frame outstanding is a user bug, reported as EINVAL.
pub fn sys_sigreturn(k: &mut Kernel) -> SysResult {
    let pid = k.current_pid()?;
    let p = k.table.get_mut(pid).ok_or(Error::NoSuchProcess)?;
    let frame = p.sig_frames.pop().ok_or(Error::InvalidArgument)?;
    p.mask = frame.saved_mask;
    done(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Pid;
    use crate::signal::types::{SIGINT, SIGTERM, SIGUSR1};
    use crate::signal::{deliver_pending, post_signal, Delivered};
    use crate::KernelConfig;

    fn boot() -> (Kernel, Pid) {
        let mut k = Kernel::new(KernelConfig { phys_frames: 16, max_processes: 8 });
        let init = k.spawn_init("init").unwrap();
        (k, init)
    }

    fn unwrap_done(r: SysResult) -> isize {
        match r.unwrap() {
            Outcome::Done(v) => v,
            Outcome::Blocked => panic!("unexpected block"),
        }
    }

    #[test]
    fn sigaction_round_trips_old_handler() {
        let (mut k, _) = boot();
        assert_eq!(unwrap_done(sys_sigaction(&mut k, SIGUSR1, 0xbeef, 0, 0)), SIG_DFL as isize);
        assert_eq!(
            unwrap_done(sys_sigaction(&mut k, SIGUSR1, SIG_IGN, 0, 0)),
            0xbeef
        );
        assert_eq!(
            unwrap_done(sys_sigaction(&mut k, SIGUSR1, SIG_DFL, 0, 0)),
            SIG_IGN as isize
        );
    }

    #[test]
    fn sigaction_rejects_kill_stop_and_junk() {
        let (mut k, _) = boot();
        assert_eq!(sys_sigaction(&mut k, SIGKILL, 0xbeef, 0, 0), Err(Error::InvalidArgument));
        assert_eq!(sys_sigaction(&mut k, SIGSTOP, SIG_IGN, 0, 0), Err(Error::InvalidArgument));
        assert_eq!(sys_sigaction(&mut k, 0, 0xbeef, 0, 0), Err(Error::InvalidArgument));
        assert_eq!(sys_sigaction(&mut k, 32, 0xbeef, 0, 0), Err(Error::InvalidArgument));
        // Unknown flag bits.
        assert_eq!(sys_sigaction(&mut k, SIGUSR1, 0xbeef, 0x2, 0), Err(Error::InvalidArgument));
    }

    #[test]
    fn handler_mask_strips_kill_and_stop() {
        let (mut k, init) = boot();
        let bits = SigSet::of(&[SIGKILL, SIGSTOP, SIGINT]).bits();
        sys_sigaction(&mut k, SIGUSR1, 0xbeef, 0, bits).unwrap();
        let mask = k.process(init).unwrap().action(SIGUSR1).mask;
        assert!(mask.contains(SIGINT));
        assert!(!mask.contains(SIGKILL));
        assert!(!mask.contains(SIGSTOP));
    }

    #[test]
    fn sigprocmask_block_unblock_set() {
        let (mut k, init) = boot();
        let term = SigSet::of(&[SIGTERM]).bits();
        let int_ = SigSet::of(&[SIGINT]).bits();
        assert_eq!(unwrap_done(sys_sigprocmask(&mut k, SIG_BLOCK, term)), 0);
        assert_eq!(
            unwrap_done(sys_sigprocmask(&mut k, SIG_BLOCK, int_)) as u32,
            term
        );
        assert_eq!(
            unwrap_done(sys_sigprocmask(&mut k, SIG_UNBLOCK, term)) as u32,
            term | int_
        );
        assert_eq!(unwrap_done(sys_sigprocmask(&mut k, SIG_SETMASK, 0)) as u32, int_);
        assert!(k.process(init).unwrap().mask.is_empty());
        assert_eq!(sys_sigprocmask(&mut k, 9, 0), Err(Error::InvalidArgument));
    }

    #[test]
    fn mask_never_blocks_kill_or_stop() {
        let (mut k, init) = boot();
        sys_sigprocmask(&mut k, SIG_SETMASK, SigSet::FULL.bits()).unwrap();
        let mask = k.process(init).unwrap().mask;
        assert!(!mask.contains(SIGKILL));
        assert!(!mask.contains(SIGSTOP));
        assert!(mask.contains(SIGTERM));
    }

    #[test]
    fn sigpending_reflects_blocked_posts() {
        let (mut k, init) = boot();
        sys_sigprocmask(&mut k, SIG_BLOCK, SigSet::of(&[SIGTERM]).bits()).unwrap();
        post_signal(&mut k, init, SIGTERM).unwrap();
        assert_eq!(
            unwrap_done(sys_sigpending(&mut k)) as u32,
            SigSet::of(&[SIGTERM]).bits()
        );
    }

    #[test]
    fn sigreturn_pops_frame_and_restores_mask() {
        let (mut k, init) = boot();
        sys_sigprocmask(&mut k, SIG_SETMASK, SigSet::of(&[SIGINT]).bits()).unwrap();
        sys_sigaction(&mut k, SIGUSR1, 0xbeef, 0, 0).unwrap();
        post_signal(&mut k, init, SIGUSR1).unwrap();
        assert!(matches!(deliver_pending(&mut k, init), Delivered::Caught { .. }));
        // Inside the handler both SIGINT and SIGUSR1 are masked.
        let during = k.process(init).unwrap().mask;
        assert!(during.contains(SIGINT) && during.contains(SIGUSR1));
        assert_eq!(unwrap_done(sys_sigreturn(&mut k)), 0);
        let after = k.process(init).unwrap().mask;
        assert_eq!(after, SigSet::of(&[SIGINT]));
        assert!(k.process(init).unwrap().sig_frames.is_empty());
        // No frame left: a second sigreturn is a user bug.
        assert_eq!(sys_sigreturn(&mut k), Err(Error::InvalidArgument));
    }

    #[test]
    fn pause_parks_and_eintr_on_caught_signal() {
        let (mut k, init) = boot();
        sys_sigaction(&mut k, SIGUSR1, 0xbeef, 0, 0).unwrap();
        assert_eq!(sys_pause(&mut k), Ok(Outcome::Blocked));
        assert_eq!(k.return_to_user(init), None);
        post_signal(&mut k, init, SIGUSR1).unwrap();
        assert_eq!(k.return_to_user(init), Some(-larch_abi::errno::EINTR));
        assert_eq!(k.process(init).unwrap().journal, alloc::vec![SIGUSR1]);
        assert!(k.process(init).unwrap().parked.is_none());
    }

    #[test]
    fn sigsuspend_swaps_mask_and_always_eintr() {
        let (mut k, init) = boot();
        sys_sigaction(&mut k, SIGUSR1, 0xbeef, SaFlags::RESTART.bits(), 0).unwrap();
        sys_sigprocmask(&mut k, SIG_SETMASK, SigSet::of(&[SIGUSR1]).bits()).unwrap();
        // Suspend with SIGUSR1 unblocked.
        assert_eq!(sys_sigsuspend(&mut k, 0), Ok(Outcome::Blocked));
        assert!(k.process(init).unwrap().mask.is_empty());
        post_signal(&mut k, init, SIGUSR1).unwrap();
        // Even with SA_RESTART, sigsuspend completes with EINTR and the
        // pre-call mask comes back.
        assert_eq!(k.return_to_user(init), Some(-larch_abi::errno::EINTR));
        assert_eq!(k.process(init).unwrap().mask, SigSet::of(&[SIGUSR1]));
        assert_eq!(k.process(init).unwrap().journal, alloc::vec![SIGUSR1]);
    }
}
