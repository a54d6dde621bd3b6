// Timer syscalls.
// BSD 3-Clause License

use super::{done, Outcome, SysResult};
use crate::error::Error;
use crate::process::ParkedCall;
use crate::Kernel;

/// BSD Semantics:
/// - Durations are scheduler ticks; zero completes immediately.
/// - An unmasked caught signal ends the sleep with EINTR (or restarts it
///   under SA_RESTART, with the original deadline).
pub fn sys_nanosleep(k: &mut Kernel, ticks: u64) -> SysResult {
    if ticks == 0 {
        return done(0);
    }
    let pid = k.current_pid()?;
    let wake_tick = k.sched.ticks().saturating_add(ticks);
    let p = k.table.get_mut(pid).ok_or(Error::NoSuchProcess)?;
    p.parked = Some(ParkedCall::Nanosleep { wake_tick });
    k.sched.on_block(pid);
    Ok(Outcome::Blocked)
}
