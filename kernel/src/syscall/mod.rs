// Syscall dispatch table.
// BSD 3-Clause License
//
// One flat match from ABI number to implementation. Blocked calls leave
// through the ERESTART_BLOCKED sentinel, which never reaches user code:
// the trap return path parks the process and reports the real value from
// a later return_to_user.

use larch_abi::errno::ERESTART_BLOCKED;
use larch_abi::syscall_numbers::*;

use crate::error::Error;
use crate::syscalls::{self, Outcome, SysResult};
use crate::Kernel;

pub fn dispatch(k: &mut Kernel, num: usize, a1: usize, a2: usize, a3: usize, a4: usize) -> isize {
    let result: SysResult = match num {
        SYS_EXIT => syscalls::process::sys_exit(k, a1 as i32),
        SYS_FORK => syscalls::process::sys_fork(k),
        SYS_EXECVE => syscalls::process::sys_execve(k, a1),
        SYS_WAIT => syscalls::process::sys_wait(k, a1),
        SYS_GETPID => syscalls::process::sys_getpid(k),
        SYS_GETPPID => syscalls::process::sys_getppid(k),
        SYS_YIELD => syscalls::process::sys_yield(k),
        SYS_WAITPID => syscalls::process::sys_waitpid(k, a1 as i32, a2, a3 as u32),
        SYS_WAIT3 => syscalls::process::sys_wait3(k, a1, a2 as u32, a3),
        SYS_WAIT4 => syscalls::process::sys_wait4(k, a1 as i32, a2, a3 as u32, a4),

        SYS_KILL => syscalls::process_jobctl::sys_kill(k, a1 as i32, a2 as i32),
        SYS_KILLPG => syscalls::process_jobctl::sys_killpg(k, a1 as i32, a2 as i32),
        SYS_SETPGID => syscalls::process_jobctl::sys_setpgid(k, a1 as i32, a2 as i32),
        SYS_GETPGID => syscalls::process_jobctl::sys_getpgid(k, a1 as i32),
        SYS_SETSID => syscalls::process_jobctl::sys_setsid(k),
        SYS_GETSID => syscalls::process_jobctl::sys_getsid(k, a1 as i32),
        SYS_TCSETPGRP => syscalls::process_jobctl::sys_tcsetpgrp(k, a1 as i32, a2 as i32),
        SYS_TCGETPGRP => syscalls::process_jobctl::sys_tcgetpgrp(k, a1 as i32),

        SYS_MMAP => syscalls::mm::sys_mmap(k, a1, a2, a3 as u32, a4 as u32),
        SYS_MUNMAP => syscalls::mm::sys_munmap(k, a1, a2),
        SYS_MPROTECT => syscalls::mm::sys_mprotect(k, a1, a2, a3 as u32),

        SYS_SIGNAL => syscalls::signal::sys_signal(k, a1 as i32, a2),
        SYS_SIGACTION => syscalls::signal::sys_sigaction(k, a1 as i32, a2, a3 as u32, a4 as u32),
        SYS_SIGPROCMASK => syscalls::signal::sys_sigprocmask(k, a1 as u32, a2 as u32),
        SYS_SIGRETURN => syscalls::signal::sys_sigreturn(k),
        SYS_SIGSUSPEND => syscalls::signal::sys_sigsuspend(k, a1 as u32),
        SYS_SIGPENDING => syscalls::signal::sys_sigpending(k),
        SYS_PAUSE => syscalls::signal::sys_pause(k),

        SYS_NANOSLEEP => syscalls::time::sys_nanosleep(k, a1 as u64),

        // File I/O numbers are reserved but not wired up.
        SYS_READ | SYS_WRITE | SYS_OPEN | SYS_CLOSE | SYS_DUP | SYS_DUP2 => {
            Err(Error::Unimplemented)
        }
        _ => {
            log::warn!("unknown syscall {num}");
            Err(Error::Unimplemented)
        }
    };

    match result {
        Ok(Outcome::Done(v)) => v,
        Ok(Outcome::Blocked) => ERESTART_BLOCKED,
        Err(e) => e.errno(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Pid;
    use crate::KernelConfig;
    use larch_abi::errno::{ECHILD, EINVAL, ENOSYS};

    fn boot() -> (Kernel, Pid) {
        let mut k = Kernel::new(KernelConfig { phys_frames: 16, max_processes: 8 });
        let init = k.spawn_init("init").unwrap();
        (k, init)
    }

    #[test]
    fn getpid_round_trip() {
        let (mut k, init) = boot();
        assert_eq!(dispatch(&mut k, SYS_GETPID, 0, 0, 0, 0), init as isize);
    }

    #[test]
    fn errors_come_back_negative() {
        let (mut k, _) = boot();
        assert_eq!(dispatch(&mut k, SYS_WAIT, 0, 0, 0, 0), -ECHILD);
        assert_eq!(dispatch(&mut k, SYS_KILL, 1, 99, 0, 0), -EINVAL);
    }

    #[test]
    fn blocked_calls_return_the_sentinel() {
        let (mut k, _) = boot();
        let child = dispatch(&mut k, SYS_FORK, 0, 0, 0, 0);
        assert!(child > 1);
        assert_eq!(dispatch(&mut k, SYS_WAITPID, child as usize, 0, 0, 0), ERESTART_BLOCKED);
    }

    #[test]
    fn reserved_and_unknown_numbers_are_enosys() {
        let (mut k, _) = boot();
        assert_eq!(dispatch(&mut k, SYS_READ, 0, 0, 0, 0), -ENOSYS);
        assert_eq!(dispatch(&mut k, SYS_DUP2, 0, 0, 0, 0), -ENOSYS);
        assert_eq!(dispatch(&mut k, 9999, 0, 0, 0, 0), -ENOSYS);
    }
}
