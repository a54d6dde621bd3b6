// Shared harness for the integration tests: boot a kernel, drive it
// through the public dispatch surface the way a trap path would.
// BSD 3-Clause License

#![allow(dead_code)]

use larch_abi::syscall_numbers::*;
use larch_kernel::process::Pid;
use larch_kernel::syscall::dispatch;
use larch_kernel::{Kernel, KernelConfig};

pub fn boot(phys_frames: usize, max_processes: usize) -> (Kernel, Pid) {
    let mut k = Kernel::new(KernelConfig { phys_frames, max_processes });
    let init = k.spawn_init("init").expect("spawn init");
    (k, init)
}

/// Issue a syscall as the current process.
pub fn sys(k: &mut Kernel, num: usize, args: [usize; 4]) -> isize {
    dispatch(k, num, args[0], args[1], args[2], args[3])
}

/// Issue a syscall as `pid`, leaving it current.
pub fn sys_as(k: &mut Kernel, pid: Pid, num: usize, args: [usize; 4]) -> isize {
    k.switch_to(pid).expect("switch_to");
    sys(k, num, args)
}

pub fn fork(k: &mut Kernel) -> Pid {
    let pid = sys(k, SYS_FORK, [0; 4]);
    assert!(pid > 0, "fork failed: {pid}");
    pid as Pid
}

pub fn fork_as(k: &mut Kernel, parent: Pid) -> Pid {
    k.switch_to(parent).expect("switch_to");
    fork(k)
}

pub fn exit_as(k: &mut Kernel, pid: Pid, code: i32) {
    sys_as(k, pid, SYS_EXIT, [code as usize, 0, 0, 0]);
    assert!(k.process(pid).expect("pcb stays until reaped").is_zombie());
}

pub fn ptr_of(status: &mut i32) -> usize {
    status as *mut i32 as usize
}
