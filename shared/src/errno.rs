// Kernel error numbers. Syscalls return negative errno values; the libc
// wrappers negate them into the userland errno contract.
// BSD 3-Clause License

pub const EPERM: isize = 1;
pub const ENOENT: isize = 2;
pub const ESRCH: isize = 3;
pub const EINTR: isize = 4;
pub const EBADF: isize = 9;
pub const ECHILD: isize = 10;
pub const EAGAIN: isize = 11;
pub const ENOMEM: isize = 12;
pub const EFAULT: isize = 14;
pub const EINVAL: isize = 22;
pub const ENOTTY: isize = 25;
pub const ENOSYS: isize = 38;

/// Kernel-internal sentinel: a syscall parked its caller and will complete
/// later through the trap-return path. Never delivered to user mode.
pub const ERESTART_BLOCKED: isize = -512;
