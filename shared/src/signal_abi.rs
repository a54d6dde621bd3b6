// Signal-related ABI words shared by libc shims and the kernel.
// BSD 3-Clause License

/// Handler words for signal()/sigaction: restore the default action,
/// discard the signal, or any other value as a handler entry point.
pub const SIG_DFL: usize = 0;
pub const SIG_IGN: usize = 1;

/// sigprocmask `how` values.
pub const SIG_BLOCK: u32 = 0;
pub const SIG_UNBLOCK: u32 = 1;
pub const SIG_SETMASK: u32 = 2;
