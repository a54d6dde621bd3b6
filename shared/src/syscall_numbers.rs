// Canonical Larch syscall numbers (source of truth for kernel and userland).
// BSD 3-Clause License

// Process Management Syscalls
pub const SYS_EXIT: usize = 0;
pub const SYS_FORK: usize = 1;
pub const SYS_EXECVE: usize = 2;
pub const SYS_WAIT: usize = 3;
pub const SYS_GETPID: usize = 4;
pub const SYS_KILL: usize = 5;
pub const SYS_YIELD: usize = 6;
pub const SYS_WAITPID: usize = 7;
pub const SYS_SETPGID: usize = 8;
pub const SYS_GETPGID: usize = 9;
pub const SYS_GETPPID: usize = 10;
pub const SYS_WAIT3: usize = 11;
pub const SYS_WAIT4: usize = 12;
pub const SYS_KILLPG: usize = 13;
pub const SYS_SETSID: usize = 14;
pub const SYS_GETSID: usize = 15;

// Memory Management Syscalls
pub const SYS_MMAP: usize = 20;
pub const SYS_MUNMAP: usize = 21;
pub const SYS_MPROTECT: usize = 22;

// Signal Syscalls
pub const SYS_SIGNAL: usize = 40;
pub const SYS_SIGACTION: usize = 41;
pub const SYS_SIGPROCMASK: usize = 42;
pub const SYS_SIGRETURN: usize = 43;
pub const SYS_SIGSUSPEND: usize = 44;
pub const SYS_SIGPENDING: usize = 45;
pub const SYS_PAUSE: usize = 46;

// Console/TTY Syscalls
pub const SYS_TCSETPGRP: usize = 50;
pub const SYS_TCGETPGRP: usize = 51;

// Time Syscalls
pub const SYS_NANOSLEEP: usize = 60;

// I/O Syscalls (reserved, ENOSYS until the VFS server lands)
pub const SYS_READ: usize = 70;
pub const SYS_WRITE: usize = 71;
pub const SYS_OPEN: usize = 72;
pub const SYS_CLOSE: usize = 73;
pub const SYS_DUP: usize = 74;
pub const SYS_DUP2: usize = 75;
