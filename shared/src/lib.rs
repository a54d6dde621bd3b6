//! Package: larch-abi
//! License: BSD-3-Clause
//!
//! Shared Larch ABI definitions (syscall numbers, errno values, the
//! wait-status word). Source of truth for both the kernel and userland.

#![no_std]

pub mod errno;
pub mod signal_abi;
pub mod syscall_numbers;
pub mod wait_status;

pub use errno::*;
pub use signal_abi::*;
pub use syscall_numbers::*;
pub use wait_status::*;
