//! Larch kernel core.
//!
//! Single-CPU kernel model built around one owner: the [`Kernel`] value
//! holds the frame allocator, the process table and the scheduler, and
//! every subsystem borrows through it. There are no global statics, so
//! the whole kernel can be instantiated per test.
//!
//! Blocking syscalls use a parked-call scheme: a call that cannot finish
//! records itself on the PCB and the process leaves the ready queue;
//! [`Kernel::return_to_user`] re-evaluates the record after signal
//! delivery and produces the eventual return value.

// BSD 3-Clause License

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod error;
pub mod mm;
pub mod process;
pub mod sched;
pub mod signal;
pub mod syscall;
pub mod syscalls;

pub use error::Error;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use larch_abi::wait_status::w_make_signaled;

use mm::{Access, FaultError, FrameAllocator, Prot};
use process::{ParkedCall, Pid, Process, ProcessState, ProcessTable};
use sched::Scheduler;
use signal::types::{SIGKILL, SIGSEGV};
use signal::{deliver_pending, Delivered};

/// Boot-time sizing. Small defaults keep test kernels cheap.
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig {
    pub phys_frames: usize,
    pub max_processes: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self { phys_frames: 1024, max_processes: 64 }
    }
}

/// One loadable segment of a program image. Bytes are copied in on
/// first fault; the span past `bytes` up to `memsz` reads as zero.
pub struct ExecSegment {
    pub vaddr: usize,
    pub memsz: usize,
    pub bytes: Arc<[u8]>,
    pub prot: Prot,
}

/// A registered program, addressable by path from execve.
pub struct ExecImage {
    pub segments: Vec<ExecSegment>,
    pub entry: usize,
}

/// Outcome of a page fault as seen by the trap return path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOutcome {
    /// The faulting instruction can be retried.
    Resumed,
    /// The process was terminated; pick another one to run.
    Killed,
}

pub struct Kernel {
    pub(crate) config: KernelConfig,
    pub(crate) frames: FrameAllocator,
    pub(crate) table: ProcessTable,
    pub(crate) sched: Scheduler,
    pub(crate) programs: BTreeMap<String, Arc<ExecImage>>,
    pub(crate) foreground_pgid: Option<Pid>,
    /// Nested-fault latch: a fault taken while resolving a fault is fatal.
    in_fault: bool,
}

impl Kernel {
    #[must_use]
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            frames: FrameAllocator::new(config.phys_frames),
            table: ProcessTable::new(config.max_processes),
            sched: Scheduler::new(),
            programs: BTreeMap::new(),
            foreground_pgid: None,
            in_fault: false,
        }
    }

    // ==== Boot and harness surface ====

    /// Create the first process with an empty address space and put it on
    /// the CPU. Its pid becomes the reparenting target for orphans.
    pub fn spawn_init(&mut self, name: &str) -> Result<Pid, Error> {
        let pid = self.table.alloc_pid();
        self.table.insert(Process::new(pid, 0, String::from(name)))?;
        self.sched.on_spawn(pid);
        self.sched.run_now(pid);
        log::info!("spawned init as pid {pid}");
        Ok(pid)
    }

    /// Make a program image reachable by path from execve.
    pub fn register_program(&mut self, path: &str, image: ExecImage) {
        self.programs.insert(String::from(path), Arc::new(image));
    }

    /// Put an existing runnable process on the CPU.
    pub fn switch_to(&mut self, pid: Pid) -> Result<(), Error> {
        let p = self.table.get(pid).ok_or(Error::NoSuchProcess)?;
        if p.state != ProcessState::Running {
            return Err(Error::NoSuchProcess);
        }
        self.sched.run_now(pid);
        Ok(())
    }

    #[must_use]
    pub fn current(&self) -> Option<Pid> {
        self.sched.current()
    }

    pub(crate) fn current_pid(&self) -> Result<Pid, Error> {
        self.sched.current().ok_or(Error::NoSuchProcess)
    }

    #[must_use]
    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.table.get(pid)
    }

    #[must_use]
    pub fn pmm(&self) -> &FrameAllocator {
        &self.frames
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    #[must_use]
    pub fn config(&self) -> KernelConfig {
        self.config
    }

    /// Read from a process's fulfilled pages (harness and kernel use).
    pub fn read_user(&self, pid: Pid, addr: usize, buf: &mut [u8]) -> Result<(), Error> {
        let p = self.table.get(pid).ok_or(Error::NoSuchProcess)?;
        p.aspace.read(&self.frames, addr, buf)
    }

    /// Write into a process's fulfilled pages.
    pub fn write_user(&mut self, pid: Pid, addr: usize, bytes: &[u8]) -> Result<(), Error> {
        let Kernel { frames, table, .. } = self;
        let p = table.get(pid).ok_or(Error::NoSuchProcess)?;
        p.aspace.write(frames, addr, bytes)
    }

    // ==== Faults ====

    /// Trap entry for a page fault in `pid` at `addr`.
    ///
    /// Protection violations and stray pointers are fatal to the faulting
    /// process only; the kernel and every other process keep running. A
    /// fault taken while one is already being resolved means corrupted
    /// kernel state for this process and is likewise fatal.
    pub fn handle_page_fault(&mut self, pid: Pid, addr: usize, access: Access) -> FaultOutcome {
        if self.in_fault {
            self.in_fault = false;
            log::error!("nested page fault at {addr:#x}, killing pid {pid}");
            self.terminate(pid, w_make_signaled(SIGSEGV));
            return FaultOutcome::Killed;
        }
        self.in_fault = true;

        let Kernel { frames, table, .. } = self;
        let result = match table.get_mut(pid) {
            Some(p) => p.aspace.resolve_fault(frames, addr, access),
            None => Err(FaultError::NoRegion),
        };
        self.in_fault = false;

        match result {
            Ok(()) => FaultOutcome::Resumed,
            Err(FaultError::NoRegion | FaultError::Protection) => {
                log::warn!("pid {pid}: fatal fault at {addr:#x} ({access:?})");
                self.terminate(pid, w_make_signaled(SIGSEGV));
                FaultOutcome::Killed
            }
            Err(FaultError::OutOfMemory) => {
                log::warn!("pid {pid}: no frame for promised page {addr:#x}");
                self.terminate(pid, w_make_signaled(SIGKILL));
                FaultOutcome::Killed
            }
        }
    }

    // ==== Return to user mode ====

    /// Deliver pending signals and re-evaluate any parked syscall for
    /// `pid`. Returns `Some(value)` when a parked call produced its final
    /// return value this time around, `None` otherwise (nothing parked,
    /// still parked, or the process stopped or died during delivery).
    pub fn return_to_user(&mut self, pid: Pid) -> Option<isize> {
        let p = self.table.get(pid)?;
        if p.state != ProcessState::Running {
            return None;
        }

        match deliver_pending(self, pid) {
            Delivered::Terminated | Delivered::Stopped => return None,
            Delivered::Caught { restart, .. } => {
                if let Some(ret) = self.settle_interrupted_call(pid, restart) {
                    return Some(ret);
                }
            }
            Delivered::None => {}
        }

        self.retry_parked(pid)
    }

    /// A handler just ran while a call was parked: either the call is
    /// restarted transparently (fall through to the retry) or it fails
    /// with EINTR now.
    fn settle_interrupted_call(&mut self, pid: Pid, restart: bool) -> Option<isize> {
        let p = self.table.get_mut(pid)?;
        match p.parked {
            None => None,
            // Sigsuspend completes via a caught signal and nothing else;
            // the temporary mask comes off before it returns.
            Some(ParkedCall::Sigsuspend { saved_mask }) => {
                p.mask = saved_mask;
                p.parked = None;
                self.sched.on_wake(pid);
                Some(-larch_abi::errno::EINTR)
            }
            Some(_) if restart => None,
            Some(_) => {
                p.parked = None;
                self.sched.on_wake(pid);
                Some(-larch_abi::errno::EINTR)
            }
        }
    }

    fn retry_parked(&mut self, pid: Pid) -> Option<isize> {
        let parked = self.table.get(pid)?.parked?;
        match parked {
            ParkedCall::Wait { target, status_ptr, options, rusage_ptr } => {
                match syscalls::process::try_collect(self, pid, target, status_ptr, options, rusage_ptr) {
                    Ok(Some(child)) => {
                        self.unpark(pid);
                        Some(child as isize)
                    }
                    Ok(None) => {
                        // Woken but nothing to collect: back to sleep.
                        self.sched.on_block(pid);
                        None
                    }
                    Err(e) => {
                        self.unpark(pid);
                        Some(e.errno())
                    }
                }
            }
            ParkedCall::Pause | ParkedCall::Sigsuspend { .. } => {
                self.sched.on_block(pid);
                None
            }
            ParkedCall::Nanosleep { wake_tick } => {
                if self.sched.ticks() >= wake_tick {
                    self.unpark(pid);
                    Some(0)
                } else {
                    self.sched.on_block(pid);
                    None
                }
            }
        }
    }

    fn unpark(&mut self, pid: Pid) {
        if let Some(p) = self.table.get_mut(pid) {
            p.parked = None;
        }
        self.sched.on_wake(pid);
    }

    // ==== Timer ====

    /// Advance the tick counter and wake sleepers whose deadline passed.
    pub fn tick(&mut self) {
        let now = self.sched.tick();
        let due: Vec<Pid> = self
            .table
            .iter()
            .filter(|p| p.state == ProcessState::Running)
            .filter(|p| matches!(p.parked, Some(ParkedCall::Nanosleep { wake_tick }) if wake_tick <= now))
            .map(|p| p.pid)
            .collect();
        for pid in due {
            self.sched.on_wake(pid);
        }
    }

    // ==== Lifecycle core ====

    /// Full exit sequence shared by sys_exit, fatal signals and fatal
    /// faults. `status` is the packed wait-status word.
    pub(crate) fn terminate(&mut self, pid: Pid, status: i32) {
        signal::handlers::terminate_process(self, pid, status);
    }
}
