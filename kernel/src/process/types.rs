// Process Control Block
// BSD 3-Clause License

use alloc::string::String;
use alloc::vec::Vec;

use crate::mm::AddressSpace;
use crate::signal::{SigAction, SigSet, SignalFrame, SIGNAL_COUNT};

pub type Pid = i32;

/// Orphans are reparented to init; init itself is unkillable via kill(-1).
pub const INIT_PID: Pid = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Runnable or currently on the CPU.
    Running,
    /// Halted by a stop signal until SIGCONT.
    Stopped,
    /// Exited; only the PCB remains until the parent collects the status.
    Zombie,
}

/// A job-control transition the parent has not yet observed through
/// waitpid. Each note is reported exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobNote {
    Stopped(i32),
    Continued,
}

/// A syscall that could not complete and parked the caller. The record
/// carries everything needed to re-evaluate the call from scratch on the
/// next return to user mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkedCall {
    Wait {
        /// Raw pid argument: -1 any, 0 own group, >0 one child, <-1 group.
        target: Pid,
        status_ptr: usize,
        options: u32,
        rusage_ptr: usize,
    },
    Pause,
    Sigsuspend {
        saved_mask: SigSet,
    },
    Nanosleep {
        wake_tick: u64,
    },
}

/// One process. Everything the kernel knows about it lives here; the
/// table owns the PCB and hands out borrows.
pub struct Process {
    pub pid: Pid,
    pub parent: Pid,
    pub pgid: Pid,
    pub sid: Pid,
    pub name: String,
    pub state: ProcessState,
    pub aspace: AddressSpace,

    // Signal state.
    pub pending: SigSet,
    pub mask: SigSet,
    pub actions: [SigAction; SIGNAL_COUNT],
    pub sig_frames: Vec<SignalFrame>,
    /// Caught signals in delivery order, standing in for handler runs.
    pub journal: Vec<i32>,

    // Lifecycle bookkeeping.
    pub exit_status: Option<i32>,
    pub job_note: Option<JobNote>,
    pub parked: Option<ParkedCall>,
}

impl Process {
    #[must_use]
    pub fn new(pid: Pid, parent: Pid, name: String) -> Self {
        Self {
            pid,
            parent,
            pgid: pid,
            sid: pid,
            name,
            state: ProcessState::Running,
            aspace: AddressSpace::new(),
            pending: SigSet::EMPTY,
            mask: SigSet::EMPTY,
            actions: [SigAction::default(); SIGNAL_COUNT],
            sig_frames: Vec::new(),
            journal: Vec::new(),
            exit_status: None,
            job_note: None,
            parked: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_zombie(&self) -> bool {
        self.state == ProcessState::Zombie
    }

    #[inline]
    #[must_use]
    pub fn action(&self, sig: i32) -> SigAction {
        self.actions[sig as usize]
    }

    /// Signals ready for delivery right now.
    #[inline]
    #[must_use]
    pub fn deliverable(&self) -> SigSet {
        self.pending.without(self.mask)
    }
}
