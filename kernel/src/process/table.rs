// Process table: fixed-capacity arena of PCBs keyed by pid.
// BSD 3-Clause License

use alloc::vec::Vec;

use super::types::{Pid, Process};
use crate::error::Error;

/// Pids wrap back to this value once the counter tops out, skipping any
/// that are still in use.
const PID_WRAP: Pid = 2;
const PID_MAX: Pid = 32_768;

pub struct ProcessTable {
    slots: Vec<Option<Process>>,
    next_pid: Pid,
}

impl ProcessTable {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            next_pid: 1,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    /// Next unused pid. Monotonic until `PID_MAX`, then wraps and skips
    /// live pids.
    pub fn alloc_pid(&mut self) -> Pid {
        loop {
            let pid = self.next_pid;
            self.next_pid = if pid >= PID_MAX { PID_WRAP } else { pid + 1 };
            if self.get(pid).is_none() {
                return pid;
            }
        }
    }

    /// Place a PCB in a free slot. Fails when the table is full.
    pub fn insert(&mut self, process: Process) -> Result<(), Error> {
        debug_assert!(self.get(process.pid).is_none(), "duplicate pid");
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(Error::TryAgain)?;
        *slot = Some(process);
        Ok(())
    }

    pub fn remove(&mut self, pid: Pid) -> Option<Process> {
        self.slots
            .iter_mut()
            .find(|s| s.as_ref().is_some_and(|p| p.pid == pid))
            .and_then(Option::take)
    }

    #[must_use]
    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.slots
            .iter()
            .filter_map(Option::as_ref)
            .find(|p| p.pid == pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.slots
            .iter_mut()
            .filter_map(Option::as_mut)
            .find(|p| p.pid == pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Pids snapshot, for walks that mutate the table as they go.
    #[must_use]
    pub fn pids(&self) -> Vec<Pid> {
        self.iter().map(|p| p.pid).collect()
    }

    pub fn children_of(&self, parent: Pid) -> impl Iterator<Item = &Process> {
        self.iter().filter(move |p| p.parent == parent)
    }

    #[must_use]
    pub fn has_children(&self, parent: Pid) -> bool {
        self.children_of(parent).next().is_some()
    }
}
