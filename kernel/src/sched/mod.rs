// Round-robin scheduler over the ready queue.
// BSD 3-Clause License
//
// The scheduler only tracks runnability; process state lives in the table.
// Every lifecycle transition calls exactly one hook here so a pid is never
// queued twice and never lingers after exit.

use alloc::collections::VecDeque;

use crate::process::Pid;

pub struct Scheduler {
    ready: VecDeque<Pid>,
    current: Option<Pid>,
    ticks: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self { ready: VecDeque::new(), current: None, ticks: 0 }
    }

    #[must_use]
    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Monotonic tick counter, advanced by the timer path. Nanosleep wake
    /// deadlines are expressed in these units.
    pub fn tick(&mut self) -> u64 {
        self.ticks += 1;
        self.ticks
    }

    #[must_use]
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    fn enqueue(&mut self, pid: Pid) {
        if self.current != Some(pid) && !self.ready.contains(&pid) {
            self.ready.push_back(pid);
        }
    }

    fn drop_pid(&mut self, pid: Pid) {
        self.ready.retain(|&p| p != pid);
        if self.current == Some(pid) {
            self.current = None;
        }
    }

    pub fn on_spawn(&mut self, pid: Pid) {
        self.enqueue(pid);
    }

    /// Parked in a blocking syscall; off the queue until woken.
    pub fn on_block(&mut self, pid: Pid) {
        self.drop_pid(pid);
    }

    pub fn on_wake(&mut self, pid: Pid) {
        self.enqueue(pid);
    }

    pub fn on_stop(&mut self, pid: Pid) {
        self.drop_pid(pid);
    }

    pub fn on_continue(&mut self, pid: Pid) {
        self.enqueue(pid);
    }

    pub fn on_exit(&mut self, pid: Pid) {
        self.drop_pid(pid);
    }

    /// Pick the next process: round robin, the outgoing current goes to
    /// the back of the queue.
    pub fn schedule(&mut self) -> Option<Pid> {
        if let Some(prev) = self.current.take() {
            self.ready.push_back(prev);
        }
        self.current = self.ready.pop_front();
        self.current
    }

    /// Force a specific process onto the CPU (test harness entry).
    pub fn run_now(&mut self, pid: Pid) {
        if let Some(prev) = self.current.take() {
            self.ready.push_back(prev);
        }
        self.ready.retain(|&p| p != pid);
        self.current = Some(pid);
    }
}
