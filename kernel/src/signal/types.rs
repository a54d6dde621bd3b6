// Signal numbering, sets, dispositions and the default-action table.
// BSD 3-Clause License

use bitflags::bitflags;

use crate::error::Error;

// ==== Signal numbers (1..=31) ====

pub const SIGHUP: i32 = 1;
pub const SIGINT: i32 = 2;
pub const SIGQUIT: i32 = 3;
pub const SIGILL: i32 = 4;
pub const SIGTRAP: i32 = 5;
pub const SIGABRT: i32 = 6;
pub const SIGBUS: i32 = 7;
pub const SIGFPE: i32 = 8;
pub const SIGKILL: i32 = 9;
pub const SIGUSR1: i32 = 10;
pub const SIGSEGV: i32 = 11;
pub const SIGUSR2: i32 = 12;
pub const SIGPIPE: i32 = 13;
pub const SIGALRM: i32 = 14;
pub const SIGTERM: i32 = 15;
pub const SIGSTKFLT: i32 = 16;
pub const SIGCHLD: i32 = 17;
pub const SIGCONT: i32 = 18;
pub const SIGSTOP: i32 = 19;
pub const SIGTSTP: i32 = 20;
pub const SIGTTIN: i32 = 21;
pub const SIGTTOU: i32 = 22;
pub const SIGURG: i32 = 23;
pub const SIGXCPU: i32 = 24;
pub const SIGXFSZ: i32 = 25;
pub const SIGVTALRM: i32 = 26;
pub const SIGPROF: i32 = 27;
pub const SIGWINCH: i32 = 28;
pub const SIGIO: i32 = 29;
pub const SIGPWR: i32 = 30;
pub const SIGSYS: i32 = 31;

/// Number of disposition slots; index 0 is unused.
pub const SIGNAL_COUNT: usize = 32;

/// True for the signals a process can actually receive.
#[inline]
#[must_use]
pub const fn is_valid_signal(sig: i32) -> bool {
    sig >= 1 && sig < SIGNAL_COUNT as i32
}

#[must_use]
pub const fn sig_name(sig: i32) -> &'static str {
    match sig {
        SIGHUP => "SIGHUP",
        SIGINT => "SIGINT",
        SIGQUIT => "SIGQUIT",
        SIGILL => "SIGILL",
        SIGTRAP => "SIGTRAP",
        SIGABRT => "SIGABRT",
        SIGBUS => "SIGBUS",
        SIGFPE => "SIGFPE",
        SIGKILL => "SIGKILL",
        SIGUSR1 => "SIGUSR1",
        SIGSEGV => "SIGSEGV",
        SIGUSR2 => "SIGUSR2",
        SIGPIPE => "SIGPIPE",
        SIGALRM => "SIGALRM",
        SIGTERM => "SIGTERM",
        SIGSTKFLT => "SIGSTKFLT",
        SIGCHLD => "SIGCHLD",
        SIGCONT => "SIGCONT",
        SIGSTOP => "SIGSTOP",
        SIGTSTP => "SIGTSTP",
        SIGTTIN => "SIGTTIN",
        SIGTTOU => "SIGTTOU",
        SIGURG => "SIGURG",
        SIGXCPU => "SIGXCPU",
        SIGXFSZ => "SIGXFSZ",
        SIGVTALRM => "SIGVTALRM",
        SIGPROF => "SIGPROF",
        SIGWINCH => "SIGWINCH",
        SIGIO => "SIGIO",
        SIGPWR => "SIGPWR",
        SIGSYS => "SIGSYS",
        _ => "SIG?",
    }
}

// ==== Signal sets ====

/// A set of signals, one bit per number. Bit 0 is never set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SigSet(u32);

impl SigSet {
    pub const EMPTY: SigSet = SigSet(0);

    /// Every valid signal.
    pub const FULL: SigSet = SigSet(!0u32 & !1);

    /// Build a set from a list of signal numbers (const contexts, tests).
    #[must_use]
    pub const fn of(sigs: &[i32]) -> SigSet {
        let mut bits = 0u32;
        let mut i = 0;
        while i < sigs.len() {
            bits |= 1 << sigs[i];
            i += 1;
        }
        SigSet(bits)
    }

    /// Add a signal. Invalid numbers leave the set untouched.
    pub fn add(&mut self, sig: i32) -> Result<(), Error> {
        if !is_valid_signal(sig) {
            return Err(Error::InvalidArgument);
        }
        self.0 |= 1 << sig;
        Ok(())
    }

    /// Remove a signal. Invalid numbers leave the set untouched.
    pub fn remove(&mut self, sig: i32) -> Result<(), Error> {
        if !is_valid_signal(sig) {
            return Err(Error::InvalidArgument);
        }
        self.0 &= !(1 << sig);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, sig: i32) -> bool {
        is_valid_signal(sig) && self.0 & (1 << sig) != 0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn union(self, other: SigSet) -> SigSet {
        SigSet(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersection(self, other: SigSet) -> SigSet {
        SigSet(self.0 & other.0)
    }

    #[must_use]
    pub const fn without(self, other: SigSet) -> SigSet {
        SigSet(self.0 & !other.0)
    }

    /// Lowest-numbered signal in the set, if any. Delivery order depends
    /// on this being lowest-first.
    #[must_use]
    pub const fn lowest(&self) -> Option<i32> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as i32)
        }
    }

    /// Signals in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        let bits = self.0;
        (1..SIGNAL_COUNT as i32).filter(move |s| bits & (1 << s) != 0)
    }

    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Rehydrate from a user-supplied word; bit 0 is silently dropped.
    #[must_use]
    pub const fn from_bits(bits: u32) -> SigSet {
        SigSet(bits & !1)
    }
}

// ==== Dispositions ====

/// What a process asked to happen on a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    #[default]
    Default,
    Ignore,
    /// User handler entry point.
    Handler(usize),
}

bitflags! {
    /// sigaction flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SaFlags: u32 {
        const NOCLDSTOP = 1 << 0;
        const RESTART   = 1 << 28;
        const NODEFER   = 1 << 30;
        const RESETHAND = 1 << 31;
    }
}

/// Registered handling for one signal number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SigAction {
    pub disposition: Disposition,
    /// Signals additionally blocked while the handler runs.
    pub mask: SigSet,
    pub flags: SaFlags,
}

/// Record pushed when a caught signal is delivered; sigreturn pops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalFrame {
    pub signo: i32,
    pub saved_mask: SigSet,
}

// ==== Default actions ====

/// What a signal does when the disposition is `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultAction {
    Terminate,
    Ignore,
    Stop,
    Continue,
}

#[must_use]
pub const fn default_action(sig: i32) -> DefaultAction {
    match sig {
        SIGCHLD | SIGURG | SIGWINCH => DefaultAction::Ignore,
        SIGSTOP | SIGTSTP | SIGTTIN | SIGTTOU => DefaultAction::Stop,
        SIGCONT => DefaultAction::Continue,
        _ => DefaultAction::Terminate,
    }
}

/// Signals whose pending state a stop cancels, and vice versa.
pub const STOP_SIGNALS: SigSet = SigSet::of(&[SIGSTOP, SIGTSTP, SIGTTIN, SIGTTOU]);

/// Signals that cannot be caught, blocked or ignored.
#[inline]
#[must_use]
pub const fn is_unblockable(sig: i32) -> bool {
    sig == SIGKILL || sig == SIGSTOP
}
