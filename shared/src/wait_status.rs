// Packed wait-status word shared between the kernel and the libc macros.
// BSD 3-Clause License
//
// Layout (self-consistent, not required to match any other libc bit for bit):
//   exited:    (code & 0xff) << 8
//   signaled:  termsig in the low 7 bits (1..=0x7e)
//   stopped:   0x7f | (stopsig << 8)
//   continued: 0xffff

/// Status word for a normal exit with the given code.
#[inline]
#[must_use]
pub const fn w_make_exited(code: i32) -> i32 {
    (code & 0xff) << 8
}

/// Status word for termination by signal.
#[inline]
#[must_use]
pub const fn w_make_signaled(sig: i32) -> i32 {
    sig & 0x7f
}

/// Status word for a job-control stop.
#[inline]
#[must_use]
pub const fn w_make_stopped(sig: i32) -> i32 {
    0x7f | ((sig & 0xff) << 8)
}

/// Status word for a SIGCONT resume.
pub const W_CONTINUED: i32 = 0xffff;

#[inline]
#[must_use]
pub const fn w_ifexited(status: i32) -> bool {
    status & 0x7f == 0
}

#[inline]
#[must_use]
pub const fn w_exitstatus(status: i32) -> i32 {
    (status >> 8) & 0xff
}

#[inline]
#[must_use]
pub const fn w_ifsignaled(status: i32) -> bool {
    let low = status & 0x7f;
    low != 0 && low != 0x7f
}

#[inline]
#[must_use]
pub const fn w_termsig(status: i32) -> i32 {
    status & 0x7f
}

#[inline]
#[must_use]
pub const fn w_ifstopped(status: i32) -> bool {
    status & 0xff == 0x7f
}

#[inline]
#[must_use]
pub const fn w_stopsig(status: i32) -> i32 {
    (status >> 8) & 0xff
}

#[inline]
#[must_use]
pub const fn w_ifcontinued(status: i32) -> bool {
    status == W_CONTINUED
}

// Wait options (waitpid/wait3/wait4).
pub const WNOHANG: u32 = 1;
pub const WUNTRACED: u32 = 2;
pub const WCONTINUED: u32 = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_word_roundtrips() {
        for code in [0, 1, 31, 42, 255] {
            let s = w_make_exited(code);
            assert!(w_ifexited(s));
            assert!(!w_ifsignaled(s));
            assert!(!w_ifstopped(s));
            assert!(!w_ifcontinued(s));
            assert_eq!(w_exitstatus(s), code);
        }
    }

    #[test]
    fn signal_word_roundtrips() {
        for sig in 1..=31 {
            let s = w_make_signaled(sig);
            assert!(w_ifsignaled(s));
            assert!(!w_ifexited(s));
            assert!(!w_ifstopped(s));
            assert_eq!(w_termsig(s), sig);
        }
    }

    #[test]
    fn stop_word_roundtrips() {
        for sig in [17, 19, 20, 21, 22] {
            let s = w_make_stopped(sig);
            assert!(w_ifstopped(s));
            assert!(!w_ifexited(s));
            assert!(!w_ifsignaled(s));
            assert!(!w_ifcontinued(s));
            assert_eq!(w_stopsig(s), sig);
        }
    }

    #[test]
    fn continue_word_is_distinct() {
        let s = W_CONTINUED;
        assert!(w_ifcontinued(s));
        assert!(!w_ifexited(s));
        assert!(!w_ifsignaled(s));
        assert!(!w_ifstopped(s));
    }
}
