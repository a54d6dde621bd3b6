// Kernel error taxonomy and the errno mapping used by the dispatcher.
// BSD 3-Clause License

use larch_abi::errno;

/// Kernel-internal error. Every variant maps onto exactly one errno value;
/// the syscall dispatcher flattens these into the negative-return convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("no such process")]
    NoSuchProcess,
    #[error("no waitable children")]
    NoChildren,
    #[error("interrupted by signal")]
    Interrupted,
    #[error("out of physical memory")]
    OutOfMemory,
    #[error("bad address")]
    BadAddress,
    #[error("operation not permitted")]
    NotPermitted,
    #[error("no such file")]
    NotFound,
    #[error("bad file descriptor")]
    BadFileDescriptor,
    #[error("resource temporarily exhausted")]
    TryAgain,
    #[error("no controlling terminal")]
    NotATty,
    #[error("frame is not allocated")]
    FrameNotAllocated,
    #[error("not implemented")]
    Unimplemented,
}

impl Error {
    /// Negative errno value for the syscall return convention.
    #[must_use]
    pub const fn errno(self) -> isize {
        -match self {
            Error::InvalidArgument | Error::FrameNotAllocated => errno::EINVAL,
            Error::NoSuchProcess => errno::ESRCH,
            Error::NoChildren => errno::ECHILD,
            Error::Interrupted => errno::EINTR,
            Error::OutOfMemory => errno::ENOMEM,
            Error::BadAddress => errno::EFAULT,
            Error::NotPermitted => errno::EPERM,
            Error::NotFound => errno::ENOENT,
            Error::BadFileDescriptor => errno::EBADF,
            Error::TryAgain => errno::EAGAIN,
            Error::NotATty => errno::ENOTTY,
            Error::Unimplemented => errno::ENOSYS,
        }
    }
}
