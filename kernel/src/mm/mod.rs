// Memory management: physical frame allocator and per-process address spaces.
// BSD 3-Clause License

pub mod pmm;
pub mod vmm;

pub use pmm::{Frame, FrameAllocator, FrameRange, PAGE_SIZE};
pub use vmm::{Access, AddressSpace, Backing, FaultError, MapFlags, Prot};
