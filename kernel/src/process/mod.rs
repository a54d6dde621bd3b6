// Process control blocks and the kernel process table.
// BSD 3-Clause License

pub mod table;
pub mod types;

pub use table::ProcessTable;
pub use types::{JobNote, ParkedCall, Pid, Process, ProcessState, INIT_PID};
