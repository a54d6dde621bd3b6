// Signal subsystem: numbering and dispositions, posting, and delivery.
// BSD 3-Clause License

pub mod delivery;
pub mod handlers;
pub mod types;

pub use delivery::post_signal;
pub use handlers::{deliver_pending, Delivered};
pub use types::{
    default_action, sig_name, DefaultAction, Disposition, SaFlags, SigAction, SigSet,
    SignalFrame, SIGNAL_COUNT,
};
