//! In-band DTMF support.
//!
//! The receive side collapses the redundantly retransmitted event stream
//! into one completion per digit; the send side runs the timed burst for
//! an outgoing digit as a cancellable task.

pub mod detector;
pub mod sender;

pub use detector::DtmfDetector;
pub use sender::DtmfSendHandle;
