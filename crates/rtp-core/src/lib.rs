//! RTP core library for the voxip project
//!
//! This crate provides the wire-level building blocks of voxip's media
//! plane: RTP header and packet encoding/decoding, and the in-band
//! telephone-event (DTMF) payload codec.
//!
//! The library is organized into two modules:
//!
//! - `packet`: RTP header and packet definitions and processing
//! - `payload`: payload-format codecs carried inside RTP packets

mod error;

// Main modules
pub mod packet;
pub mod payload;

// Re-export core types
pub use error::Error;

// Re-export common types from the packet and payload modules
pub use packet::{RtpHeader, RtpPacket, RTP_MIN_HEADER_SIZE, RTP_VERSION};
pub use payload::{TelephoneEvent, TELEPHONE_EVENT_PAYLOAD_SIZE};

/// Typedef for RTP timestamp values
pub type RtpTimestamp = u32;

/// Typedef for RTP sequence numbers
pub type RtpSequenceNumber = u16;

/// Typedef for RTP synchronization source identifier
pub type RtpSsrc = u32;

/// Typedef for RTP contributing source identifier
pub type RtpCsrc = u32;

/// Result type for RTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Generate a synchronization source identifier for a new session.
///
/// The value is pseudo-random, not cryptographically strong: it only has
/// to stay collision-free among the streams of one session for that
/// session's lifetime. Outbound sequence numbers, by contrast, start at 0
/// rather than a random offset; that is deliberate, established behavior
/// of this stack.
pub fn generate_ssrc() -> RtpSsrc {
    rand::random()
}

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::{
        generate_ssrc, Error, Result, RtpCsrc, RtpHeader, RtpPacket, RtpSequenceNumber, RtpSsrc,
        RtpTimestamp, TelephoneEvent,
    };
}
