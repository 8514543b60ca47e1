//! Media control core for the voxip project
//!
//! This crate owns the media-plane control logic that sits between the
//! signalling layer and the packet transport: hold-state negotiation and
//! offer/answer text production, tracking of the live remote media
//! destination across renegotiations, and in-band DTMF detection and
//! transmission.
//!
//! The library is organized into a few modules:
//!
//! - `sdp`: the slice of a session description this crate reads and writes
//! - `transport`: the seam to the packet-transport collaborator
//! - `events`: the per-session notification channel
//! - `dtmf`: telephone-event debouncing and transmission
//! - `negotiation`: the per-call-leg media negotiator

mod error;

// Main modules
pub mod dtmf;
pub mod events;
pub mod negotiation;
pub mod sdp;
pub mod transport;

// Re-export core types
pub use error::Error;

pub use dtmf::DtmfDetector;
pub use events::MediaSessionEvent;
pub use negotiation::{MediaNegotiator, MediaSessionConfig, MediaSessionId};
pub use sdp::{
    AudioDescription, DescriptionCodec, MediaDirection, SessionDescription, UNSPECIFIED_ENDPOINT,
};
pub use transport::MediaTransport;

/// Result type for media control operations
pub type Result<T> = std::result::Result<T, Error>;

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::{
        AudioDescription, DescriptionCodec, Error, MediaDirection, MediaNegotiator,
        MediaSessionConfig, MediaSessionEvent, MediaSessionId, MediaTransport, Result,
        SessionDescription, UNSPECIFIED_ENDPOINT,
    };
}
