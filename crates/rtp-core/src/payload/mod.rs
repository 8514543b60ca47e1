//! Payload-format codecs carried inside RTP packets.
//!
//! Audio codecs themselves live outside this crate; what belongs here is
//! the in-band signalling payload that shares the RTP stream with them.

pub mod telephone_event;

pub use telephone_event::{TelephoneEvent, TELEPHONE_EVENT_PAYLOAD_SIZE};
