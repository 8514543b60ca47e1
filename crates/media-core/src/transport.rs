//! Seam to the packet-transport collaborator.
//!
//! The transport owns the sockets, the per-packet sequence and timestamp
//! bookkeeping for audio, and the receive loop that feeds decoded packets
//! back into [`crate::negotiation::MediaNegotiator::process_packet`] in
//! arrival order.

use std::net::SocketAddr;

use bytes::Bytes;
use voxip_rtp_core::RtpPacket;

use crate::sdp::SessionDescription;
use crate::Result;

/// Contract the packet transport fulfils for the negotiator and the DTMF
/// transmitter.
///
/// None of these calls may block: they run on the control path and inside
/// the digit-transmit loop. A socket-backed implementation is expected to
/// queue internally.
pub trait MediaTransport: Send + Sync {
    /// A base description bound to the local address that is reachable
    /// toward `toward`. The unspecified endpoint asks for a wildcard
    /// binding.
    fn base_description(&self, toward: SocketAddr) -> Result<SessionDescription>;

    /// Adopt `description` as the remote half of the session.
    fn set_remote_description(&self, description: &SessionDescription) -> Result<()>;

    /// Queue one audio frame toward the current remote endpoint.
    fn send_audio(&self, payload: Bytes) -> Result<()>;

    /// Queue one already-built packet. Event bursts go out this way so
    /// their headers are under the sender's control.
    fn send_packet(&self, packet: &RtpPacket) -> Result<()>;
}
