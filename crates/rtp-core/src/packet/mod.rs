//! RTP packet types
//!
//! The fixed-header codec lives in [`header`]; this module adds the
//! packet container that pairs a header with its payload bytes.

pub mod header;

pub use header::{RtpHeader, RTP_MIN_HEADER_SIZE, RTP_VERSION};

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::Result;

/// RTP packet implementation
#[derive(Clone, PartialEq, Eq)]
pub struct RtpPacket {
    /// RTP header
    pub header: RtpHeader,

    /// Payload data
    pub payload: Bytes,
}

impl RtpPacket {
    /// Create a new RTP packet
    pub fn new(header: RtpHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Create a new RTP packet with basic parameters
    pub fn new_with_payload(
        payload_type: u8,
        sequence_number: crate::RtpSequenceNumber,
        timestamp: crate::RtpTimestamp,
        ssrc: crate::RtpSsrc,
        payload: Bytes,
    ) -> Self {
        let header = RtpHeader::new(payload_type, sequence_number, timestamp, ssrc);
        Self { header, payload }
    }

    /// Get the serialized size of the packet in bytes
    pub fn size(&self) -> usize {
        RTP_MIN_HEADER_SIZE + self.payload.len()
    }

    /// Parse an RTP packet from bytes.
    ///
    /// Everything after the consumed header fields (including any CSRC
    /// words the header announced) is the payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut buf = Bytes::copy_from_slice(data);
        let header = RtpHeader::parse(&mut buf)?;
        Ok(Self {
            header,
            payload: buf,
        })
    }

    /// Serialize the packet to bytes
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.size());
        self.header.serialize(&mut buf);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

impl fmt::Debug for RtpPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RtpPacket")
            .field("header", &self.header)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
