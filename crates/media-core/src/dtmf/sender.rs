//! Outgoing telephone-event transmission.
//!
//! One digit is one timed burst: update packets on a fixed cadence with a
//! growing duration field, then the end-of-event packet repeated for loss
//! resilience. The burst runs as its own task so the caller can cancel it;
//! because every transport hand-off is a single synchronous call, an abort
//! can only land between packets. The transport sees complete packets or
//! nothing, and a cancelled digit needs no cleanup.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use voxip_rtp_core::{RtpHeader, RtpPacket, RtpSequenceNumber, RtpSsrc, RtpTimestamp, TelephoneEvent};

use crate::transport::MediaTransport;

/// Wire and timing parameters for one digit transmission
#[derive(Debug, Clone, Copy)]
pub(crate) struct DigitTiming {
    /// Negotiated telephone-event payload type
    pub payload_type: u8,
    /// Sample clock for the event stream, Hz
    pub clock_rate: u32,
    /// Spacing between packets of the burst
    pub packet_interval: Duration,
    /// Total duration of the digit, in sample-clock units
    pub digit_duration: u16,
    /// Attenuation carried in the event payload
    pub volume: u8,
    /// How often the end-of-event packet is repeated
    pub end_retransmits: u32,
}

impl DigitTiming {
    /// Sample-clock units covered by one packet interval
    pub(crate) fn samples_per_packet(&self) -> u16 {
        let per_ms = self.clock_rate / 1000;
        (per_ms as u128 * self.packet_interval.as_millis()).max(1) as u16
    }

    fn update_packets(&self) -> u32 {
        let step = self.samples_per_packet() as u32;
        (self.digit_duration as u32).div_ceil(step).max(1)
    }

    /// Packets one full burst puts on the wire
    pub(crate) fn packet_count(&self) -> u32 {
        self.update_packets() + self.end_retransmits
    }
}

/// Handle to an in-flight digit transmission.
///
/// Dropping the handle leaves the burst running to completion; `cancel`
/// stops it between packets.
#[derive(Debug)]
pub struct DtmfSendHandle {
    handle: JoinHandle<()>,
}

impl DtmfSendHandle {
    /// Stop the burst immediately. Packets already handed to the
    /// transport are unaffected; no further ones go out.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the burst has finished (or was cancelled)
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawn the burst for one digit.
///
/// Sequence numbers run from `first_sequence`, one per packet; the caller
/// advances its own counter by [`DigitTiming::packet_count`] regardless of
/// cancellation (a gap on the wire is harmless). The RTP timestamp stays
/// fixed across the whole event; the first packet carries the marker.
pub(crate) fn spawn_digit(
    transport: Arc<dyn MediaTransport>,
    event_code: u8,
    ssrc: RtpSsrc,
    first_sequence: RtpSequenceNumber,
    timestamp: RtpTimestamp,
    timing: DigitTiming,
) -> DtmfSendHandle {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(timing.packet_interval);
        let step = timing.samples_per_packet();
        let updates = timing.update_packets();
        let mut sequence = first_sequence;
        let mut duration: u16 = 0;

        for i in 0..timing.packet_count() {
            ticker.tick().await;

            let (end_of_event, packet_duration) = if i < updates {
                duration = duration.saturating_add(step).min(timing.digit_duration);
                (false, duration)
            } else {
                (true, timing.digit_duration)
            };

            let event = TelephoneEvent::new(event_code, end_of_event, timing.volume, packet_duration);
            let mut header = RtpHeader::new(timing.payload_type, sequence, timestamp, ssrc);
            header.marker = i == 0;
            sequence = sequence.wrapping_add(1);

            let packet = RtpPacket::new(header, Bytes::copy_from_slice(&event.encode()));
            if let Err(e) = transport.send_packet(&packet) {
                warn!(code = event_code, error = %e, "transport refused event packet, stopping burst");
                return;
            }
        }

        debug!(code = event_code, "digit burst finished");
    });

    DtmfSendHandle { handle }
}
