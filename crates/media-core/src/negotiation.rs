//! Hold negotiation and offer/answer production for one call leg.
//!
//! A [`MediaNegotiator`] reconciles the two sides' hold intent into the
//! audio stream-status attribute of outgoing offers, observes the remote
//! side's intent in incoming descriptions, and tracks the live media
//! destination as it moves across renegotiations. It also routes inbound
//! telephone-event packets into the digit detector and drives outgoing
//! digit bursts.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;
use voxip_rtp_core::{
    generate_ssrc, RtpPacket, RtpSequenceNumber, RtpSsrc, RtpTimestamp, TelephoneEvent,
    TELEPHONE_EVENT_PAYLOAD_SIZE,
};

use crate::dtmf::detector::DtmfDetector;
use crate::dtmf::sender::{spawn_digit, DigitTiming, DtmfSendHandle};
use crate::events::{EventChannel, MediaSessionEvent};
use crate::sdp::{DescriptionCodec, MediaDirection, SessionDescription, UNSPECIFIED_ENDPOINT};
use crate::transport::MediaTransport;
use crate::Result;

/// Unique identifier for a media session (one call leg)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaSessionId(Uuid);

impl MediaSessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MediaSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for one media session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSessionConfig {
    /// Negotiated telephone-event payload type
    pub event_payload_type: u8,

    /// Sample clock for telephone events, Hz
    pub event_clock_rate: u32,

    /// Spacing between the packets of a digit burst, milliseconds
    pub event_packet_interval_ms: u64,

    /// Duration of one transmitted digit, in sample-clock units
    pub digit_duration: u16,

    /// Attenuation carried in transmitted digits, dB below reference
    pub digit_volume: u8,

    /// How often the end-of-event packet is repeated per digit
    pub end_retransmits: u32,
}

impl Default for MediaSessionConfig {
    fn default() -> Self {
        Self {
            event_payload_type: 101,
            event_clock_rate: 8000,
            event_packet_interval_ms: 20,
            digit_duration: 800,
            digit_volume: 10,
            end_retransmits: 3,
        }
    }
}

/// Media negotiator for one call leg.
///
/// Owns the two hold flags and the last known remote endpoint, derives
/// the outgoing stream-status from the flags on demand, and produces and
/// consumes description text through the transport and description
/// collaborators.
///
/// The negotiator is not synchronized internally: one logical owner must
/// drive all control calls, the inbound packet path included. Every
/// operation is a synchronous computation over in-memory state; the only
/// asynchronous pieces are event delivery to the subscriber and the digit
/// burst task, so [`MediaNegotiator::send_digit`] must run inside a tokio
/// runtime.
pub struct MediaNegotiator {
    id: MediaSessionId,
    config: MediaSessionConfig,
    transport: Arc<dyn MediaTransport>,
    codec: Arc<dyn DescriptionCodec>,

    local_on_hold: bool,
    remote_on_hold: bool,

    /// Last known remote media endpoint; the unspecified sentinel until a
    /// remote description resolves one
    destination: SocketAddr,

    /// Remote description most recently applied
    remote_description: Option<SessionDescription>,

    events: EventChannel,
    detector: DtmfDetector,

    /// Outbound event-stream identity, drawn once per session
    ssrc: RtpSsrc,
    /// Next outbound sequence number. Streams deliberately start at 0,
    /// not at a random offset.
    sequence: RtpSequenceNumber,
    /// Sample-clock position for the next outgoing event
    timestamp: RtpTimestamp,

    digit_task: Option<DtmfSendHandle>,
}

impl MediaNegotiator {
    /// Create a negotiator for a new call leg
    pub fn new(
        config: MediaSessionConfig,
        transport: Arc<dyn MediaTransport>,
        codec: Arc<dyn DescriptionCodec>,
    ) -> Self {
        Self {
            id: MediaSessionId::new(),
            config,
            transport,
            codec,
            local_on_hold: false,
            remote_on_hold: false,
            destination: UNSPECIFIED_ENDPOINT,
            remote_description: None,
            events: EventChannel::new(),
            detector: DtmfDetector::new(),
            ssrc: generate_ssrc(),
            sequence: 0,
            timestamp: 0,
            digit_task: None,
        }
    }

    /// Session identifier
    pub fn id(&self) -> MediaSessionId {
        self.id
    }

    /// Take the event stream for this session. Each session has exactly
    /// one subscriber; later calls return `None`.
    pub fn subscribe(&mut self) -> Option<mpsc::UnboundedReceiver<MediaSessionEvent>> {
        self.events.subscribe()
    }

    /// Whether this side has put the leg on hold
    pub fn is_on_hold(&self) -> bool {
        self.local_on_hold
    }

    /// Whether the remote side has been observed holding the leg
    pub fn is_remote_on_hold(&self) -> bool {
        self.remote_on_hold
    }

    /// Last known remote media endpoint. Yields the unspecified sentinel
    /// while nothing has resolved one yet; callers check for it rather
    /// than treating it as an error.
    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Stream-status derived from the two hold flags
    pub fn direction(&self) -> MediaDirection {
        match (self.local_on_hold, self.remote_on_hold) {
            (false, false) => MediaDirection::SendRecv,
            (true, false) => MediaDirection::SendOnly,
            (false, true) => MediaDirection::RecvOnly,
            (true, true) => MediaDirection::Inactive,
        }
    }

    fn resolve_destination(&self, hint: Option<SocketAddr>) -> SocketAddr {
        if let Some(hint) = hint {
            return hint;
        }
        self.remote_description
            .as_ref()
            .and_then(|d| d.audio_endpoint())
            .unwrap_or(UNSPECIFIED_ENDPOINT)
    }

    /// Produce offer text for the current hold state.
    ///
    /// The destination is the explicit hint when given, else the endpoint
    /// of the known remote description, else the unspecified sentinel.
    /// Repeatable at will: hold flags, tracked destination and remote
    /// description are all left untouched.
    pub fn create_offer(&self, destination_hint: Option<SocketAddr>) -> Result<String> {
        let toward = self.resolve_destination(destination_hint);
        let mut description = self.transport.base_description(toward)?;
        description.set_audio_direction(self.direction());
        debug!(
            session = %self.id,
            direction = %self.direction(),
            %toward,
            "created offer"
        );
        Ok(self.codec.serialize(&description))
    }

    /// Apply a remote offer. See [`MediaNegotiator::apply_remote_answer`];
    /// the two differ only in which half of the exchange the signalling
    /// layer is reporting.
    pub fn apply_remote_offer(&mut self, text: &str) -> Result<()> {
        self.apply_remote_description(text)
    }

    /// Apply a remote answer to an offer this side produced earlier.
    ///
    /// Parses the text through the description collaborator (a parse
    /// failure propagates and commits nothing), then adopts it as the
    /// remote description, re-resolves the media destination (emitting
    /// [`MediaSessionEvent::DestinationChanged`] when it moved), and
    /// updates the remote hold observation from the audio stream-status.
    pub fn apply_remote_answer(&mut self, text: &str) -> Result<()> {
        self.apply_remote_description(text)
    }

    fn apply_remote_description(&mut self, text: &str) -> Result<()> {
        // Nothing below may commit before the parse has succeeded.
        let description = self.codec.parse(text)?;
        self.transport.set_remote_description(&description)?;

        if let Some(endpoint) = description.audio_endpoint() {
            if endpoint != self.destination {
                debug!(session = %self.id, %endpoint, "media destination moved");
                self.destination = endpoint;
                self.events.emit(MediaSessionEvent::DestinationChanged {
                    destination: endpoint,
                });
            }
        }

        // Only these two observations say anything about the remote
        // party's hold intent; recvonly, inactive and a missing attribute
        // leave the flag alone.
        match description.audio_direction() {
            Some(MediaDirection::SendOnly) => {
                if !self.remote_on_hold {
                    debug!(session = %self.id, "remote went on hold");
                    self.remote_on_hold = true;
                    self.events
                        .emit(MediaSessionEvent::RemoteHoldChanged { on_hold: true });
                }
            }
            Some(MediaDirection::SendRecv) => {
                if self.remote_on_hold {
                    debug!(session = %self.id, "remote came off hold");
                    self.remote_on_hold = false;
                    self.events
                        .emit(MediaSessionEvent::RemoteHoldChanged { on_hold: false });
                }
            }
            _ => {}
        }

        self.remote_description = Some(description);
        Ok(())
    }

    /// Put the leg on hold and push out a re-offer.
    ///
    /// Fire-and-forget: the new offer text travels on
    /// [`MediaSessionEvent::MediaChanged`]; the signalling layer sends it
    /// and later reports the answer back through
    /// [`MediaNegotiator::apply_remote_answer`]. Calling this while
    /// already on hold re-derives and re-emits the offer.
    pub fn hold(&mut self) -> Result<()> {
        self.local_on_hold = true;
        self.reoffer()
    }

    /// Take the leg off hold and push out a re-offer
    pub fn resume(&mut self) -> Result<()> {
        self.local_on_hold = false;
        self.reoffer()
    }

    fn reoffer(&mut self) -> Result<()> {
        let description = self.create_offer(None)?;
        self.events
            .emit(MediaSessionEvent::MediaChanged { description });
        Ok(())
    }

    /// Route one inbound packet, in arrival order.
    ///
    /// Packets on the negotiated event payload type feed the digit
    /// detector; everything else is audio and none of this crate's
    /// business. The stream is assumed ordered and deduplicated by the
    /// transport.
    pub fn process_packet(&mut self, packet: &RtpPacket) {
        if packet.header.payload_type != self.config.event_payload_type {
            return;
        }
        if packet.payload.len() < TELEPHONE_EVENT_PAYLOAD_SIZE {
            trace!(
                session = %self.id,
                len = packet.payload.len(),
                "event payload too short, dropping"
            );
            return;
        }

        let mut block = [0u8; TELEPHONE_EVENT_PAYLOAD_SIZE];
        block.copy_from_slice(&packet.payload[..TELEPHONE_EVENT_PAYLOAD_SIZE]);
        let event = TelephoneEvent::decode(&block);

        if let Some(event_code) = self.detector.process(&event) {
            debug!(session = %self.id, code = event_code, "digit completed");
            self.events
                .emit(MediaSessionEvent::DigitCompleted { event_code });
        }
    }

    /// Start transmitting one digit as a timed burst.
    ///
    /// One digit at a time: a burst still in flight is cut off first. The
    /// stream's sequence counter advances by the full burst length up
    /// front, so a cancelled burst leaves a harmless gap on the wire
    /// rather than reused numbers.
    pub fn send_digit(&mut self, event_code: u8) {
        if let Some(task) = self.digit_task.take() {
            task.cancel();
        }

        let timing = DigitTiming {
            payload_type: self.config.event_payload_type,
            clock_rate: self.config.event_clock_rate,
            packet_interval: std::time::Duration::from_millis(self.config.event_packet_interval_ms),
            digit_duration: self.config.digit_duration,
            volume: self.config.digit_volume,
            end_retransmits: self.config.end_retransmits,
        };

        debug!(session = %self.id, code = event_code, "starting digit burst");
        let handle = spawn_digit(
            Arc::clone(&self.transport),
            event_code,
            self.ssrc,
            self.sequence,
            self.timestamp,
            timing,
        );

        self.sequence = self.sequence.wrapping_add(timing.packet_count() as u16);
        self.timestamp = self.timestamp.wrapping_add(self.config.digit_duration as u32);
        self.digit_task = Some(handle);
    }

    /// Cancel any digit burst still in flight
    pub fn cancel_digit(&mut self) {
        if let Some(task) = self.digit_task.take() {
            task.cancel();
        }
    }

    /// End the session: stop any digit in flight, clear the detector, and
    /// tell the owner
    pub fn close(&mut self) {
        debug!(session = %self.id, "closing media session");
        self.cancel_digit();
        self.detector.reset();
        self.events.emit(MediaSessionEvent::Closed);
    }
}

impl fmt::Debug for MediaNegotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaNegotiator")
            .field("id", &self.id)
            .field("local_on_hold", &self.local_on_hold)
            .field("remote_on_hold", &self.remote_on_hold)
            .field("destination", &self.destination)
            .finish()
    }
}
