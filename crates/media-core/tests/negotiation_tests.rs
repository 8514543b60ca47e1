//! Integration tests for the media negotiator: hold-state derivation,
//! remote-hold observation, destination tracking, and DTMF routing, driven
//! through stand-in transport and description collaborators.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc::UnboundedReceiver;

use voxip_media_core::{
    AudioDescription, DescriptionCodec, Error, MediaDirection, MediaNegotiator,
    MediaSessionConfig, MediaSessionEvent, MediaTransport, Result, SessionDescription,
    UNSPECIFIED_ENDPOINT,
};
use voxip_rtp_core::{RtpPacket, TelephoneEvent};

/// Line-based description text: `audio <endpoint> [<stream-status>]`.
struct TextCodec;

impl DescriptionCodec for TextCodec {
    fn parse(&self, text: &str) -> Result<SessionDescription> {
        let mut description = SessionDescription::default();
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("audio") => {
                    let endpoint = parts
                        .next()
                        .ok_or_else(|| Error::DescriptionParse("missing audio endpoint".into()))?
                        .parse::<SocketAddr>()
                        .map_err(|e| Error::DescriptionParse(e.to_string()))?;
                    let mut audio = AudioDescription::new(endpoint);
                    audio.direction = parts.next().map(|d| d.parse()).transpose()?;
                    description.audio = Some(audio);
                }
                Some(other) => {
                    return Err(Error::DescriptionParse(format!("unknown line: {}", other)))
                }
                None => {}
            }
        }
        Ok(description)
    }

    fn serialize(&self, description: &SessionDescription) -> String {
        match &description.audio {
            Some(audio) => match audio.direction {
                Some(direction) => format!("audio {} {}", audio.connection, direction),
                None => format!("audio {}", audio.connection),
            },
            None => String::new(),
        }
    }
}

/// Records every collaborator call the negotiator makes.
struct FakeTransport {
    local: SocketAddr,
    base_calls: Mutex<Vec<SocketAddr>>,
    remote_calls: Mutex<Vec<SessionDescription>>,
    sent: Mutex<Vec<RtpPacket>>,
}

impl FakeTransport {
    fn new() -> Self {
        Self {
            local: "198.51.100.7:6000".parse().unwrap(),
            base_calls: Mutex::new(Vec::new()),
            remote_calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn base_calls(&self) -> Vec<SocketAddr> {
        self.base_calls.lock().unwrap().clone()
    }

    fn remote_call_count(&self) -> usize {
        self.remote_calls.lock().unwrap().len()
    }

    fn sent(&self) -> Vec<RtpPacket> {
        self.sent.lock().unwrap().clone()
    }
}

impl MediaTransport for FakeTransport {
    fn base_description(&self, toward: SocketAddr) -> Result<SessionDescription> {
        self.base_calls.lock().unwrap().push(toward);
        Ok(SessionDescription {
            audio: Some(AudioDescription::new(self.local)),
        })
    }

    fn set_remote_description(&self, description: &SessionDescription) -> Result<()> {
        self.remote_calls.lock().unwrap().push(description.clone());
        Ok(())
    }

    fn send_audio(&self, _payload: Bytes) -> Result<()> {
        Ok(())
    }

    fn send_packet(&self, packet: &RtpPacket) -> Result<()> {
        self.sent.lock().unwrap().push(packet.clone());
        Ok(())
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn make_negotiator_with(
    config: MediaSessionConfig,
) -> (
    MediaNegotiator,
    UnboundedReceiver<MediaSessionEvent>,
    Arc<FakeTransport>,
) {
    init_logging();
    let transport = Arc::new(FakeTransport::new());
    let mut negotiator = MediaNegotiator::new(config, transport.clone(), Arc::new(TextCodec));
    let events = negotiator.subscribe().unwrap();
    (negotiator, events, transport)
}

fn make_negotiator() -> (
    MediaNegotiator,
    UnboundedReceiver<MediaSessionEvent>,
    Arc<FakeTransport>,
) {
    make_negotiator_with(MediaSessionConfig::default())
}

fn drain(events: &mut UnboundedReceiver<MediaSessionEvent>) -> Vec<MediaSessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn event_packet(payload_type: u8, seq: u16, code: u8, end: bool, duration: u16) -> RtpPacket {
    let event = TelephoneEvent::new(code, end, 10, duration);
    RtpPacket::new_with_payload(
        payload_type,
        seq,
        0,
        0xabc,
        Bytes::copy_from_slice(&event.encode()),
    )
}

#[test]
fn offer_direction_follows_hold_table() {
    // local=false, remote=false
    let (negotiator, _events, _transport) = make_negotiator();
    assert!(negotiator.create_offer(None).unwrap().ends_with("sendrecv"));
    assert_eq!(negotiator.direction(), MediaDirection::SendRecv);

    // local=true, remote=false
    let (mut negotiator, _events, _transport) = make_negotiator();
    negotiator.hold().unwrap();
    assert!(negotiator.create_offer(None).unwrap().ends_with("sendonly"));

    // local=false, remote=true
    let (mut negotiator, _events, _transport) = make_negotiator();
    negotiator
        .apply_remote_offer("audio 192.0.2.9:5004 sendonly")
        .unwrap();
    assert!(negotiator.create_offer(None).unwrap().ends_with("recvonly"));

    // local=true, remote=true
    let (mut negotiator, _events, _transport) = make_negotiator();
    negotiator.hold().unwrap();
    negotiator
        .apply_remote_offer("audio 192.0.2.9:5004 sendonly")
        .unwrap();
    assert!(negotiator.create_offer(None).unwrap().ends_with("inactive"));
    assert_eq!(negotiator.direction(), MediaDirection::Inactive);
}

#[test]
fn create_offer_does_not_touch_hold_state() {
    let (mut negotiator, mut events, _transport) = make_negotiator();
    negotiator
        .apply_remote_offer("audio 192.0.2.9:5004 sendonly")
        .unwrap();
    drain(&mut events);

    for _ in 0..3 {
        negotiator.create_offer(None).unwrap();
    }
    assert!(!negotiator.is_on_hold());
    assert!(negotiator.is_remote_on_hold());
    assert!(drain(&mut events).is_empty());
}

#[test]
fn remote_hold_is_set_and_cleared_by_the_two_statuses() {
    let (mut negotiator, mut events, _transport) = make_negotiator();
    assert!(!negotiator.is_remote_on_hold());

    negotiator
        .apply_remote_offer("audio 192.0.2.9:5004 sendonly")
        .unwrap();
    assert!(negotiator.is_remote_on_hold());
    let observed = drain(&mut events);
    assert!(observed.contains(&MediaSessionEvent::RemoteHoldChanged { on_hold: true }));

    negotiator
        .apply_remote_answer("audio 192.0.2.9:5004 sendrecv")
        .unwrap();
    assert!(!negotiator.is_remote_on_hold());
    let observed = drain(&mut events);
    assert!(observed.contains(&MediaSessionEvent::RemoteHoldChanged { on_hold: false }));

    // sendrecv while already off hold is not a transition.
    negotiator
        .apply_remote_answer("audio 192.0.2.9:5004 sendrecv")
        .unwrap();
    let observed = drain(&mut events);
    assert!(!observed
        .iter()
        .any(|e| matches!(e, MediaSessionEvent::RemoteHoldChanged { .. })));
}

#[test]
fn other_statuses_leave_remote_hold_alone() {
    let (mut negotiator, mut events, _transport) = make_negotiator();

    // From false: recvonly, inactive and a missing attribute say nothing.
    for text in [
        "audio 192.0.2.9:5004 recvonly",
        "audio 192.0.2.9:5004 inactive",
        "audio 192.0.2.9:5004",
    ] {
        negotiator.apply_remote_offer(text).unwrap();
        assert!(!negotiator.is_remote_on_hold());
    }

    // From true as well.
    negotiator
        .apply_remote_offer("audio 192.0.2.9:5004 sendonly")
        .unwrap();
    drain(&mut events);
    for text in [
        "audio 192.0.2.9:5004 recvonly",
        "audio 192.0.2.9:5004 inactive",
        "audio 192.0.2.9:5004",
    ] {
        negotiator.apply_remote_offer(text).unwrap();
        assert!(negotiator.is_remote_on_hold());
    }
    assert!(!drain(&mut events)
        .iter()
        .any(|e| matches!(e, MediaSessionEvent::RemoteHoldChanged { .. })));
}

#[test]
fn destination_tracking_across_renegotiations() {
    let (mut negotiator, mut events, transport) = make_negotiator();

    // Nothing known yet: queries yield the sentinel and the base
    // description is requested toward it.
    assert_eq!(negotiator.destination(), UNSPECIFIED_ENDPOINT);
    negotiator.create_offer(None).unwrap();
    assert_eq!(transport.base_calls(), vec![UNSPECIFIED_ENDPOINT]);

    // An explicit hint wins over everything.
    let hint: SocketAddr = "203.0.113.1:7000".parse().unwrap();
    negotiator.create_offer(Some(hint)).unwrap();
    assert_eq!(transport.base_calls()[1], hint);

    // A remote description resolves the endpoint: one transition event.
    let endpoint: SocketAddr = "192.0.2.9:5004".parse().unwrap();
    negotiator
        .apply_remote_offer("audio 192.0.2.9:5004 sendrecv")
        .unwrap();
    assert_eq!(negotiator.destination(), endpoint);
    let moved: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, MediaSessionEvent::DestinationChanged { .. }))
        .collect();
    assert_eq!(
        moved,
        vec![MediaSessionEvent::DestinationChanged {
            destination: endpoint
        }]
    );

    // Re-applying the same endpoint is not a move.
    negotiator
        .apply_remote_answer("audio 192.0.2.9:5004 sendrecv")
        .unwrap();
    assert!(drain(&mut events).is_empty());

    // Offers now resolve toward the known endpoint.
    negotiator.create_offer(None).unwrap();
    assert_eq!(*transport.base_calls().last().unwrap(), endpoint);

    // The remote re-anchors media elsewhere mid-call.
    let moved_to: SocketAddr = "192.0.2.50:5006".parse().unwrap();
    negotiator
        .apply_remote_offer("audio 192.0.2.50:5006 sendrecv")
        .unwrap();
    assert_eq!(negotiator.destination(), moved_to);
    assert_eq!(
        drain(&mut events),
        vec![MediaSessionEvent::DestinationChanged {
            destination: moved_to
        }]
    );
}

#[test]
fn hold_twice_keeps_flag_and_reemits() {
    let (mut negotiator, mut events, _transport) = make_negotiator();

    negotiator.hold().unwrap();
    negotiator.hold().unwrap();
    assert!(negotiator.is_on_hold());

    let changed: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            MediaSessionEvent::MediaChanged { description } => Some(description),
            _ => None,
        })
        .collect();
    assert_eq!(changed.len(), 2);
    assert!(changed.iter().all(|d| d.ends_with("sendonly")));

    negotiator.resume().unwrap();
    assert!(!negotiator.is_on_hold());
    let changed = drain(&mut events);
    assert_eq!(changed.len(), 1);
    assert!(matches!(
        &changed[0],
        MediaSessionEvent::MediaChanged { description } if description.ends_with("sendrecv")
    ));
}

#[test]
fn parse_failure_commits_nothing() {
    let (mut negotiator, mut events, transport) = make_negotiator();
    negotiator
        .apply_remote_offer("audio 192.0.2.9:5004 sendonly")
        .unwrap();
    drain(&mut events);
    let calls_before = transport.remote_call_count();

    let err = negotiator
        .apply_remote_answer("video 192.0.2.99:9000 sendrecv")
        .unwrap_err();
    assert!(matches!(err, Error::DescriptionParse(_)));

    // No flag, destination, collaborator call or event moved.
    assert!(negotiator.is_remote_on_hold());
    assert_eq!(negotiator.destination(), "192.0.2.9:5004".parse::<SocketAddr>().unwrap());
    assert_eq!(transport.remote_call_count(), calls_before);
    assert!(drain(&mut events).is_empty());

    // A bad endpoint inside an otherwise known line fails the same way.
    let err = negotiator.apply_remote_answer("audio nowhere").unwrap_err();
    assert!(matches!(err, Error::DescriptionParse(_)));
}

#[test]
fn digit_completion_fires_once_on_first_packet() {
    let (mut negotiator, mut events, _transport) = make_negotiator();
    let pt = MediaSessionConfig::default().event_payload_type;

    negotiator.process_packet(&event_packet(pt, 0, 5, false, 0));
    assert_eq!(
        drain(&mut events),
        vec![MediaSessionEvent::DigitCompleted { event_code: 5 }]
    );

    negotiator.process_packet(&event_packet(pt, 1, 5, false, 160));
    negotiator.process_packet(&event_packet(pt, 2, 5, false, 320));
    negotiator.process_packet(&event_packet(pt, 3, 5, false, 480));
    negotiator.process_packet(&event_packet(pt, 4, 5, true, 480));
    assert!(drain(&mut events).is_empty());

    // The stream is idle again: the next digit reports normally.
    negotiator.process_packet(&event_packet(pt, 5, 8, false, 0));
    assert_eq!(
        drain(&mut events),
        vec![MediaSessionEvent::DigitCompleted { event_code: 8 }]
    );
}

#[test]
fn non_event_payload_types_are_ignored() {
    let (mut negotiator, mut events, _transport) = make_negotiator();

    // Audio payload type: not ours, even with event-shaped bytes.
    negotiator.process_packet(&event_packet(0, 0, 5, false, 0));
    // Event payload type but a truncated payload: dropped.
    let mut short = event_packet(101, 1, 5, false, 0);
    short.payload = Bytes::from_static(&[0x05, 0x0a]);
    negotiator.process_packet(&short);

    assert!(drain(&mut events).is_empty());
}

#[test]
fn close_emits_and_resets_the_detector() {
    let (mut negotiator, mut events, _transport) = make_negotiator();
    let pt = MediaSessionConfig::default().event_payload_type;

    // A digit whose end packets never arrive jams the detector...
    negotiator.process_packet(&event_packet(pt, 0, 1, false, 160));
    negotiator.process_packet(&event_packet(pt, 1, 2, false, 160));
    assert_eq!(
        drain(&mut events),
        vec![MediaSessionEvent::DigitCompleted { event_code: 1 }]
    );

    // ...and teardown is the external reset.
    negotiator.close();
    assert_eq!(drain(&mut events), vec![MediaSessionEvent::Closed]);

    negotiator.process_packet(&event_packet(pt, 2, 2, false, 320));
    assert_eq!(
        drain(&mut events),
        vec![MediaSessionEvent::DigitCompleted { event_code: 2 }]
    );
}

#[tokio::test(start_paused = true)]
async fn send_digit_runs_a_full_burst() {
    let (mut negotiator, _events, transport) = make_negotiator();

    negotiator.send_digit(4);
    while transport.sent().len() < 8 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let sent = transport.sent();
    assert_eq!(sent.len(), 8);
    // First burst of the session starts at sequence 0.
    assert_eq!(sent[0].header.sequence_number, 0);
    assert!(sent[0].header.marker);
    let ssrc = sent[0].header.ssrc;
    assert!(sent.iter().all(|p| p.header.ssrc == ssrc));

    // The next digit picks up where the counter left off.
    negotiator.send_digit(7);
    while transport.sent().len() < 16 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(transport.sent()[8].header.sequence_number, 8);
}

#[tokio::test(start_paused = true)]
async fn cancel_digit_stops_the_burst() {
    // A digit long enough that the burst could only end by cancellation.
    let mut config = MediaSessionConfig::default();
    config.digit_duration = u16::MAX;
    let (mut negotiator, _events, transport) = make_negotiator_with(config);

    negotiator.send_digit(4);
    while transport.sent().len() < 3 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    negotiator.cancel_digit();

    let seen = transport.sent().len();
    tokio::time::sleep(std::time::Duration::from_secs(10)).await;
    // No further repeats once cancelled; whatever went out is complete.
    assert_eq!(transport.sent().len(), seen);
    assert!(transport.sent().iter().all(|p| p.payload.len() == 4));
}
