//! Receive-side debouncing of redundantly transmitted telephone events.

use tracing::trace;
use voxip_rtp_core::TelephoneEvent;

/// Collapses the repeated packets of one telephone event into a single
/// completion, reported as early as possible.
///
/// The detector keeps the duration reported by the packet that opened the
/// digit in progress, or nothing while the stream is idle. Completion is
/// reported on the first packet observed for a digit, before the digit
/// has actually ended, trading strict correctness for low latency: a
/// digit that is cut off mid-burst has already been reported. When the
/// first packet of a digit is lost, the first repeat that does arrive
/// while the stream is idle triggers the report instead.
///
/// No timeout runs here. If every end-of-event packet of a digit is lost,
/// the detector stays on that digit and the next one goes unseen until
/// [`DtmfDetector::reset`] is called (in practice, at session teardown).
/// Only one digit is modeled per stream at a time; overlapping events are
/// not supported.
#[derive(Debug, Default)]
pub struct DtmfDetector {
    /// Duration carried by the packet that opened the digit in progress;
    /// `None` while the stream is idle.
    tracked_duration: Option<u16>,
}

impl DtmfDetector {
    /// Create an idle detector
    pub fn new() -> Self {
        Self {
            tracked_duration: None,
        }
    }

    /// Feed one decoded event, in arrival order. Returns the event code
    /// exactly once per digit, on the first packet observed for it.
    pub fn process(&mut self, event: &TelephoneEvent) -> Option<u8> {
        if event.end_of_event {
            // The next non-terminal packet opens a new digit.
            trace!(code = event.event_code, "telephone event closed");
            self.tracked_duration = None;
            return None;
        }

        if self.tracked_duration.is_none() {
            trace!(
                code = event.event_code,
                duration = event.duration,
                "digit detected"
            );
            self.tracked_duration = Some(event.duration);
            return Some(event.event_code);
        }

        // Digit in progress: further packets only restate it.
        None
    }

    /// Whether a digit is currently in progress
    pub fn in_progress(&self) -> bool {
        self.tracked_duration.is_some()
    }

    /// Forget any digit in progress (stream reset or session teardown)
    pub fn reset(&mut self) {
        self.tracked_duration = None;
    }
}
