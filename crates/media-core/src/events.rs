//! Per-session notification channel.
//!
//! Every session instance owns its own channel and subscriber; there is
//! no global dispatcher. Sends are unbounded and happen with no lock
//! held, so a slow or reentrant subscriber can never stall the session
//! that is notifying it.

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tracing::trace;

/// Events emitted by a media session toward its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSessionEvent {
    /// A new local description is ready to be offered
    MediaChanged {
        /// Serialized description text
        description: String,
    },

    /// The remote party's hold state changed
    RemoteHoldChanged {
        /// New observation
        on_hold: bool,
    },

    /// The live transport destination moved
    DestinationChanged {
        /// New remote media endpoint
        destination: SocketAddr,
    },

    /// One DTMF digit completed
    DigitCompleted {
        /// Telephone-event code of the digit
        event_code: u8,
    },

    /// The session ended
    Closed,
}

/// Event channel owned by one session instance
#[derive(Debug)]
pub(crate) struct EventChannel {
    tx: mpsc::UnboundedSender<MediaSessionEvent>,
    rx: Option<mpsc::UnboundedReceiver<MediaSessionEvent>>,
}

impl EventChannel {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx: Some(rx) }
    }

    /// Hand out the receiving end. Each session has exactly one
    /// subscriber, so later calls return `None`.
    pub(crate) fn subscribe(&mut self) -> Option<mpsc::UnboundedReceiver<MediaSessionEvent>> {
        self.rx.take()
    }

    /// Deliver one event. A subscriber that has gone away is not an
    /// error for the session.
    pub(crate) fn emit(&self, event: MediaSessionEvent) {
        trace!(?event, "emitting session event");
        let _ = self.tx.send(event);
    }
}
