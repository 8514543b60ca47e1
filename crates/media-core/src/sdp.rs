//! Session-description slice used by the negotiator.
//!
//! The full SDP grammar lives in the signalling stack. This crate reads
//! and writes exactly one attribute (the audio stream-status) and one
//! endpoint (the audio connection address), so the model here carries
//! exactly those; everything else in a description passes through the
//! [`DescriptionCodec`] collaborator untouched.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::{Error, Result};

/// Sentinel endpoint meaning "not yet resolvable".
///
/// Destination resolution never fails; callers check for this value
/// instead of handling an error.
pub const UNSPECIFIED_ENDPOINT: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);

/// Media direction (stream-status) attribute of a media section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDirection {
    /// Send and receive media
    SendRecv,
    /// Send media only
    SendOnly,
    /// Receive media only
    RecvOnly,
    /// No media (inactive)
    Inactive,
}

impl Default for MediaDirection {
    fn default() -> Self {
        Self::SendRecv
    }
}

impl MediaDirection {
    /// The SDP attribute spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendRecv => "sendrecv",
            Self::SendOnly => "sendonly",
            Self::RecvOnly => "recvonly",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for MediaDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sendrecv" => Ok(Self::SendRecv),
            "sendonly" => Ok(Self::SendOnly),
            "recvonly" => Ok(Self::RecvOnly),
            "inactive" => Ok(Self::Inactive),
            other => Err(Error::DescriptionParse(format!(
                "unknown stream-status attribute: {}",
                other
            ))),
        }
    }
}

/// The audio media section slice of a description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDescription {
    /// Connection endpoint of the section; [`UNSPECIFIED_ENDPOINT`] when
    /// the description does not pin one down
    pub connection: SocketAddr,

    /// Stream-status attribute, when present
    pub direction: Option<MediaDirection>,
}

impl AudioDescription {
    /// Create an audio section with no stream-status attribute
    pub fn new(connection: SocketAddr) -> Self {
        Self {
            connection,
            direction: None,
        }
    }
}

/// The session-description slice exchanged with the collaborators
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionDescription {
    /// Audio media section, when the description carries one
    pub audio: Option<AudioDescription>,
}

impl SessionDescription {
    /// Connection endpoint of the audio section, if any
    pub fn audio_endpoint(&self) -> Option<SocketAddr> {
        self.audio.as_ref().map(|a| a.connection)
    }

    /// Stream-status attribute of the audio section, if any
    pub fn audio_direction(&self) -> Option<MediaDirection> {
        self.audio.as_ref().and_then(|a| a.direction)
    }

    /// Set the audio stream-status attribute. A description without an
    /// audio section is left untouched.
    pub fn set_audio_direction(&mut self, direction: MediaDirection) {
        if let Some(audio) = &mut self.audio {
            audio.direction = Some(direction);
        }
    }
}

/// Parses and serializes description text on behalf of this crate.
///
/// Implemented by the SDP layer of the surrounding stack; this crate only
/// ever inspects the slice modeled by [`SessionDescription`].
pub trait DescriptionCodec: Send + Sync {
    /// Parse description text. The error is surfaced verbatim to whoever
    /// handed the text in.
    fn parse(&self, text: &str) -> Result<SessionDescription>;

    /// Serialize a description back to text.
    fn serialize(&self, description: &SessionDescription) -> String;
}
