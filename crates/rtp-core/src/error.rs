use thiserror::Error;

/// Error type for RTP operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer too small
    #[error("Buffer too small for RTP packet: need {required} but have {available}")]
    BufferTooSmall {
        required: usize,
        available: usize,
    },
}
