use thiserror::Error;

/// Error type for media control operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The description collaborator rejected incoming text
    #[error("Failed to parse session description: {0}")]
    DescriptionParse(String),

    /// Transport collaborator failure
    #[error("Transport error: {0}")]
    Transport(String),
}
