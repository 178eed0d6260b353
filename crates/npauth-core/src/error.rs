//! Error types for ticket encoding

use thiserror::Error;

/// Result type alias for ticket codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ticket codec error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Caller supplied an argument outside the accepted range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No online identity is configured
    #[error("configuration missing: {0}")]
    ConfigurationMissing(&'static str),

    /// Destination or source buffer too small
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    /// Param type code not in the known set
    #[error("unknown param type: 0x{0:04x}")]
    UnknownParamType(u16),

    /// Section type code not in the known set
    #[error("unknown section type: 0x{0:04x}")]
    UnknownSectionType(u16),

    /// A param declares more payload than the section holds
    #[error("truncated param at offset {offset}: need {needed} bytes, {remaining} remain")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
}
