//! Protocol errors

/// Errors decoding control-surface messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Payload is not valid JSON or does not match any command
    Json,
    /// Schedule payload is valid JSON but not a sequence
    NotASequence,
}
