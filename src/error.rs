use thiserror::Error;

use crate::Comms::Structs::MessageKind;

/// Errors surfaced by the broadcast channel.
///
/// Only corruption-class conditions and setup failures live here. A message
/// that cannot fit is rescheduled and a stale claim ticket is reported as
/// `RequestStatus::Gone`; neither is an error.
#[derive(Debug, Error)]
pub enum CommsError {
    /// The payload length in a header disagrees with the catalog for its kind.
    #[error("malformed header {word:#06x} at slot {slot}: {kind:?} carries {expected} payload words, header says {found}")]
    MalformedHeader {
        slot: usize,
        word: u16,
        kind: MessageKind,
        expected: usize,
        found: usize,
    },

    /// A message decoded inside the valid span runs past its end.
    #[error("span desync at slot {slot}: message needs {needed} slots, only {remaining} left in the valid span")]
    SpanDesync {
        slot: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid channel configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CommsError>;
