use std::fmt;

use super::schema::{CYCLIC_ROUND, KIND, PAYLOAD_LEN, PRIORITY};
use crate::error::{CommsError, Result};
use crate::Comms::Structs::MessageKind;

/// Rounds are stored modulo this cycle.
pub const ROUND_CYCLE: u32 = CYCLIC_ROUND.max() as u32 + 1;

pub const MAX_PRIORITY: u8 = PRIORITY.max() as u8;

/// Reduce an absolute round to what fits in a header.
#[inline]
pub fn to_cyclic_round(round: u32) -> u8 {
    (round % ROUND_CYCLE) as u8
}

/// Rounds elapsed from `sent` to `now`, both cyclic.
///
/// Only meaningful while the true gap is below one cycle; a message exactly
/// one cycle old reads as age 0.
#[inline]
pub fn cyclic_age(sent: u8, now: u8) -> u8 {
    ((now as u32 + ROUND_CYCLE - sent as u32) % ROUND_CYCLE) as u8
}

/// The one-word header in front of every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub priority: u8,
    pub kind: MessageKind,
    pub payload_len: u8,
    pub cyclic_round: u8,
}

impl Header {
    /// Header for a `kind` message sent on absolute round `round`. The payload
    /// length always comes from the catalog.
    pub fn new(priority: u8, kind: MessageKind, round: u32) -> Self {
        debug_assert!(priority <= MAX_PRIORITY, "priority {} out of range", priority);
        Self {
            priority: priority.min(MAX_PRIORITY),
            kind,
            payload_len: kind.payload_len() as u8,
            cyclic_round: to_cyclic_round(round),
        }
    }

    pub fn encode(&self) -> u16 {
        PRIORITY.put(self.priority as u16)
            | KIND.put(self.kind as u16)
            | PAYLOAD_LEN.put(self.payload_len as u16)
            | CYCLIC_ROUND.put(self.cyclic_round as u16)
    }

    /// Split a word into header fields without checking it against the catalog.
    pub fn from_bits(word: u16) -> Self {
        Self {
            priority: PRIORITY.get(word) as u8,
            kind: MessageKind::from_bits(KIND.get(word)),
            payload_len: PAYLOAD_LEN.get(word) as u8,
            cyclic_round: CYCLIC_ROUND.get(word) as u8,
        }
    }

    /// Decode the header word found at `slot`.
    ///
    /// Fails with [`CommsError::MalformedHeader`] when the payload length does
    /// not match the catalog, which means the word is not a header at all
    /// (garbage, or a payload word read out of step).
    pub fn decode(word: u16, slot: usize) -> Result<Self> {
        let header = Self::from_bits(word);
        let expected = header.kind.payload_len();
        if header.payload_len as usize != expected {
            return Err(CommsError::MalformedHeader {
                slot,
                word,
                kind: header.kind,
                expected,
                found: header.payload_len as usize,
            });
        }
        Ok(header)
    }

    /// Slots taken by the whole message, header included.
    #[inline]
    pub fn size(&self) -> usize {
        self.payload_len as usize + 1
    }

    /// Rounds since this header was written, as seen on absolute round `round`.
    pub fn age_at(&self, round: u32) -> u8 {
        cyclic_age(self.cyclic_round, to_cyclic_round(round))
    }

    pub fn is_from_round(&self, round: u32) -> bool {
        self.cyclic_round == to_cyclic_round(round)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Header{{pr={},kind={:?},len={},rnd={}}}",
            self.priority, self.kind, self.payload_len, self.cyclic_round
        )
    }
}
