// The closed message catalog and the values that carry messages in and out of the channel.

use crate::Comms::Wire::{Header, Location};

/// Most payload words any kind carries.
pub const MAX_PAYLOAD_WORDS: usize = 3;

/// Most slots any message occupies, header included.
pub const MAX_MESSAGE_WORDS: usize = MAX_PAYLOAD_WORDS + 1;

/// Set in the tag nibble of a request's payload word once it has been answered.
pub const ANSWERED_FLAG: u8 = 0b1;

/// Every kind of message the channel can carry. The discriminant is the
/// 3-bit kind field of the header, so there can never be more than eight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MessageKind {
    Hello = 0,
    ResourceFound = 1,
    ResourceRequest = 2,
    StartManeuver = 3,
    EndManeuver = 4,
    TerrainSample = 5,
    BaseThreatened = 6,
    Raw = 7,
}

impl MessageKind {
    pub const ALL: [MessageKind; 8] = [
        MessageKind::Hello,
        MessageKind::ResourceFound,
        MessageKind::ResourceRequest,
        MessageKind::StartManeuver,
        MessageKind::EndManeuver,
        MessageKind::TerrainSample,
        MessageKind::BaseThreatened,
        MessageKind::Raw,
    ];

    /// Canonical payload length. A header claiming anything else is malformed.
    pub const fn payload_len(self) -> usize {
        match self {
            MessageKind::Hello
            | MessageKind::ResourceFound
            | MessageKind::ResourceRequest
            | MessageKind::StartManeuver
            | MessageKind::EndManeuver => 1,
            MessageKind::TerrainSample => 2,
            MessageKind::BaseThreatened => 0,
            MessageKind::Raw => 3,
        }
    }

    /// Slots taken by one message of this kind.
    pub const fn size(self) -> usize {
        self.payload_len() + 1
    }

    pub const fn default_priority(self) -> u8 {
        match self {
            MessageKind::BaseThreatened => 3,
            MessageKind::StartManeuver | MessageKind::EndManeuver => 2,
            MessageKind::Hello | MessageKind::ResourceFound | MessageKind::ResourceRequest => 1,
            MessageKind::TerrainSample | MessageKind::Raw => 0,
        }
    }

    /// Map the 3-bit kind field to a kind. Every bit pattern is a valid kind.
    pub fn from_bits(bits: u16) -> Self {
        Self::ALL[(bits & 0b111) as usize]
    }
}

/// A decoded message. Decoding hands back the variant directly, so handlers
/// dispatch with an exhaustive `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
    /// "I am archetype `archetype` at `location`". Archetype lives in the tag nibble.
    Hello { archetype: u8, location: Location },
    /// Discovery broadcast.
    ResourceFound { location: Location },
    /// Asks for a resource location. The payload word is the answer slot a
    /// responder fills in place.
    ResourceRequest { answer: Option<Location> },
    StartManeuver { target: Location },
    EndManeuver { target: Location },
    /// A terrain reading, used to rule out map symmetries.
    TerrainSample { location: Location, terrain: u16 },
    BaseThreatened,
    /// Opaque words, mostly for tests and probes.
    Raw { words: [u16; MAX_PAYLOAD_WORDS] },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Hello { .. } => MessageKind::Hello,
            Message::ResourceFound { .. } => MessageKind::ResourceFound,
            Message::ResourceRequest { .. } => MessageKind::ResourceRequest,
            Message::StartManeuver { .. } => MessageKind::StartManeuver,
            Message::EndManeuver { .. } => MessageKind::EndManeuver,
            Message::TerrainSample { .. } => MessageKind::TerrainSample,
            Message::BaseThreatened => MessageKind::BaseThreatened,
            Message::Raw { .. } => MessageKind::Raw,
        }
    }

    pub fn size(&self) -> usize {
        self.kind().size()
    }

    /// An unanswered request.
    pub fn request() -> Self {
        Message::ResourceRequest { answer: None }
    }

    /// Encode header and payload, back to back.
    pub fn encode(&self, header: &Header) -> EncodedMessage {
        debug_assert_eq!(header.kind, self.kind());
        let mut words = [0u16; MAX_MESSAGE_WORDS];
        words[0] = header.encode();
        let payload = &mut words[1..];
        match *self {
            Message::Hello { archetype, location } => payload[0] = location.encode_tagged(archetype),
            Message::ResourceFound { location } => payload[0] = location.encode(),
            Message::ResourceRequest { answer } => payload[0] = encode_answer(answer),
            Message::StartManeuver { target } | Message::EndManeuver { target } => {
                payload[0] = target.encode()
            }
            Message::TerrainSample { location, terrain } => {
                payload[0] = location.encode();
                payload[1] = terrain;
            }
            Message::BaseThreatened => {}
            Message::Raw { words: raw } => payload[..MAX_PAYLOAD_WORDS].copy_from_slice(&raw),
        }
        EncodedMessage {
            words,
            len: header.size(),
        }
    }

    /// Rebuild a message from its kind and payload words.
    ///
    /// `payload` must hold exactly `kind.payload_len()` words; the header
    /// decoder has already guaranteed that for anything read off the channel.
    pub fn decode(kind: MessageKind, payload: &[u16]) -> Self {
        debug_assert_eq!(payload.len(), kind.payload_len());
        match kind {
            MessageKind::Hello => Message::Hello {
                archetype: Location::tag_of(payload[0]),
                location: Location::decode(payload[0]),
            },
            MessageKind::ResourceFound => Message::ResourceFound {
                location: Location::decode(payload[0]),
            },
            MessageKind::ResourceRequest => Message::ResourceRequest {
                answer: decode_answer(payload[0]),
            },
            MessageKind::StartManeuver => Message::StartManeuver {
                target: Location::decode(payload[0]),
            },
            MessageKind::EndManeuver => Message::EndManeuver {
                target: Location::decode(payload[0]),
            },
            MessageKind::TerrainSample => Message::TerrainSample {
                location: Location::decode(payload[0]),
                terrain: payload[1],
            },
            MessageKind::BaseThreatened => Message::BaseThreatened,
            MessageKind::Raw => {
                let mut words = [0u16; MAX_PAYLOAD_WORDS];
                words.copy_from_slice(&payload[..MAX_PAYLOAD_WORDS]);
                Message::Raw { words }
            }
        }
    }
}

/// Payload word of a request carrying `answer`.
pub fn encode_answer(answer: Option<Location>) -> u16 {
    match answer {
        Some(location) => location.encode_tagged(ANSWERED_FLAG),
        None => 0,
    }
}

pub fn decode_answer(word: u16) -> Option<Location> {
    if Location::tag_of(word) & ANSWERED_FLAG != 0 {
        Some(Location::decode(word))
    } else {
        None
    }
}

/// A message on the wire: header followed by payload, `len` words used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedMessage {
    words: [u16; MAX_MESSAGE_WORDS],
    len: usize,
}

impl EncodedMessage {
    pub fn as_slice(&self) -> &[u16] {
        &self.words[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A message waiting to be published, with the priority its header will carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outgoing {
    pub message: Message,
    pub priority: u8,
}

impl Outgoing {
    pub fn new(message: Message) -> Self {
        Self {
            priority: message.kind().default_priority(),
            message,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        debug_assert!(priority <= crate::Comms::Wire::MAX_PRIORITY);
        self.priority = priority.min(crate::Comms::Wire::MAX_PRIORITY);
        self
    }
}

impl From<Message> for Outgoing {
    fn from(message: Message) -> Self {
        Outgoing::new(message)
    }
}

/// Handle returned by `enqueue`, matched against the tickets a drain reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutboundId(pub u64);

/// Where a message's header was written and what it said.
///
/// Holding a ticket is the only way to touch a published message after the
/// fact, and every such access first checks that the header at `slot` still
/// equals `header`; once the slot is evicted and reused the ticket is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClaimTicket {
    pub slot: usize,
    pub header: Header,
}

impl ClaimTicket {
    /// Slot of payload word `n` (0-based) in a message region of `region_len` slots.
    pub fn payload_slot(&self, n: usize, region_len: usize) -> usize {
        (self.slot + 1 + n) % region_len
    }
}

/// A message read off the channel this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message: Message,
    pub ticket: ClaimTicket,
    /// Rounds since it was written (cyclic).
    pub age: u8,
}

impl ReceivedMessage {
    pub fn header(&self) -> &Header {
        &self.ticket.header
    }

    pub fn kind(&self) -> MessageKind {
        self.ticket.header.kind
    }
}

/// Outcome of polling a request's answer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// Still in the channel, nobody has answered yet.
    Pending,
    Answered(Location),
    /// The request was evicted; no answer will ever arrive.
    Gone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_fits_the_kind_field() {
        for (bits, kind) in MessageKind::ALL.iter().enumerate() {
            assert_eq!(MessageKind::from_bits(bits as u16), *kind);
            assert!(kind.size() <= MAX_MESSAGE_WORDS);
        }
    }

    #[test]
    fn every_kind_round_trips() {
        let loc = Location::new(63, 17);
        let samples = [
            Message::Hello { archetype: 0xF, location: loc },
            Message::ResourceFound { location: loc },
            Message::ResourceRequest { answer: None },
            Message::ResourceRequest { answer: Some(loc) },
            Message::StartManeuver { target: loc },
            Message::EndManeuver { target: Location::new(0, 0) },
            Message::TerrainSample { location: loc, terrain: u16::MAX },
            Message::BaseThreatened,
            Message::Raw { words: [0, 0xFFFF, 0x1234] },
        ];
        for message in samples {
            let header = Header::new(3, message.kind(), 31);
            let encoded = message.encode(&header);
            assert_eq!(encoded.len(), message.size());
            let words = encoded.as_slice();
            let decoded_header = Header::decode(words[0], 0).unwrap();
            assert_eq!(decoded_header, header);
            assert_eq!(Message::decode(decoded_header.kind, &words[1..]), message);
        }
    }

    #[test]
    fn request_answer_flag_lives_in_bit_zero() {
        let word = encode_answer(Some(Location::new(1, 2)));
        assert_eq!(word & 1, 1);
        assert_eq!(decode_answer(word & !1), None);
        assert_eq!(decode_answer(0), None);
    }
}
