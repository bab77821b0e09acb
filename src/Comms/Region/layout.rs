use crate::error::{CommsError, Result};
use crate::Comms::Structs::MAX_MESSAGE_WORDS;
use crate::Comms::Wire::schema::VALID_START;

/// Slots in the default shared array.
pub const DEFAULT_SHARED_LEN: usize = 64;

/// Slots reserved at the end of the array for the channel header.
pub const DEFAULT_HEADER_SLOTS: usize = 1;

/// Largest message region the 6-bit span fields can index.
pub const MAX_REGION_LEN: usize = VALID_START.max() as usize + 1;

/// Geometry of the shared array: `region_len` message slots followed by
/// `header_slots` reserved slots, the first of which holds the channel header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    shared_len: usize,
    header_slots: usize,
}

impl ChannelLayout {
    pub fn new(shared_len: usize, header_slots: usize) -> Result<Self> {
        if header_slots == 0 {
            return Err(CommsError::InvalidConfig(
                "at least one header slot is required".into(),
            ));
        }
        let region_len = shared_len.checked_sub(header_slots).ok_or_else(|| {
            CommsError::InvalidConfig(format!(
                "{} header slots do not fit in a {}-slot array",
                header_slots, shared_len
            ))
        })?;
        if region_len < MAX_MESSAGE_WORDS {
            return Err(CommsError::InvalidConfig(format!(
                "message region of {} slots cannot hold a {}-word message",
                region_len, MAX_MESSAGE_WORDS
            )));
        }
        if region_len > MAX_REGION_LEN {
            return Err(CommsError::InvalidConfig(format!(
                "message region of {} slots exceeds the {} the channel header can index",
                region_len, MAX_REGION_LEN
            )));
        }
        Ok(Self {
            shared_len,
            header_slots,
        })
    }

    /// Slots in the whole shared array (N).
    pub fn shared_len(&self) -> usize {
        self.shared_len
    }

    /// Reserved header slots (K).
    pub fn header_slots(&self) -> usize {
        self.header_slots
    }

    /// Slots available to messages (M = N - K).
    pub fn region_len(&self) -> usize {
        self.shared_len - self.header_slots
    }

    /// Index of the channel header word.
    pub fn header_index(&self) -> usize {
        self.region_len()
    }

    #[inline]
    pub fn wrap(&self, index: usize) -> usize {
        index % self.region_len()
    }

    /// Forward distance from `from` to `to` around the message region.
    #[inline]
    pub fn distance(&self, from: usize, to: usize) -> usize {
        let m = self.region_len();
        (to % m + m - from % m) % m
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self {
            shared_len: DEFAULT_SHARED_LEN,
            header_slots: DEFAULT_HEADER_SLOTS,
        }
    }
}
