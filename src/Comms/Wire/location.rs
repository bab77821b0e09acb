use std::fmt;

use super::schema::{LOC_TAG, LOC_X, LOC_Y};

/// Largest coordinate a location word can carry on either axis.
pub const MAX_COORD: u8 = LOC_X.max() as u8;

/// A map cell, packed 6 bits per axis into one payload word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Location {
    pub x: u8,
    pub y: u8,
}

impl Location {
    /// # Panics
    /// If either coordinate exceeds [`MAX_COORD`]; maps larger than the word
    /// can describe are a configuration bug, not a runtime condition.
    pub fn new(x: u8, y: u8) -> Self {
        assert!(
            x <= MAX_COORD && y <= MAX_COORD,
            "location ({}, {}) outside the encodable map",
            x,
            y
        );
        Self { x, y }
    }

    /// Encode with an empty tag nibble.
    pub fn encode(self) -> u16 {
        self.encode_tagged(0)
    }

    /// Encode with `tag` in the low nibble.
    pub fn encode_tagged(self, tag: u8) -> u16 {
        LOC_X.put(self.x as u16) | LOC_Y.put(self.y as u16) | LOC_TAG.put(tag as u16)
    }

    pub fn decode(word: u16) -> Self {
        Self {
            x: LOC_X.get(word) as u8,
            y: LOC_Y.get(word) as u8,
        }
    }

    /// The low nibble of a location word.
    pub fn tag_of(word: u16) -> u8 {
        LOC_TAG.get(word) as u8
    }

    pub fn distance_squared(self, other: Location) -> u32 {
        let dx = self.x as i32 - other.x as i32;
        let dy = self.y as i32 - other.y as i32;
        (dx * dx + dy * dy) as u32
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
