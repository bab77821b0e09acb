//! Bit layouts of every word the channel writes.
//!
//! Each layout is a table of [`BitField`]s that both the encoders and the
//! decoders read, so a field can only be moved or widened in one place. The
//! compile-time checks at the bottom refuse any table whose fields overlap or
//! leave a bit of the 16-bit word unaccounted for.

/// Width of one shared-array slot.
pub const WORD_BITS: u32 = 16;

/// One fixed-width field inside a 16-bit word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub name: &'static str,
    pub width: u32,
    pub offset: u32,
}

impl BitField {
    pub const fn new(name: &'static str, width: u32, offset: u32) -> Self {
        Self {
            name,
            width,
            offset,
        }
    }

    /// Largest value the field can hold.
    #[inline]
    pub const fn max(&self) -> u16 {
        ((1u32 << self.width) - 1) as u16
    }

    /// The field's bits, in place.
    #[inline]
    pub const fn mask(&self) -> u16 {
        self.max() << self.offset
    }

    #[inline]
    pub const fn get(&self, word: u16) -> u16 {
        (word >> self.offset) & self.max()
    }

    /// `value` shifted into place. Values wider than the field are a caller bug.
    #[inline]
    pub fn put(&self, value: u16) -> u16 {
        debug_assert!(
            value <= self.max(),
            "{} = {} does not fit in {} bits",
            self.name,
            value,
            self.width
        );
        (value & self.max()) << self.offset
    }

    /// `word` with this field replaced by `value`.
    #[inline]
    pub fn set(&self, word: u16, value: u16) -> u16 {
        (word & !self.mask()) | self.put(value)
    }

    #[inline]
    pub const fn is_set(&self, word: u16) -> bool {
        word & self.mask() != 0
    }
}

/// Message header, MSB to LSB: `[priority:2][kind:3][payload_len:6][cyclic_round:5]`.
pub const MESSAGE_HEADER: [BitField; 4] = [
    BitField::new("priority", 2, 14),
    BitField::new("kind", 3, 11),
    BitField::new("payload_len", 6, 5),
    BitField::new("cyclic_round", 5, 0),
];

pub const PRIORITY: BitField = MESSAGE_HEADER[0];
pub const KIND: BitField = MESSAGE_HEADER[1];
pub const PAYLOAD_LEN: BitField = MESSAGE_HEADER[2];
pub const CYCLIC_ROUND: BitField = MESSAGE_HEADER[3];

/// Channel header, MSB to LSB:
/// `[valid_start:6][valid_end:6][not_horizontal:1][not_vertical:1][not_rotational:1][full:1]`.
pub const CHANNEL_HEADER: [BitField; 6] = [
    BitField::new("valid_start", 6, 10),
    BitField::new("valid_end", 6, 4),
    BitField::new("not_horizontal", 1, 3),
    BitField::new("not_vertical", 1, 2),
    BitField::new("not_rotational", 1, 1),
    BitField::new("full", 1, 0),
];

pub const VALID_START: BitField = CHANNEL_HEADER[0];
pub const VALID_END: BitField = CHANNEL_HEADER[1];
pub const NOT_HORIZONTAL: BitField = CHANNEL_HEADER[2];
pub const NOT_VERTICAL: BitField = CHANNEL_HEADER[3];
pub const NOT_ROTATIONAL: BitField = CHANNEL_HEADER[4];
pub const FULL: BitField = CHANNEL_HEADER[5];

/// The three symmetry bits of the channel header.
pub const SYMMETRY_BITS: u16 = NOT_HORIZONTAL.mask() | NOT_VERTICAL.mask() | NOT_ROTATIONAL.mask();

/// Location payload word, MSB to LSB: `[x:6][y:6][tag:4]`.
pub const LOCATION_WORD: [BitField; 3] = [
    BitField::new("x", 6, 10),
    BitField::new("y", 6, 4),
    BitField::new("tag", 4, 0),
];

pub const LOC_X: BitField = LOCATION_WORD[0];
pub const LOC_Y: BitField = LOCATION_WORD[1];
pub const LOC_TAG: BitField = LOCATION_WORD[2];

/// True when `fields` cover every bit of a word exactly once.
pub const fn tiles_word(fields: &[BitField]) -> bool {
    let mut seen: u32 = 0;
    let mut i = 0;
    while i < fields.len() {
        let field = fields[i];
        if field.width == 0 || field.offset + field.width > WORD_BITS {
            return false;
        }
        let bits = ((1u32 << field.width) - 1) << field.offset;
        if seen & bits != 0 {
            return false;
        }
        seen |= bits;
        i += 1;
    }
    seen == (1u32 << WORD_BITS) - 1
}

const _: () = assert!(tiles_word(&MESSAGE_HEADER));
const _: () = assert!(tiles_word(&CHANNEL_HEADER));
const _: () = assert!(tiles_word(&LOCATION_WORD));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_fields_are_rejected() {
        let bad = [BitField::new("a", 8, 8), BitField::new("b", 9, 0)];
        assert!(!tiles_word(&bad));
        let short = [BitField::new("a", 8, 8)];
        assert!(!tiles_word(&short));
    }

    #[test]
    fn set_replaces_only_its_own_bits() {
        let word = 0xFFFF;
        let cleared = PAYLOAD_LEN.set(word, 0);
        assert_eq!(cleared, 0xFFFF & !PAYLOAD_LEN.mask());
        assert_eq!(PAYLOAD_LEN.get(PAYLOAD_LEN.set(cleared, 63)), 63);
        assert_eq!(KIND.get(cleared), 7);
    }
}
