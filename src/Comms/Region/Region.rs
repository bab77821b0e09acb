// Valid-region bookkeeping for the message ring, persisted in the channel header word.

use super::layout::ChannelLayout;
use crate::Comms::Wire::schema::{BitField, NOT_HORIZONTAL, NOT_ROTATIONAL, NOT_VERTICAL};

/// Candidate global map symmetries. Agents rule them out one at a time and
/// publish the result in three spare bits of the channel header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapSymmetry {
    Horizontal,
    Vertical,
    Rotational,
}

impl MapSymmetry {
    /// Order in which remaining candidates are guessed.
    pub const GUESS_ORDER: [MapSymmetry; 3] = [
        MapSymmetry::Rotational,
        MapSymmetry::Horizontal,
        MapSymmetry::Vertical,
    ];

    /// The channel-header bit that says "cannot be this symmetry".
    pub(crate) const fn ruled_out_bit(self) -> BitField {
        match self {
            MapSymmetry::Horizontal => NOT_HORIZONTAL,
            MapSymmetry::Vertical => NOT_VERTICAL,
            MapSymmetry::Rotational => NOT_ROTATIONAL,
        }
    }
}

/// An agent's view of the live span `[valid_start, valid_end)` of the
/// message ring.
///
/// ### Invariants
/// - The span holds whole messages back to back, nothing else.
/// - `valid_start == valid_end` means empty unless `full` is set, in which
///   case every slot of the region is live.
/// - `valid_start` only moves forward and only by whole messages (or by one
///   slot when the word there does not decode).
///
/// This struct is NOT stored in shared memory. It is a per-agent copy of the
/// channel header, refreshed with `reload` and written back with `persist`
/// only when `dirty`.
pub struct RegionTracker {
    pub(crate) layout: ChannelLayout,

    /// Slot of the oldest live message's header.
    pub(crate) valid_start: usize,

    /// Slot just past the newest live message; the next write starts here.
    pub(crate) valid_end: usize,

    /// Distinguishes a full ring from an empty one when start == end.
    pub(crate) full: bool,

    /// The three "can't be" symmetry bits, in channel-header position.
    pub(crate) symmetry_bits: u16,

    pub(crate) known_symmetry: Option<MapSymmetry>,
    pub(crate) guessed_symmetry: Option<MapSymmetry>,

    /// Local view differs from what was last loaded or persisted.
    pub(crate) dirty: bool,

    /// Round of the last `reload`; a dirty view only survives reloads within it.
    pub(crate) loaded_round: Option<u32>,
}
