use std::fmt;

use log::{debug, info, trace, warn};

use super::layout::ChannelLayout;
use super::Region::{MapSymmetry, RegionTracker};
use crate::Comms::Wire::schema::{FULL, SYMMETRY_BITS, VALID_END, VALID_START};
use crate::Comms::Wire::Header;
use crate::Core::view::ChannelView;

impl RegionTracker {
    /// An empty channel with no symmetry ruled out.
    pub fn new(layout: ChannelLayout) -> Self {
        Self {
            layout,
            valid_start: 0,
            valid_end: 0,
            full: false,
            symmetry_bits: 0,
            known_symmetry: None,
            guessed_symmetry: Some(MapSymmetry::GUESS_ORDER[0]),
            dirty: false,
            loaded_round: None,
        }
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn valid_start(&self) -> usize {
        self.valid_start
    }

    pub fn valid_end(&self) -> usize {
        self.valid_end
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn is_empty(&self) -> bool {
        self.valid_start == self.valid_end && !self.full
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Slots currently holding live messages.
    pub fn used_slots(&self) -> usize {
        if self.full {
            self.layout.region_len()
        } else {
            self.layout.distance(self.valid_start, self.valid_end)
        }
    }

    pub fn free_slots(&self) -> usize {
        self.layout.region_len() - self.used_slots()
    }

    /// Whether `slot` lies inside the live span.
    pub fn contains(&self, slot: usize) -> bool {
        slot < self.layout.region_len() && self.layout.distance(self.valid_start, slot) < self.used_slots()
    }

    /// The channel header word for the current view.
    pub fn encode(&self) -> u16 {
        VALID_START.put(self.valid_start as u16)
            | VALID_END.put(self.valid_end as u16)
            | self.symmetry_bits
            | FULL.put(self.full as u16)
    }

    /// Refresh from the channel header in the shared array.
    ///
    /// Must run once per turn before touching the message region. A view made
    /// dirty earlier in this same round already holds this turn's own changes
    /// on top of the last load, so its span is kept and only the symmetry bits
    /// are merged. A dirty view left over from an earlier round (a turn that
    /// never reached `persist`) is dropped in favour of the array's span; its
    /// symmetry bits are carried over, since they only ever accumulate.
    pub fn reload(&mut self, view: &mut ChannelView<'_>, round: u32) {
        let word = view.load(self.layout.header_index());
        let published_bits = word & SYMMETRY_BITS;
        if self.dirty && self.loaded_round == Some(round) {
            self.symmetry_bits |= published_bits;
            self.derive_symmetry();
            trace!("reload kept dirty view {}", self);
            return;
        }

        let carried_bits = if self.dirty {
            debug!("dropping unpublished view {} from round {:?}", self, self.loaded_round);
            self.symmetry_bits
        } else {
            0
        };

        let start = VALID_START.get(word) as usize;
        let end = VALID_END.get(word) as usize;
        let full = FULL.is_set(word);
        let region_len = self.layout.region_len();
        if start >= region_len || end >= region_len {
            warn!(
                "channel header {:#06x} spans [{}:{}) outside a {}-slot region, resetting to empty",
                word, start, end, region_len
            );
            self.reset_span();
        } else if full && start != end {
            warn!(
                "channel header {:#06x} is marked full but spans [{}:{}), resetting to empty",
                word, start, end
            );
            self.reset_span();
        } else {
            self.valid_start = start;
            self.valid_end = end;
            self.full = full;
            self.dirty = false;
        }
        self.symmetry_bits = published_bits | carried_bits;
        if self.symmetry_bits != published_bits {
            self.dirty = true;
        }
        self.loaded_round = Some(round);
        self.derive_symmetry();
        trace!("reloaded {}", self);
    }

    fn reset_span(&mut self) {
        self.valid_start = 0;
        self.valid_end = 0;
        self.full = false;
        self.dirty = true;
    }

    /// Write the channel header back if anything changed.
    /// Returns true if the shared array was written.
    pub fn persist(&mut self, view: &mut ChannelView<'_>) -> bool {
        if !self.dirty {
            return false;
        }
        view.store(self.layout.header_index(), self.encode());
        self.dirty = false;
        trace!("persisted {}", self);
        true
    }

    /// Called before overwriting `slot`: if it holds the oldest live message,
    /// move `valid_start` past that whole message.
    ///
    /// A word that does not decode as a header moves the start by one slot.
    /// An advance that would pass `valid_end` leaves the channel empty with
    /// `valid_start == valid_end`.
    ///
    /// Returns the number of slots evicted.
    pub fn advance_start_past(&mut self, view: &mut ChannelView<'_>, slot: usize) -> usize {
        if self.is_empty() || slot != self.valid_start {
            return 0;
        }

        let step = self.message_len_at(view, self.valid_start);
        let used = self.used_slots();
        if step >= used {
            if step > used {
                warn!(
                    "message at {} needs {} slots but only {} are live, emptying channel",
                    self.valid_start, step, used
                );
            }
            self.valid_start = self.valid_end;
            self.full = false;
            self.dirty = true;
            debug!("evicted {} slots at {}, channel now empty", used, slot);
            return used;
        }

        self.valid_start = self.layout.wrap(self.valid_start + step);
        self.full = false;
        self.dirty = true;
        debug!("evicted {} slots at {}, start now {}", step, slot, self.valid_start);
        step
    }

    /// Work out whether `needed` slots can be made available at `valid_end`
    /// without evicting a message younger than `retention_rounds`.
    ///
    /// Returns the number of slots that writing will evict, or `None` if the
    /// message cannot fit this round. Walks whole messages from `valid_start`
    /// exactly as `advance_start_past` will.
    pub fn plan_room(
        &self,
        view: &mut ChannelView<'_>,
        needed: usize,
        round: u32,
        retention_rounds: u8,
    ) -> Option<usize> {
        if needed > self.layout.region_len() {
            return None;
        }
        let free = self.free_slots();
        if free >= needed {
            return Some(0);
        }

        let mut reclaimed = 0;
        let mut remaining = self.used_slots();
        let mut cursor = self.valid_start;
        while free + reclaimed < needed && remaining > 0 {
            let word = view.load(cursor);
            view.charge_decode();
            let step = match Header::decode(word, cursor) {
                Ok(header) => {
                    if header.age_at(round) < retention_rounds {
                        trace!("cannot evict {} at {}: too recent", header, cursor);
                        return None;
                    }
                    header.size()
                }
                Err(_) => 1,
            };
            let step = step.min(remaining);
            reclaimed += step;
            remaining -= step;
            cursor = self.layout.wrap(cursor + step);
        }
        Some(reclaimed)
    }

    /// Record that `len` words were just written starting at `valid_end`.
    pub(crate) fn commit_write(&mut self, len: usize) {
        if self.is_empty() {
            // first message: the span starts at its header
            self.valid_start = self.valid_end;
        }
        let used = self.used_slots() + len;
        debug_assert!(used <= self.layout.region_len());
        self.valid_end = self.layout.wrap(self.valid_end + len);
        self.full = used == self.layout.region_len();
        self.dirty = true;
    }

    fn message_len_at(&self, view: &mut ChannelView<'_>, slot: usize) -> usize {
        let word = view.load(slot);
        view.charge_decode();
        match Header::decode(word, slot) {
            Ok(header) => header.size(),
            Err(err) => {
                debug!("{}, evicting a single slot", err);
                1
            }
        }
    }

    /// Rule out `symmetry`, recompute the known/guessed values and mark the
    /// header dirty so it is published at the end of the turn.
    pub fn set_symmetry_cant_be(&mut self, symmetry: MapSymmetry) {
        self.symmetry_bits |= symmetry.ruled_out_bit().mask();
        self.derive_symmetry();
        self.dirty = true;
        info!(
            "symmetry can't be {:?}: known {:?}, guess {:?}",
            symmetry, self.known_symmetry, self.guessed_symmetry
        );
    }

    pub fn symmetry_ruled_out(&self, symmetry: MapSymmetry) -> bool {
        self.symmetry_bits & symmetry.ruled_out_bit().mask() != 0
    }

    /// The symmetry, once every other candidate has been ruled out.
    pub fn known_symmetry(&self) -> Option<MapSymmetry> {
        self.known_symmetry
    }

    /// Best current candidate: the known symmetry, or the first one not yet
    /// ruled out. `None` only if all three have been (contradictory reports).
    pub fn guessed_symmetry(&self) -> Option<MapSymmetry> {
        self.guessed_symmetry
    }

    fn derive_symmetry(&mut self) {
        let mut remaining = MapSymmetry::GUESS_ORDER
            .iter()
            .copied()
            .filter(|s| !self.symmetry_ruled_out(*s));
        let first = remaining.next();
        let only = first.filter(|_| remaining.next().is_none());
        self.known_symmetry = only;
        self.guessed_symmetry = first;
    }
}

impl fmt::Display for RegionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ValidComms[{}:{}{}]",
            self.valid_start,
            self.valid_end,
            if self.full { " full" } else { "" }
        )
    }
}

impl fmt::Debug for RegionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_region_tracker(self, f)
    }
}
