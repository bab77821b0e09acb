use swarmcast::Comms::Region::{ChannelLayout, MapSymmetry, RegionTracker};
use swarmcast::Comms::Structs::MessageKind;
use swarmcast::Comms::Wire::schema::{FULL, VALID_END, VALID_START};
use swarmcast::Comms::Wire::Header;
use swarmcast::Core::context::{CostTable, TurnBudget};
use swarmcast::Core::view::ChannelView;
use swarmcast::Core::{HeapSharedArray, SharedArrayBackend};

fn setup(shared_len: usize) -> (ChannelLayout, HeapSharedArray) {
    let layout = ChannelLayout::new(shared_len, 1).unwrap();
    (layout, HeapSharedArray::new(shared_len))
}

fn publish_span(shared: &HeapSharedArray, layout: ChannelLayout, start: u16, end: u16, full: bool) {
    shared.store(
        layout.header_index(),
        VALID_START.put(start) | VALID_END.put(end) | FULL.put(full as u16),
    );
}

#[test]
fn undecodable_start_advances_one_slot() {
    let (layout, shared) = setup(21);
    shared.store(0, 0xFFFF);
    shared.store(1, Header::new(0, MessageKind::Hello, 0).encode());
    publish_span(&shared, layout, 0, 3, false);

    let mut budget = TurnBudget::new(u32::MAX);
    let mut view = ChannelView::new(&shared, &mut budget, CostTable::default());
    let mut tracker = RegionTracker::new(layout);
    tracker.reload(&mut view, 0);

    assert_eq!(tracker.advance_start_past(&mut view, 0), 1);
    assert_eq!(tracker.valid_start(), 1);
    assert!(tracker.is_dirty());
    // Not the start: nothing moves.
    assert_eq!(tracker.advance_start_past(&mut view, 2), 0);
    assert_eq!(tracker.advance_start_past(&mut view, 1), 2);
    assert!(tracker.is_empty());
}

#[test]
fn advance_never_passes_the_end() {
    let (layout, shared) = setup(21);
    // A 4-word message header, but the span claims only 2 slots.
    shared.store(18, Header::new(0, MessageKind::Raw, 0).encode());
    publish_span(&shared, layout, 18, 0, false);

    let mut budget = TurnBudget::new(u32::MAX);
    let mut view = ChannelView::new(&shared, &mut budget, CostTable::default());
    let mut tracker = RegionTracker::new(layout);
    tracker.reload(&mut view, 0);
    assert_eq!(tracker.used_slots(), 2);

    assert_eq!(tracker.advance_start_past(&mut view, 18), 2);
    assert!(tracker.is_empty());
    assert_eq!(tracker.valid_start(), 0);
    assert_eq!(tracker.valid_end(), 0);
}

#[test]
fn full_ring_evicts_whole_messages() {
    let (layout, shared) = setup(9);
    // M = 8: two Raw messages, ring full.
    shared.store(0, Header::new(0, MessageKind::Raw, 0).encode());
    shared.store(4, Header::new(0, MessageKind::Raw, 0).encode());
    publish_span(&shared, layout, 0, 0, true);

    let mut budget = TurnBudget::new(u32::MAX);
    let mut view = ChannelView::new(&shared, &mut budget, CostTable::default());
    let mut tracker = RegionTracker::new(layout);
    tracker.reload(&mut view, 0);
    assert!(tracker.is_full());
    assert_eq!(tracker.free_slots(), 0);
    assert_eq!(format!("{}", tracker), "ValidComms[0:0 full]");

    assert_eq!(tracker.plan_room(&mut view, 2, 0, 1), None, "round-0 messages are protected in round 0");
    assert_eq!(tracker.plan_room(&mut view, 2, 1, 1), Some(4));
    assert_eq!(tracker.plan_room(&mut view, 5, 1, 1), Some(8));
    assert_eq!(tracker.plan_room(&mut view, 9, 1, 1), None);

    assert_eq!(tracker.advance_start_past(&mut view, 0), 4);
    assert!(!tracker.is_full());
    assert_eq!(tracker.used_slots(), 4);
    assert!(tracker.contains(4));
    assert!(tracker.contains(7));
    assert!(!tracker.contains(0));
}

#[test]
fn out_of_range_header_resets_to_empty() {
    let (layout, shared) = setup(21);
    publish_span(&shared, layout, 30, 2, false);

    let mut budget = TurnBudget::new(u32::MAX);
    let mut view = ChannelView::new(&shared, &mut budget, CostTable::default());
    let mut tracker = RegionTracker::new(layout);
    tracker.reload(&mut view, 0);
    assert!(tracker.is_empty());
    assert!(tracker.is_dirty());

    assert!(tracker.persist(&mut view));
    assert_eq!(shared.load(layout.header_index()), 0);
    assert!(!tracker.persist(&mut view), "clean trackers do not write");
}

#[test]
fn reload_within_the_round_keeps_dirty_span() {
    let (layout, shared) = setup(21);
    let mut budget = TurnBudget::new(u32::MAX);
    let mut view = ChannelView::new(&shared, &mut budget, CostTable::default());
    let mut tracker = RegionTracker::new(layout);
    tracker.reload(&mut view, 0);
    tracker.set_symmetry_cant_be(MapSymmetry::Horizontal);

    // Someone else's header, with another symmetry ruled out.
    let mut other = RegionTracker::new(layout);
    other.set_symmetry_cant_be(MapSymmetry::Vertical);
    view.store(layout.header_index(), other.encode() | VALID_END.put(4));

    tracker.reload(&mut view, 0);
    assert!(tracker.is_empty(), "local span wins while dirty");
    assert!(tracker.symmetry_ruled_out(MapSymmetry::Horizontal));
    assert!(tracker.symmetry_ruled_out(MapSymmetry::Vertical));
    assert_eq!(tracker.known_symmetry(), Some(MapSymmetry::Rotational));
}

#[test]
fn unpublished_view_from_an_earlier_round_is_dropped() {
    let (layout, shared) = setup(21);
    let mut budget = TurnBudget::new(u32::MAX);
    let mut view = ChannelView::new(&shared, &mut budget, CostTable::default());
    let mut tracker = RegionTracker::new(layout);
    tracker.reload(&mut view, 0);
    tracker.set_symmetry_cant_be(MapSymmetry::Horizontal);
    // The turn ends without persist.

    let mut other = RegionTracker::new(layout);
    other.set_symmetry_cant_be(MapSymmetry::Vertical);
    view.store(layout.header_index(), other.encode() | VALID_END.put(4));

    tracker.reload(&mut view, 1);
    assert_eq!(tracker.valid_start(), 0);
    assert_eq!(tracker.valid_end(), 4, "the published span wins next round");
    assert!(tracker.symmetry_ruled_out(MapSymmetry::Horizontal));
    assert!(tracker.symmetry_ruled_out(MapSymmetry::Vertical));
    assert!(tracker.is_dirty(), "the carried symmetry bit still has to be published");

    assert!(tracker.persist(&mut view));
    let word = shared.load(layout.header_index());
    assert_eq!(VALID_END.get(word), 4);

    // Nothing left to carry: a later reload is clean.
    tracker.reload(&mut view, 2);
    assert!(!tracker.is_dirty());
}

#[test]
fn full_bit_with_split_span_resets_to_empty() {
    let (layout, shared) = setup(21);
    publish_span(&shared, layout, 3, 7, true);

    let mut budget = TurnBudget::new(u32::MAX);
    let mut view = ChannelView::new(&shared, &mut budget, CostTable::default());
    let mut tracker = RegionTracker::new(layout);
    tracker.reload(&mut view, 0);
    assert!(tracker.is_empty());
    assert!(!tracker.is_full());
    assert!(tracker.is_dirty());

    assert!(tracker.persist(&mut view));
    assert_eq!(shared.load(layout.header_index()), 0);
}

#[test]
fn symmetry_deduction() {
    let (layout, shared) = setup(64);
    let mut budget = TurnBudget::new(u32::MAX);
    let mut view = ChannelView::new(&shared, &mut budget, CostTable::default());

    let mut tracker = RegionTracker::new(layout);
    assert_eq!(tracker.known_symmetry(), None);
    assert_eq!(tracker.guessed_symmetry(), Some(MapSymmetry::Rotational));

    tracker.set_symmetry_cant_be(MapSymmetry::Rotational);
    assert_eq!(tracker.known_symmetry(), None);
    assert_eq!(tracker.guessed_symmetry(), Some(MapSymmetry::Horizontal));

    tracker.set_symmetry_cant_be(MapSymmetry::Horizontal);
    assert_eq!(tracker.known_symmetry(), Some(MapSymmetry::Vertical));
    assert_eq!(tracker.guessed_symmetry(), Some(MapSymmetry::Vertical));
    assert!(tracker.persist(&mut view));

    let mut reader = RegionTracker::new(layout);
    reader.reload(&mut view, 0);
    assert_eq!(reader.known_symmetry(), Some(MapSymmetry::Vertical));

    reader.set_symmetry_cant_be(MapSymmetry::Vertical);
    assert_eq!(reader.known_symmetry(), None);
    assert_eq!(reader.guessed_symmetry(), None);
}
