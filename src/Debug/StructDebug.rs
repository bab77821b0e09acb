use std::fmt;

use crate::Comms::Communicator;
use crate::Comms::Region::RegionTracker;
use crate::Core::context::TurnContext;

/// Debug function for RegionTracker
///
/// Shows the span, fill state, symmetry deductions and whether the local
/// copy still has to be published.
pub fn debug_region_tracker(tracker: &RegionTracker, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RegionTracker")
        .field("valid_start", &tracker.valid_start)
        .field("valid_end", &tracker.valid_end)
        .field("full", &tracker.full)
        .field("used", &tracker.used_slots())
        .field("region_len", &tracker.layout.region_len())
        .field("symmetry_bits", &format_args!("{:#05b}", tracker.symmetry_bits >> 1))
        .field("known_symmetry", &tracker.known_symmetry)
        .field("dirty", &tracker.dirty)
        .field("loaded_round", &tracker.loaded_round)
        .finish()
}

/// Debug function for TurnContext
///
/// The shared array is opaque; only its handle is shown.
pub fn debug_turn_context(ctx: &TurnContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TurnContext")
        .field("agent_id", &ctx.agent_id)
        .field("round", &ctx.round)
        .field("budget", &ctx.budget)
        .field("shared", &ctx.shared().raw_handle())
        .field("location", &ctx.location)
        .finish_non_exhaustive()
}

pub fn debug_communicator(comms: &Communicator, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Communicator")
        .field("meta", &format_args!("{}", comms.meta))
        .field("pending", &comms.pending_len())
        .field("marker", &comms.reader().marker())
        .field("caught_up", &comms.reader().caught_up())
        .finish_non_exhaustive()
}
