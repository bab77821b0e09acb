// Helpers shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use swarmcast::Comms::Region::{ChannelLayout, RegionTracker};
use swarmcast::Comms::Structs::{Message, ReceivedMessage};
use swarmcast::Comms::Wire::Header;
use swarmcast::Comms::{ChannelBuilder, Communicator};
use swarmcast::Core::context::{CostTable, TurnBudget, TurnContext};
use swarmcast::Core::view::ChannelView;
use swarmcast::Core::SharedArrayBackend;

pub const TURN_BUDGET: u32 = 10_000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One agent: its end of the channel plus its turn context.
pub struct TestAgent {
    pub comms: Communicator,
    pub ctx: TurnContext,
}

impl TestAgent {
    pub fn new(builder: &ChannelBuilder, shared: &Arc<dyn SharedArrayBackend>, id: u32) -> Self {
        Self {
            comms: builder.build_communicator().unwrap(),
            ctx: builder.build_context(Arc::clone(shared), id, id as u64).unwrap(),
        }
    }

    pub fn begin(&mut self, round: u32) {
        self.ctx.begin_turn(round, TURN_BUDGET);
    }

    /// Read everything new this turn.
    pub fn read(&mut self) -> Vec<ReceivedMessage> {
        let mut inbox = Vec::new();
        self.comms.read_and_dispatch(&mut self.ctx, &mut inbox).unwrap();
        inbox
    }

    /// Enqueue `messages` for this round, drain and publish.
    pub fn send(&mut self, messages: &[Message]) -> swarmcast::Comms::DrainReport {
        for message in messages {
            self.comms.enqueue_now(&self.ctx, *message);
        }
        let report = self.comms.drain(&mut self.ctx);
        self.comms.end_turn(&mut self.ctx);
        report
    }
}

pub fn heap_channel(shared_len: usize) -> (ChannelBuilder, Arc<dyn SharedArrayBackend>) {
    let builder = ChannelBuilder::new().with_shared_len(shared_len);
    let shared = builder.build_shared().unwrap();
    (builder, shared)
}

pub fn raw(tag: u16) -> Message {
    Message::Raw {
        words: [tag, 0xBEEF, !tag],
    }
}

pub fn raw_tag(message: &Message) -> Option<u16> {
    match message {
        Message::Raw { words } => Some(words[0]),
        _ => None,
    }
}

/// The channel as the array currently publishes it, read with an unlimited budget.
pub fn published_tracker(shared: &dyn SharedArrayBackend, layout: ChannelLayout) -> RegionTracker {
    let mut budget = TurnBudget::new(u32::MAX);
    let mut view = ChannelView::new(shared, &mut budget, CostTable::default());
    let mut tracker = RegionTracker::new(layout);
    tracker.reload(&mut view, 0);
    tracker
}

/// Decode the published span into `(slot, header)` pairs, asserting it is
/// made of whole, valid messages back to back.
pub fn published_messages(shared: &dyn SharedArrayBackend, layout: ChannelLayout) -> Vec<(usize, Header)> {
    let tracker = published_tracker(shared, layout);
    let used = tracker.used_slots();
    let mut cursor = tracker.valid_start();
    let mut consumed = 0;
    let mut messages = Vec::new();
    while consumed < used {
        let header = Header::decode(shared.load(cursor), cursor)
            .unwrap_or_else(|err| panic!("span {} broken: {}", tracker, err));
        assert!(
            consumed + header.size() <= used,
            "message at {} runs past the end of {}",
            cursor,
            tracker
        );
        messages.push((cursor, header));
        consumed += header.size();
        cursor = layout.wrap(cursor + header.size());
    }
    assert_eq!(cursor, tracker.valid_end());
    messages
}
