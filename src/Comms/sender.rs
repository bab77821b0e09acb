// src/Comms/sender.rs

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{debug, warn};

use crate::Comms::Region::RegionTracker;
use crate::Comms::Structs::{ClaimTicket, OutboundId, Outgoing};
use crate::Comms::Wire::Header;
use crate::Core::view::ChannelView;

/// Budget that must remain before a send is started. Large enough for a
/// maximum-size write plus the header reads of an eviction.
pub const DEFAULT_MIN_SEND_BUDGET: u32 = 1000;

/// Messages younger than this many rounds are never evicted to make room.
pub const DEFAULT_RETENTION_ROUNDS: u8 = 1;

/// One locally queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedSend {
    pub id: OutboundId,
    pub target_round: u32,
    pub outgoing: Outgoing,
}

// Max-heap order: earliest target round first, then highest priority, then
// first enqueued.
impl Ord for QueuedSend {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .target_round
            .cmp(&self.target_round)
            .then(self.outgoing.priority.cmp(&other.outgoing.priority))
            .then(other.id.cmp(&self.id))
    }
}

impl PartialOrd for QueuedSend {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What one drain did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub sent: usize,
    pub rescheduled: usize,
    pub evicted_slots: usize,
    /// Claim tickets of the messages written, in write order.
    pub written: Vec<(OutboundId, ClaimTicket)>,
}

impl DrainReport {
    /// Ticket of the message enqueued as `id`, if it was written this drain.
    pub fn ticket(&self, id: OutboundId) -> Option<ClaimTicket> {
        self.written
            .iter()
            .find(|(written_id, _)| *written_id == id)
            .map(|(_, ticket)| *ticket)
    }
}

/// Per-agent outbound queue that publishes into the shared ring.
///
/// Enqueueing never touches the shared array. Draining writes whole messages
/// at `valid_end`, evicting the oldest messages first when the ring is full.
#[derive(Debug)]
pub struct SendScheduler {
    queue: BinaryHeap<QueuedSend>,
    next_id: u64,
    min_send_budget: u32,
    retention_rounds: u8,
}

impl SendScheduler {
    pub fn new(min_send_budget: u32, retention_rounds: u8) -> Self {
        Self {
            queue: BinaryHeap::new(),
            next_id: 0,
            min_send_budget,
            retention_rounds,
        }
    }

    /// Queue `outgoing` for publication on or after `target_round`.
    pub fn enqueue(&mut self, outgoing: impl Into<Outgoing>, target_round: u32) -> OutboundId {
        let id = OutboundId(self.next_id);
        self.next_id += 1;
        self.queue.push(QueuedSend {
            id,
            target_round,
            outgoing: outgoing.into(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queued messages in no particular order.
    pub fn pending(&self) -> impl Iterator<Item = &QueuedSend> {
        self.queue.iter()
    }

    /// Publish every due message the budget and the ring allow.
    ///
    /// Stops at the first message that cannot fit (it is pushed back one
    /// round) or when the remaining budget drops below the send margin. A
    /// message, once started, is always written completely.
    pub fn drain(&mut self, tracker: &mut RegionTracker, view: &mut ChannelView<'_>, round: u32) -> DrainReport {
        tracker.reload(view, round);
        let layout = tracker.layout();
        let mut report = DrainReport::default();

        while let Some(head) = self.queue.peek() {
            if head.target_round > round {
                break;
            }
            if !view.budget().can_afford(self.min_send_budget) {
                debug!(
                    "{} budget left, below the {} send margin; {} sends wait",
                    view.budget().remaining(),
                    self.min_send_budget,
                    self.queue.len()
                );
                break;
            }
            let Some(mut entry) = self.queue.pop() else {
                break;
            };

            let message = entry.outgoing.message;
            let size = message.size();
            if tracker.plan_room(view, size, round, self.retention_rounds).is_none() {
                warn!(
                    "no room for {:?} ({} slots, {} used), rescheduling to round {}",
                    message.kind(),
                    size,
                    tracker.used_slots(),
                    round + 1
                );
                entry.target_round = round + 1;
                self.queue.push(entry);
                report.rescheduled += 1;
                break;
            }

            let header = Header::new(entry.outgoing.priority, message.kind(), round);
            let encoded = message.encode(&header);
            let origin = tracker.valid_end();
            for (i, &word) in encoded.as_slice().iter().enumerate() {
                let slot = layout.wrap(origin + i);
                // evict before overwrite
                report.evicted_slots += tracker.advance_start_past(view, slot);
                view.store(slot, word);
            }
            tracker.commit_write(encoded.len());

            debug!("sent {} at {}: {:?} -> {}", header, origin, encoded.as_slice(), tracker);
            report.sent += 1;
            report.written.push((entry.id, ClaimTicket { slot: origin, header }));
        }

        tracker.persist(view);
        report
    }
}
