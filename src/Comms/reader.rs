// src/Comms/reader.rs

use log::{debug, error};

use crate::error::{CommsError, Result};
use crate::Comms::Region::{ChannelLayout, RegionTracker};
use crate::Comms::Structs::{
    decode_answer, encode_answer, ClaimTicket, Message, MessageKind, ReceivedMessage, RequestStatus,
    MAX_PAYLOAD_WORDS,
};
use crate::Comms::Wire::{Header, Location};
use crate::Core::view::ChannelView;

/// Budget that must remain before the reader decodes another message.
pub const DEFAULT_MIN_READ_BUDGET: u32 = 20;

/// The agent's message-handling logic, called once per new message.
pub trait MessageHandler {
    fn on_message(&mut self, received: &ReceivedMessage, responder: &mut Responder<'_, '_>);
}

/// Collects every dispatched message.
impl MessageHandler for Vec<ReceivedMessage> {
    fn on_message(&mut self, received: &ReceivedMessage, _responder: &mut Responder<'_, '_>) {
        self.push(*received);
    }
}

/// In-place access to already published messages through their claim tickets.
///
/// This is the one sanctioned way to write into someone else's message: the
/// answer slot of a request. Every access re-validates the ticket first.
pub struct Responder<'v, 'a> {
    view: &'v mut ChannelView<'a>,
    layout: ChannelLayout,
}

impl<'v, 'a> Responder<'v, 'a> {
    pub fn new(view: &'v mut ChannelView<'a>, layout: ChannelLayout) -> Self {
        Self { view, layout }
    }

    /// True if the word at the ticket's slot is still the header that was written there.
    pub fn header_matches(&mut self, ticket: &ClaimTicket) -> bool {
        self.view.load(ticket.slot) == ticket.header.encode()
    }

    /// Write `answer` into the answer slot of the request behind `ticket`.
    ///
    /// Returns false, writing nothing, if the ticket is not a request or the
    /// request has been evicted.
    pub fn respond(&mut self, ticket: &ClaimTicket, answer: Location) -> bool {
        if ticket.header.kind != MessageKind::ResourceRequest || !self.header_matches(ticket) {
            return false;
        }
        let slot = ticket.payload_slot(0, self.layout.region_len());
        self.view.store(slot, encode_answer(Some(answer)));
        debug!("answered request at {} with {}", ticket.slot, answer);
        true
    }

    /// Check the answer slot of our own request.
    pub fn poll_response(&mut self, ticket: &ClaimTicket) -> RequestStatus {
        if !self.header_matches(ticket) {
            return RequestStatus::Gone;
        }
        let slot = ticket.payload_slot(0, self.layout.region_len());
        match decode_answer(self.view.load(slot)) {
            Some(location) => RequestStatus::Answered(location),
            None => RequestStatus::Pending,
        }
    }
}

/// Walks the live span each turn and hands new messages to the agent.
///
/// The reader remembers the last message it handled (its read marker). If
/// that message is still live next turn, everything up to it is skipped;
/// if it was evicted, everything live is newer and gets dispatched.
#[derive(Debug)]
pub struct ChannelReader {
    marker: Option<ClaimTicket>,
    caught_up: bool,
    /// `(round, slot)` where the last complete walk ended.
    walked_to: Option<(u32, usize)>,
    min_read_budget: u32,
    max_age: Option<u8>,
}

impl ChannelReader {
    pub fn new(min_read_budget: u32, max_age: Option<u8>) -> Self {
        Self {
            marker: None,
            caught_up: true,
            walked_to: None,
            min_read_budget,
            max_age,
        }
    }

    /// Last message handled or written by this agent.
    pub fn marker(&self) -> Option<ClaimTicket> {
        self.marker
    }

    /// False if the last walk stopped early for lack of budget.
    pub fn caught_up(&self) -> bool {
        self.caught_up
    }

    /// Evict our own earlier messages that sit at the front of the span, so
    /// others stop re-reading them. Stops at the first one that is not at the
    /// boundary or whose slot has since been reused. Collected tickets are
    /// removed from `sent`.
    pub fn collect_own(
        &self,
        tracker: &mut RegionTracker,
        view: &mut ChannelView<'_>,
        sent: &mut Vec<ClaimTicket>,
    ) -> usize {
        let mut collected = 0;
        for ticket in sent.iter() {
            if tracker.is_empty() || ticket.slot != tracker.valid_start() {
                break;
            }
            if view.load(ticket.slot) != ticket.header.encode() {
                break;
            }
            debug!("clean own {} at {}", ticket.header, ticket.slot);
            tracker.advance_start_past(view, ticket.slot);
            collected += 1;
        }
        sent.drain(..collected);
        collected
    }

    /// Reload the span, collect our own stale sends, then dispatch every
    /// message not seen before. Returns the number dispatched.
    ///
    /// Our own messages still in `sent` are walked past but not dispatched.
    /// `sent` is cleared once the walk completes.
    ///
    /// A header that fails to decode inside the span is fatal for this read:
    /// the span bookkeeping itself is inconsistent and the error is returned.
    pub fn read_and_dispatch<H: MessageHandler + ?Sized>(
        &mut self,
        tracker: &mut RegionTracker,
        view: &mut ChannelView<'_>,
        round: u32,
        sent: &mut Vec<ClaimTicket>,
        handler: &mut H,
    ) -> Result<usize> {
        tracker.reload(view, round);
        self.collect_own(tracker, view, sent);

        if tracker.is_empty() {
            self.finish_walk(tracker, round, sent);
            return Ok(0);
        }

        self.caught_up = false;
        self.walked_to = None;
        let layout = tracker.layout();
        let used = tracker.used_slots();
        let mut cursor = tracker.valid_start();
        let mut consumed = 0;

        if let Some(marker) = self.marker {
            if self.locate_marker(tracker, view, &marker)? {
                let skip = layout.distance(cursor, marker.slot) + marker.header.size();
                cursor = layout.wrap(cursor + skip);
                consumed = skip;
            }
        }

        let mut dispatched = 0;
        while consumed < used {
            if !view.budget().can_afford(self.min_read_budget) {
                debug!(
                    "read stopped at {} with {} budget left, {} slots unread",
                    cursor,
                    view.budget().remaining(),
                    used - consumed
                );
                return Ok(dispatched);
            }

            let received = decode_message_at(view, layout, cursor, used - consumed, round)?;
            let size = received.header().size();
            self.marker = Some(received.ticket);

            let own = sent.contains(&received.ticket);
            if !own && self.max_age.map_or(true, |max_age| received.age <= max_age) {
                handler.on_message(&received, &mut Responder::new(view, layout));
                dispatched += 1;
            }

            cursor = layout.wrap(cursor + size);
            consumed += size;
        }

        self.finish_walk(tracker, round, sent);
        Ok(dispatched)
    }

    fn finish_walk(&mut self, tracker: &RegionTracker, round: u32, sent: &mut Vec<ClaimTicket>) {
        self.caught_up = true;
        self.walked_to = Some((round, tracker.valid_end()));
        sent.clear();
    }

    /// Decode the whole span without dispatching or moving the marker.
    pub fn snapshot(
        &self,
        tracker: &RegionTracker,
        view: &mut ChannelView<'_>,
        round: u32,
    ) -> Result<Vec<ReceivedMessage>> {
        let layout = tracker.layout();
        let used = tracker.used_slots();
        let mut cursor = tracker.valid_start();
        let mut consumed = 0;
        let mut messages = Vec::new();
        while consumed < used {
            let received = decode_message_at(view, layout, cursor, used - consumed, round)?;
            let size = received.header().size();
            messages.push(received);
            cursor = layout.wrap(cursor + size);
            consumed += size;
        }
        Ok(messages)
    }

    /// Move the marker past our own writes, but only if they start exactly
    /// where this round's complete walk ended. Anything else may have
    /// unread messages in between.
    pub fn note_own_writes(&mut self, round: u32, written: &[ClaimTicket], layout: ChannelLayout) {
        let (first, last) = match (written.first(), written.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return,
        };
        if self.walked_to != Some((round, first.slot)) {
            return;
        }
        self.marker = Some(*last);
        self.walked_to = Some((round, layout.wrap(last.slot + last.header.size())));
    }

    /// True if `marker` is still a live message on the span's message boundaries.
    fn locate_marker(
        &self,
        tracker: &RegionTracker,
        view: &mut ChannelView<'_>,
        marker: &ClaimTicket,
    ) -> Result<bool> {
        if !tracker.contains(marker.slot) {
            return Ok(false);
        }
        let layout = tracker.layout();
        let used = tracker.used_slots();
        let target = layout.distance(tracker.valid_start(), marker.slot);
        if target + marker.header.size() > used {
            return Ok(false);
        }

        let mut cursor = tracker.valid_start();
        let mut consumed = 0;
        while consumed < target {
            let word = view.load(cursor);
            view.charge_decode();
            let header = Header::decode(word, cursor).map_err(|err| {
                error!("corrupt span while seeking read marker: {}", err);
                err
            })?;
            cursor = layout.wrap(cursor + header.size());
            consumed += header.size();
        }
        Ok(consumed == target && view.load(cursor) == marker.header.encode())
    }
}

/// Decode the message whose header sits at `slot`, given `remaining` live
/// slots from there to the end of the span.
fn decode_message_at(
    view: &mut ChannelView<'_>,
    layout: ChannelLayout,
    slot: usize,
    remaining: usize,
    round: u32,
) -> Result<ReceivedMessage> {
    let word = view.load(slot);
    view.charge_decode();
    let header = Header::decode(word, slot).map_err(|err| {
        error!("corrupt span: {}", err);
        err
    })?;
    if header.size() > remaining {
        let err = CommsError::SpanDesync {
            slot,
            needed: header.size(),
            remaining,
        };
        error!("corrupt span: {}", err);
        return Err(err);
    }

    let mut payload = [0u16; MAX_PAYLOAD_WORDS];
    let len = header.payload_len as usize;
    for (i, word) in payload.iter_mut().take(len).enumerate() {
        *word = view.load(layout.wrap(slot + 1 + i));
    }

    Ok(ReceivedMessage {
        message: Message::decode(header.kind, &payload[..len]),
        ticket: ClaimTicket { slot, header },
        age: header.age_at(round),
    })
}
