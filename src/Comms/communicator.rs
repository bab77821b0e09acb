// src/Comms/communicator.rs

use log::debug;

use crate::error::Result;
use crate::Comms::reader::{ChannelReader, MessageHandler, Responder};
use crate::Comms::sender::{DrainReport, QueuedSend, SendScheduler};
use crate::Comms::Region::{ChannelLayout, MapSymmetry, RegionTracker};
use crate::Comms::Structs::{ClaimTicket, OutboundId, Outgoing, ReceivedMessage, RequestStatus};
use crate::Comms::Wire::Location;
use crate::Core::context::TurnContext;

/// One agent's end of the broadcast channel.
///
/// A turn looks like: `read_and_dispatch`, agent logic (which may `enqueue`),
/// `drain`, `end_turn`. Every method that touches the shared array takes the
/// turn's context and pays for its loads and stores out of its budget.
pub struct Communicator {
    layout: ChannelLayout,
    /// Local copy of the channel header.
    pub meta: RegionTracker,
    scheduler: SendScheduler,
    reader: ChannelReader,
    /// Tickets of what we wrote since the last read, collected next turn.
    sent: Vec<ClaimTicket>,
}

impl Communicator {
    pub fn new(layout: ChannelLayout, scheduler: SendScheduler, reader: ChannelReader) -> Self {
        Self {
            layout,
            meta: RegionTracker::new(layout),
            scheduler,
            reader,
            sent: Vec::new(),
        }
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Collect our previous sends, then hand each message not seen before to
    /// `handler`. Returns how many were dispatched.
    pub fn read_and_dispatch<H: MessageHandler + ?Sized>(
        &mut self,
        ctx: &mut TurnContext,
        handler: &mut H,
    ) -> Result<usize> {
        let round = ctx.round;
        let mut view = ctx.view();
        self.reader
            .read_and_dispatch(&mut self.meta, &mut view, round, &mut self.sent, handler)
    }

    /// Queue a message for `target_round`. Nothing is written until `drain`.
    pub fn enqueue(&mut self, outgoing: impl Into<Outgoing>, target_round: u32) -> OutboundId {
        self.scheduler.enqueue(outgoing, target_round)
    }

    /// Queue a message for the current round.
    pub fn enqueue_now(&mut self, ctx: &TurnContext, outgoing: impl Into<Outgoing>) -> OutboundId {
        self.scheduler.enqueue(outgoing, ctx.round)
    }

    /// Publish what is due and fits.
    pub fn drain(&mut self, ctx: &mut TurnContext) -> DrainReport {
        let round = ctx.round;
        let mut view = ctx.view();
        let report = self.scheduler.drain(&mut self.meta, &mut view, round);
        if !report.written.is_empty() {
            let before = self.sent.len();
            self.sent.extend(report.written.iter().map(|(_, ticket)| *ticket));
            self.reader.note_own_writes(round, &self.sent[before..], self.layout);
        }
        report
    }

    /// Publish the channel header if this turn changed it.
    pub fn end_turn(&mut self, ctx: &mut TurnContext) -> bool {
        let mut view = ctx.view();
        let written = self.meta.persist(&mut view);
        if written {
            debug!("agent {} published {}", ctx.agent_id, self.meta);
        }
        written
    }

    pub fn header_matches(&self, ctx: &mut TurnContext, ticket: &ClaimTicket) -> bool {
        let mut view = ctx.view();
        Responder::new(&mut view, self.layout).header_matches(ticket)
    }

    /// State of a request we sent.
    pub fn poll_response(&self, ctx: &mut TurnContext, ticket: &ClaimTicket) -> RequestStatus {
        let mut view = ctx.view();
        Responder::new(&mut view, self.layout).poll_response(ticket)
    }

    /// Answer someone's request. False if the ticket is stale or not a request.
    pub fn respond(&self, ctx: &mut TurnContext, ticket: &ClaimTicket, answer: Location) -> bool {
        let mut view = ctx.view();
        Responder::new(&mut view, self.layout).respond(ticket, answer)
    }

    /// Copy the payload of the message behind `ticket` into `out`.
    ///
    /// Returns the number of words copied, or `None` if the ticket is stale.
    pub fn read_words(&self, ctx: &mut TurnContext, ticket: &ClaimTicket, out: &mut [u16]) -> Option<usize> {
        let region_len = self.layout.region_len();
        let mut view = ctx.view();
        if !Responder::new(&mut view, self.layout).header_matches(ticket) {
            return None;
        }
        let len = out.len().min(ticket.header.payload_len as usize);
        for (n, word) in out.iter_mut().take(len).enumerate() {
            *word = view.load(ticket.payload_slot(n, region_len));
        }
        Some(len)
    }

    /// Overwrite payload words of the message behind `ticket`, starting at
    /// payload word `offset`. Words past the payload are dropped.
    ///
    /// Returns the number of words written, or `None` if the ticket is stale.
    pub fn write_words(
        &self,
        ctx: &mut TurnContext,
        ticket: &ClaimTicket,
        offset: usize,
        words: &[u16],
    ) -> Option<usize> {
        let region_len = self.layout.region_len();
        let mut view = ctx.view();
        if !Responder::new(&mut view, self.layout).header_matches(ticket) {
            return None;
        }
        let room = (ticket.header.payload_len as usize).saturating_sub(offset);
        let len = words.len().min(room);
        for (n, &word) in words.iter().take(len).enumerate() {
            view.store(ticket.payload_slot(offset + n, region_len), word);
        }
        Some(len)
    }

    /// Decode every live message without dispatching.
    pub fn snapshot(&mut self, ctx: &mut TurnContext) -> Result<Vec<ReceivedMessage>> {
        let round = ctx.round;
        let mut view = ctx.view();
        self.meta.reload(&mut view, round);
        self.reader.snapshot(&self.meta, &mut view, round)
    }

    pub fn set_symmetry_cant_be(&mut self, symmetry: MapSymmetry) {
        self.meta.set_symmetry_cant_be(symmetry);
    }

    pub fn pending_sends(&self) -> impl Iterator<Item = &QueuedSend> {
        self.scheduler.pending()
    }

    pub fn pending_len(&self) -> usize {
        self.scheduler.len()
    }

    pub fn reader(&self) -> &ChannelReader {
        &self.reader
    }
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::Debug::StructDebug::debug_communicator(self, f)
    }
}
