// A minimal stand-in for the game engine: owns the shared array, counts
// rounds and hands out one exclusive turn at a time.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;
use log::{trace, warn};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use super::context::TurnContext;
use super::SharedArray::SharedArrayBackend;
use crate::error::Result;

/// Compute units each agent gets per turn.
pub const DEFAULT_TURN_BUDGET: u32 = 10_000;

/// Something that takes turns.
pub trait Agent {
    fn take_turn(&mut self, ctx: &mut TurnContext) -> Result<()>;
}

impl<T: Agent + ?Sized> Agent for Box<T> {
    fn take_turn(&mut self, ctx: &mut TurnContext) -> Result<()> {
        (**self).take_turn(ctx)
    }
}

/// An agent together with its per-turn context.
#[derive(Debug)]
pub struct Seat<A> {
    pub agent: A,
    pub ctx: TurnContext,
}

impl<A: Agent> Seat<A> {
    pub fn new(agent: A, ctx: TurnContext) -> Self {
        Self { agent, ctx }
    }
}

pub struct Engine {
    shared: Arc<dyn SharedArrayBackend>,
    round: CachePadded<AtomicU32>,
    turn_lock: Mutex<()>,
    turn_budget: u32,
}

impl Engine {
    pub fn new(shared: Arc<dyn SharedArrayBackend>, turn_budget: u32) -> Self {
        Self {
            shared,
            round: CachePadded::new(AtomicU32::new(0)),
            turn_lock: Mutex::new(()),
            turn_budget,
        }
    }

    pub fn shared(&self) -> &Arc<dyn SharedArrayBackend> {
        &self.shared
    }

    pub fn round(&self) -> u32 {
        self.round.load(Ordering::Acquire)
    }

    pub fn turn_budget(&self) -> u32 {
        self.turn_budget
    }

    /// Returns the new round.
    pub fn advance_round(&self) -> u32 {
        self.round.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Run one agent's turn for the current round. Turns never overlap, even
    /// when seats live on different threads.
    pub fn run_turn<A: Agent + ?Sized>(&self, agent: &mut A, ctx: &mut TurnContext) -> Result<()> {
        let _turn = self.turn_lock.lock();
        ctx.begin_turn(self.round(), self.turn_budget);
        let result = agent.take_turn(ctx);
        trace!(
            "agent {} round {} spent {} of {}",
            ctx.agent_id,
            ctx.round,
            ctx.budget.spent(),
            self.turn_budget
        );
        result
    }

    /// Give every seat one turn in order, then advance the round.
    ///
    /// A turn that fails is logged and skipped; the rest still play. Returns
    /// the number of aborted turns.
    pub fn play_round<A: Agent>(&self, seats: &mut [Seat<A>]) -> usize {
        let mut aborted = 0;
        for seat in seats.iter_mut() {
            if let Err(err) = self.run_turn(&mut seat.agent, &mut seat.ctx) {
                warn!("agent {} aborted its turn in round {}: {}", seat.ctx.agent_id, self.round(), err);
                aborted += 1;
            }
        }
        self.advance_round();
        aborted
    }

    /// SHA-256 of the whole array, for comparing replays.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for word in self.shared.words() {
            hasher.update(word.to_le_bytes());
        }
        hasher.finalize().into()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("shared", &self.shared)
            .field("round", &self.round())
            .field("turn_budget", &self.turn_budget)
            .finish_non_exhaustive()
    }
}

/// Lowercase hex of a digest.
pub fn hex_digest(digest: &[u8; 32]) -> String {
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}
