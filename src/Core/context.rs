use std::sync::Arc;

use super::view::ChannelView;
use super::SharedArray::SharedArrayBackend;
use crate::Comms::Wire::Location;

/// Compute cost of each shared-array operation, charged against the turn budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostTable {
    pub shared_read: u32,
    pub shared_write: u32,
    pub header_decode: u32,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            shared_read: 2,
            shared_write: 100,
            header_decode: 10,
        }
    }
}

/// The per-turn compute allowance.
///
/// Charging never fails: operations check `can_afford` before they start and,
/// once started, always run to completion, so the budget simply saturates at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnBudget {
    remaining: u32,
    spent: u32,
}

impl TurnBudget {
    pub fn new(allowance: u32) -> Self {
        Self {
            remaining: allowance,
            spent: 0,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn spent(&self) -> u32 {
        self.spent
    }

    pub fn can_afford(&self, units: u32) -> bool {
        self.remaining >= units
    }

    pub fn charge(&mut self, units: u32) {
        self.remaining = self.remaining.saturating_sub(units);
        self.spent = self.spent.saturating_add(units);
    }
}

/// Everything one agent needs for one turn, passed explicitly instead of read
/// from globals: the engine's shared array, the absolute round, the budget,
/// a seeded RNG and the agent's sensed location.
pub struct TurnContext {
    shared: Arc<dyn SharedArrayBackend>,
    costs: CostTable,
    pub agent_id: u32,
    pub round: u32,
    pub budget: TurnBudget,
    pub rng: fastrand::Rng,
    pub location: Option<Location>,
}

impl TurnContext {
    /// Create a context for `agent_id`. The RNG is seeded from `seed` so
    /// replays are deterministic.
    pub fn new(shared: Arc<dyn SharedArrayBackend>, agent_id: u32, seed: u64) -> Self {
        Self {
            shared,
            costs: CostTable::default(),
            agent_id,
            round: 0,
            budget: TurnBudget::new(0),
            rng: fastrand::Rng::with_seed(seed),
            location: None,
        }
    }

    pub fn with_costs(mut self, costs: CostTable) -> Self {
        self.costs = costs;
        self
    }

    /// Reset the round and the budget at the start of a turn.
    pub fn begin_turn(&mut self, round: u32, allowance: u32) {
        self.round = round;
        self.budget = TurnBudget::new(allowance);
    }

    /// Budget-charged access to the shared array for the rest of this turn.
    pub fn view(&mut self) -> ChannelView<'_> {
        ChannelView::new(&*self.shared, &mut self.budget, self.costs)
    }

    pub fn shared(&self) -> &Arc<dyn SharedArrayBackend> {
        &self.shared
    }

    pub fn costs(&self) -> CostTable {
        self.costs
    }
}

impl std::fmt::Debug for TurnContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::Debug::StructDebug::debug_turn_context(self, f)
    }
}
