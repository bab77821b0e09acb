use super::context::{CostTable, TurnBudget};
use super::SharedArray::SharedArrayBackend;

/// Budget-charged window onto the shared array for a single turn.
///
/// Every load and store goes through here so that channel work is paid for
/// out of the same allowance as the rest of the agent's logic.
pub struct ChannelView<'a> {
    shared: &'a dyn SharedArrayBackend,
    budget: &'a mut TurnBudget,
    costs: CostTable,
}

impl<'a> ChannelView<'a> {
    pub fn new(shared: &'a dyn SharedArrayBackend, budget: &'a mut TurnBudget, costs: CostTable) -> Self {
        Self {
            shared,
            budget,
            costs,
        }
    }

    #[inline]
    pub fn load(&mut self, index: usize) -> u16 {
        self.budget.charge(self.costs.shared_read);
        self.shared.load(index)
    }

    #[inline]
    pub fn store(&mut self, index: usize, word: u16) {
        self.budget.charge(self.costs.shared_write);
        self.shared.store(index, word);
    }

    /// Charge the bookkeeping cost of turning one header word into a header.
    #[inline]
    pub fn charge_decode(&mut self) {
        self.budget.charge(self.costs.header_decode);
    }

    pub fn budget(&self) -> &TurnBudget {
        self.budget
    }

    pub fn costs(&self) -> CostTable {
        self.costs
    }

    /// Number of slots in the underlying array (N).
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }
}
