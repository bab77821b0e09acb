use std::sync::Arc;

use super::communicator::Communicator;
use super::reader::{ChannelReader, DEFAULT_MIN_READ_BUDGET};
use super::sender::{SendScheduler, DEFAULT_MIN_SEND_BUDGET, DEFAULT_RETENTION_ROUNDS};
use super::Region::{ChannelLayout, DEFAULT_HEADER_SLOTS, DEFAULT_SHARED_LEN};
use crate::error::{CommsError, Result};
use crate::Core::context::{CostTable, TurnContext};
use crate::Core::engine::{Engine, DEFAULT_TURN_BUDGET};
use crate::Core::SharedArray::{attach_shared_array, create_shared_array, SharedArrayBackend};

#[derive(Debug, Clone)]
pub struct ChannelBuilder {
    shared_len: usize,
    header_slots: usize,
    min_send_budget: u32,
    min_read_budget: u32,
    retention_rounds: u8,
    max_age: Option<u8>,
    costs: CostTable,
    turn_budget: u32,
    shm_name: Option<String>,
}

impl Default for ChannelBuilder {
    fn default() -> Self {
        Self {
            shared_len: DEFAULT_SHARED_LEN,
            header_slots: DEFAULT_HEADER_SLOTS,
            min_send_budget: DEFAULT_MIN_SEND_BUDGET,
            min_read_budget: DEFAULT_MIN_READ_BUDGET,
            retention_rounds: DEFAULT_RETENTION_ROUNDS,
            max_age: None, // dispatch everything live
            costs: CostTable::default(),
            turn_budget: DEFAULT_TURN_BUDGET,
            shm_name: None,
        }
    }
}

impl ChannelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total slots in the shared array (N).
    pub fn with_shared_len(mut self, len: usize) -> Self {
        self.shared_len = len;
        self
    }

    /// Slots reserved at the end of the array (K). The first holds the channel header.
    pub fn with_header_slots(mut self, slots: usize) -> Self {
        self.header_slots = slots;
        self
    }

    pub fn with_min_send_budget(mut self, budget: u32) -> Self {
        self.min_send_budget = budget;
        self
    }

    pub fn with_min_read_budget(mut self, budget: u32) -> Self {
        self.min_read_budget = budget;
        self
    }

    /// Messages younger than `rounds` are never evicted to make room. 0 lets
    /// a send evict anything, including this round's messages.
    pub fn with_retention_rounds(mut self, rounds: u8) -> Self {
        self.retention_rounds = rounds;
        self
    }

    pub fn with_max_age(mut self, max_age: Option<u8>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_cost_table(mut self, costs: CostTable) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_turn_budget(mut self, budget: u32) -> Self {
        self.turn_budget = budget;
        self
    }

    /// Back the array with `/dev/shm/<name>` instead of the heap.
    pub fn with_shm_name(mut self, name: impl Into<String>) -> Self {
        self.shm_name = Some(name.into());
        self
    }

    pub fn build_layout(&self) -> Result<ChannelLayout> {
        ChannelLayout::new(self.shared_len, self.header_slots)
    }

    /// A zeroed in-process array. All zeroes is a valid empty channel.
    pub fn build_shared(&self) -> Result<Arc<dyn SharedArrayBackend>> {
        let layout = self.build_layout()?;
        Ok(create_shared_array(layout.shared_len(), None)?)
    }

    /// Create the named `/dev/shm` array, replacing any stale one.
    pub fn build_shared_in_shm(&self) -> Result<Arc<dyn SharedArrayBackend>> {
        let layout = self.build_layout()?;
        let name = self.shm_name()?;
        Ok(create_shared_array(layout.shared_len(), Some(name))?)
    }

    /// Map an array another process created with `build_shared_in_shm`.
    pub fn attach_shared_in_shm(&self) -> Result<Arc<dyn SharedArrayBackend>> {
        let layout = self.build_layout()?;
        let name = self.shm_name()?;
        Ok(attach_shared_array(name, layout.shared_len())?)
    }

    pub fn build_communicator(&self) -> Result<Communicator> {
        let layout = self.build_layout()?;
        Ok(Communicator::new(
            layout,
            SendScheduler::new(self.min_send_budget, self.retention_rounds),
            ChannelReader::new(self.min_read_budget, self.max_age),
        ))
    }

    /// A context for `agent_id` over `shared`, with a deterministic RNG.
    pub fn build_context(
        &self,
        shared: Arc<dyn SharedArrayBackend>,
        agent_id: u32,
        seed: u64,
    ) -> Result<TurnContext> {
        self.check_len(shared.as_ref())?;
        Ok(TurnContext::new(shared, agent_id, seed).with_costs(self.costs))
    }

    pub fn build_engine(&self, shared: Arc<dyn SharedArrayBackend>) -> Result<Engine> {
        self.check_len(shared.as_ref())?;
        Ok(Engine::new(shared, self.turn_budget))
    }

    fn shm_name(&self) -> Result<&str> {
        self.shm_name
            .as_deref()
            .ok_or_else(|| CommsError::InvalidConfig("no shared memory name set".into()))
    }

    fn check_len(&self, shared: &dyn SharedArrayBackend) -> Result<()> {
        let layout = self.build_layout()?;
        if shared.len() != layout.shared_len() {
            return Err(CommsError::InvalidConfig(format!(
                "shared array has {} slots, layout expects {}",
                shared.len(),
                layout.shared_len()
            )));
        }
        Ok(())
    }
}
