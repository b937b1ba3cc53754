use serde::{Deserialize, Serialize};

/// Aggregate metrics collected after a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    /// Number of completed ticks
    pub tick: u64,

    pub prey_count: usize,

    /// Every live predator, both solo and held inside packs
    pub predator_count: usize,

    pub pack_count: usize,

    /// Mean kill count over all live predators (0 with no predators)
    pub average_kills_per_predator: f64,

    /// Mean prey age in simulated time units (0 with no prey)
    pub average_prey_age: f64,
}

impl TickSnapshot {
    /// True when both animal populations have died out
    pub fn is_extinct(&self) -> bool {
        self.prey_count == 0 && self.predator_count == 0
    }
}
