use crate::agent::{Agent, AgentField, AgentId, Breed, Pack, Predator, Prey, ResourcePatch};
use crate::error::ConsistencyError;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};

/// Breed-partitioned registry of live agents.
///
/// Membership here is what it means for an agent to be alive: removing an
/// id is its death. Breeds are remembered in the order they were first
/// registered, which is the order they are activated in.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    breeds: Vec<Breed>,
    registry: HashMap<Breed, BTreeMap<AgentId, Agent>>,
    index: HashMap<AgentId, Breed>,
    tick: u64,
}

macro_rules! typed_access {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&mut self, id: AgentId) -> Result<&mut $ty, ConsistencyError> {
            match self.get_mut(id)? {
                Agent::$variant(inner) => Ok(inner),
                other => Err(ConsistencyError::BreedMismatch {
                    id,
                    expected: Breed::$variant,
                    actual: other.breed(),
                }),
            }
        }
    };
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed ticks
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn advance_tick(&mut self) {
        self.tick += 1;
    }

    pub fn add(&mut self, id: AgentId, agent: Agent) -> Result<(), ConsistencyError> {
        if self.index.contains_key(&id) {
            return Err(ConsistencyError::DuplicateId(id));
        }
        let breed = agent.breed();
        if !self.breeds.contains(&breed) {
            self.breeds.push(breed);
        }
        self.registry.entry(breed).or_default().insert(id, agent);
        self.index.insert(id, breed);
        Ok(())
    }

    /// Deregister `id`, handing back the entity
    pub fn remove(&mut self, id: AgentId) -> Result<Agent, ConsistencyError> {
        let breed = self
            .index
            .remove(&id)
            .ok_or(ConsistencyError::NotFound(id))?;
        self.registry
            .get_mut(&breed)
            .and_then(|agents| agents.remove(&id))
            .ok_or(ConsistencyError::NotFound(id))
    }

    /// Deregister a pack. Anything else is left registered.
    pub fn remove_pack(&mut self, id: AgentId) -> Result<Pack, ConsistencyError> {
        match self.breed_of(id) {
            Some(Breed::Pack) => {}
            Some(actual) => {
                return Err(ConsistencyError::BreedMismatch {
                    id,
                    expected: Breed::Pack,
                    actual,
                })
            }
            None => return Err(ConsistencyError::NotFound(id)),
        }
        match self.remove(id)? {
            Agent::Pack(pack) => Ok(pack),
            other => Err(ConsistencyError::BreedMismatch {
                id,
                expected: Breed::Pack,
                actual: other.breed(),
            }),
        }
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn breed_of(&self, id: AgentId) -> Option<Breed> {
        self.index.get(&id).copied()
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        let breed = self.index.get(&id)?;
        self.registry.get(breed)?.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Result<&mut Agent, ConsistencyError> {
        let breed = self
            .index
            .get(&id)
            .ok_or(ConsistencyError::NotFound(id))?;
        self.registry
            .get_mut(breed)
            .and_then(|agents| agents.get_mut(&id))
            .ok_or(ConsistencyError::NotFound(id))
    }

    typed_access!(prey_mut, Prey, Prey);
    typed_access!(predator_mut, Predator, Predator);
    typed_access!(pack_mut, Pack, Pack);
    typed_access!(patch_mut, Patch, ResourcePatch);

    pub fn predator(&self, id: AgentId) -> Option<&Predator> {
        self.get(id).and_then(Agent::as_predator)
    }

    pub fn pack(&self, id: AgentId) -> Option<&Pack> {
        self.get(id).and_then(Agent::as_pack)
    }

    /// Total live agents across all breeds
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn count(&self, breed: Breed) -> usize {
        self.registry.get(&breed).map_or(0, BTreeMap::len)
    }

    /// Mean of `field` over live agents of `breed`; 0 when there are none
    pub fn average(&self, breed: Breed, field: AgentField) -> f64 {
        let (sum, n) = self
            .agents(breed)
            .filter_map(|(_, agent)| agent.field(field))
            .fold((0.0, 0usize), |(sum, n), value| (sum + value, n + 1));
        if n == 0 {
            0.0
        } else {
            sum / n as f64
        }
    }

    /// Live agents of `breed` in id order
    pub fn agents(&self, breed: Breed) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.registry
            .get(&breed)
            .into_iter()
            .flat_map(|agents| agents.iter().map(|(&id, agent)| (id, agent)))
    }

    pub fn ids(&self, breed: Breed) -> Vec<AgentId> {
        self.registry
            .get(&breed)
            .map(|agents| agents.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Breeds with at least one live agent, in registration order
    pub fn active_breeds(&self) -> Vec<Breed> {
        self.breeds
            .iter()
            .copied()
            .filter(|&breed| self.count(breed) > 0)
            .collect()
    }

    /// Snapshot of one breed's ids in a fresh random order
    pub fn shuffled(&self, breed: Breed, rng: &mut impl Rng) -> Vec<AgentId> {
        let mut ids = self.ids(breed);
        ids.shuffle(rng);
        ids
    }

    /// Snapshot of every live id, all breeds mixed, in a fresh random order
    pub fn shuffled_all(&self, rng: &mut impl Rng) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self
            .breeds
            .iter()
            .flat_map(|&breed| self.ids(breed))
            .collect();
        ids.shuffle(rng);
        ids
    }
}
