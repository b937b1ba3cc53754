use std::fmt;

/// Stable identifier handed out by the model, never reused within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Agent variant, used to partition scheduling and aggregate queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Breed {
    Prey,
    Predator,
    Pack,
    Patch,
}

/// Numeric attribute that can be averaged over a breed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentField {
    Energy,
    Age,
    Kills,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prey {
    pub energy: f64,
    pub age: f64,
}

impl Prey {
    pub fn new(energy: f64, age: f64) -> Self {
        Self { energy, age }
    }

    /// Advance age and pay the per-tick energy cost
    pub fn metabolize(&mut self, cost: f64, age_increment: f64) {
        self.age += age_increment;
        self.energy -= cost;
    }

    pub fn is_dead(&self) -> bool {
        self.energy < 0.0
    }

    /// Halve energy and return a newborn carrying the other half
    pub fn give_birth(&mut self) -> Prey {
        self.energy /= 2.0;
        Prey::new(self.energy, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predator {
    pub energy: f64,
    pub kills: u32,
    /// Pack currently holding this predator. Never owns the pack.
    pub pack: Option<AgentId>,
}

impl Predator {
    pub fn new(energy: f64) -> Self {
        Self {
            energy,
            kills: 0,
            pack: None,
        }
    }

    pub fn is_grouped(&self) -> bool {
        self.pack.is_some()
    }

    pub fn is_hungry(&self, threshold: f64) -> bool {
        self.energy < threshold
    }

    /// Hungry and free to join or found a pack
    pub fn seeks_pack(&self, threshold: f64) -> bool {
        self.is_hungry(threshold) && !self.is_grouped()
    }

    pub fn is_dead(&self) -> bool {
        self.energy < 0.0
    }

    pub fn record_kill(&mut self, gain: f64) {
        self.energy += gain;
        self.kills += 1;
    }

    /// Halve energy and return a cub in the same pack as its parent
    pub fn give_birth(&mut self) -> Predator {
        self.energy /= 2.0;
        Predator {
            energy: self.energy,
            kills: 0,
            pack: self.pack,
        }
    }
}

/// A group of predators acting as one scheduled unit
#[derive(Debug, Clone, PartialEq)]
pub struct Pack {
    pub members: Vec<AgentId>,
    /// Below this many members the pack disbands
    pub min_size: usize,
    /// At or above this many members the pack can attack
    pub attack_size: usize,
}

impl Pack {
    pub fn new(min_size: usize, attack_size: usize) -> Self {
        Self {
            members: Vec::new(),
            min_size,
            attack_size,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Still recruiting: too small to attack
    pub fn is_forming(&self) -> bool {
        self.members.len() < self.attack_size
    }

    pub fn is_viable(&self) -> bool {
        !self.is_forming()
    }

    pub fn below_minimum(&self) -> bool {
        self.members.len() < self.min_size
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePatch {
    pub fully_grown: bool,
    pub countdown: u32,
}

impl ResourcePatch {
    pub fn new(fully_grown: bool, countdown: u32) -> Self {
        Self {
            fully_grown,
            countdown,
        }
    }

    /// Count down towards regrowth
    pub fn grow(&mut self) {
        if self.fully_grown {
            return;
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.fully_grown = true;
        }
    }

    /// Eat the patch if it is grown, restarting the countdown.
    /// Returns whether anything was eaten.
    pub fn graze(&mut self, regrowth_time: u32) -> bool {
        if !self.fully_grown {
            return false;
        }
        self.fully_grown = false;
        self.countdown = regrowth_time;
        true
    }
}

/// Every schedulable entity
#[derive(Debug, Clone, PartialEq)]
pub enum Agent {
    Prey(Prey),
    Predator(Predator),
    Pack(Pack),
    Patch(ResourcePatch),
}

impl Agent {
    pub fn breed(&self) -> Breed {
        match self {
            Agent::Prey(_) => Breed::Prey,
            Agent::Predator(_) => Breed::Predator,
            Agent::Pack(_) => Breed::Pack,
            Agent::Patch(_) => Breed::Patch,
        }
    }

    /// Value of `field` if this variant carries it
    pub fn field(&self, field: AgentField) -> Option<f64> {
        match (self, field) {
            (Agent::Prey(p), AgentField::Energy) => Some(p.energy),
            (Agent::Prey(p), AgentField::Age) => Some(p.age),
            (Agent::Predator(p), AgentField::Energy) => Some(p.energy),
            (Agent::Predator(p), AgentField::Kills) => Some(f64::from(p.kills)),
            _ => None,
        }
    }

    pub fn as_prey(&self) -> Option<&Prey> {
        match self {
            Agent::Prey(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_predator(&self) -> Option<&Predator> {
        match self {
            Agent::Predator(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_pack(&self) -> Option<&Pack> {
        match self {
            Agent::Pack(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_patch(&self) -> Option<&ResourcePatch> {
        match self {
            Agent::Patch(p) => Some(p),
            _ => None,
        }
    }
}
