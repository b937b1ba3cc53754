use crate::agent::{Agent, AgentField, AgentId, Breed, Pack, Predator, Prey, ResourcePatch};
use crate::error::{ConsistencyError, Result, SimError};
use crate::grid::{Grid, Position};
use crate::scheduler::Scheduler;
use crate::trace::{SimEvent, TraceSink};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shared::{Activation, AgeCurve, AgeDistribution, ModelParams, TickSnapshot};
use tracing::{debug, info};

/// Age-dependent inputs precomputed outside the engine.
///
/// Every curve is optional; without one the matching constant from
/// [`ModelParams`] is used instead.
#[derive(Default)]
pub struct AgeCurves {
    /// Prey reproduction probability by age, replacing `prey_reproduce`
    pub reproduction: Option<Box<dyn AgeCurve>>,
    /// Probability that an attack on prey of a given age succeeds; scales
    /// `solo_attack_prob` and gates pack attacks
    pub predation: Option<Box<dyn AgeCurve>>,
    /// Starting age distribution for seeded prey
    pub age_distribution: Option<AgeDistribution>,
}

impl AgeCurves {
    pub fn with_reproduction(mut self, curve: impl AgeCurve + 'static) -> Self {
        self.reproduction = Some(Box::new(curve));
        self
    }

    pub fn with_predation(mut self, curve: impl AgeCurve + 'static) -> Self {
        self.predation = Some(Box::new(curve));
        self
    }

    pub fn with_age_distribution(mut self, distribution: AgeDistribution) -> Self {
        self.age_distribution = Some(distribution);
        self
    }
}

/// Spacing of the default starting-age grid, one two-week tick
const SEED_AGE_STEP: f64 = 1.0 / 26.0;

fn evaluate(curve: Option<&dyn AgeCurve>, age: f64) -> Option<f64> {
    curve.map(|c| {
        let p = c.at(age);
        if p.is_nan() {
            0.0
        } else {
            p.clamp(0.0, 1.0)
        }
    })
}

/// The wolf/elk world: grid, scheduler, parameters and the single RNG
/// stream every stochastic decision draws from.
pub struct Model {
    pub(crate) params: ModelParams,
    pub(crate) curves: AgeCurves,
    pub(crate) grid: Grid,
    pub(crate) scheduler: Scheduler,
    pub(crate) rng: ChaCha8Rng,
    next_id: u64,
    sink: Option<Box<dyn TraceSink>>,
}

impl Model {
    /// Validate `params` and seed the initial population
    pub fn new(params: ModelParams) -> Result<Self> {
        Self::with_curves(params, AgeCurves::default())
    }

    pub fn with_curves(params: ModelParams, curves: AgeCurves) -> Result<Self> {
        let mut model = Self::unseeded(params, curves)?;
        model.seed_population()?;
        model.seed_patches()?;

        debug!(
            "Seeded {} prey and {} predators on a {}x{} grid",
            model.scheduler.count(Breed::Prey),
            model.scheduler.count(Breed::Predator),
            model.params.width,
            model.params.height
        );
        Ok(model)
    }

    /// A world with grass but no animals, for callers that place their own
    /// population. `initial_prey` and `initial_predators` are ignored.
    pub fn empty(params: ModelParams) -> Result<Self> {
        let mut model = Self::unseeded(params, AgeCurves::default())?;
        model.seed_patches()?;
        Ok(model)
    }

    fn unseeded(params: ModelParams, curves: AgeCurves) -> Result<Self> {
        params.validate()?;
        Ok(Model {
            grid: Grid::new(params.width, params.height, params.moore),
            scheduler: Scheduler::new(),
            rng: ChaCha8Rng::seed_from_u64(params.seed),
            next_id: 1,
            sink: None,
            params,
            curves,
        })
    }

    fn seed_population(&mut self) -> Result<()> {
        let ages = self
            .curves
            .age_distribution
            .clone()
            .or_else(|| AgeDistribution::uniform(1.0, 20.0, SEED_AGE_STEP));

        let gain = self.params.prey_gain_from_food;
        for _ in 0..self.params.initial_prey {
            let pos = self.random_cell();
            let age = ages.as_ref().map_or(0.0, |dist| dist.sample(&mut self.rng));
            let energy = gain + self.rng.gen::<f64>() * gain;
            self.spawn(Agent::Prey(Prey::new(energy, age)), Some(pos), None)?;
        }

        let threshold = self.params.hunger_threshold;
        for _ in 0..self.params.initial_predators {
            let pos = self.random_cell();
            let energy = threshold + self.rng.gen::<f64>() * threshold;
            self.spawn(Agent::Predator(Predator::new(energy)), Some(pos), None)?;
        }
        Ok(())
    }

    /// One patch per cell, half of them grown
    fn seed_patches(&mut self) -> Result<()> {
        let (width, height) = (self.params.width, self.params.height);
        let regrowth = self.params.grass_regrowth_time;
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let fully_grown: bool = self.rng.gen();
                let countdown = if fully_grown {
                    regrowth
                } else {
                    self.rng.gen_range(0..regrowth)
                };
                let patch = ResourcePatch::new(fully_grown, countdown);
                self.spawn(Agent::Patch(patch), Some(Position::new(x, y)), None)?;
            }
        }
        Ok(())
    }

    fn random_cell(&mut self) -> Position {
        Position::new(
            self.rng.gen_range(0..self.params.width) as i64,
            self.rng.gen_range(0..self.params.height) as i64,
        )
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Completed ticks
    pub fn tick(&self) -> u64 {
        self.scheduler.tick()
    }

    /// Route lifecycle events to `sink` from now on
    pub fn set_trace_sink(&mut self, sink: impl TraceSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    pub fn clear_trace_sink(&mut self) {
        self.sink = None;
    }

    pub(crate) fn emit(&mut self, event: SimEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink.record(event);
        }
    }

    fn next_id(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register a new agent, placing it on the grid when `pos` is given
    pub(crate) fn spawn(
        &mut self,
        agent: Agent,
        pos: Option<Position>,
        parent: Option<AgentId>,
    ) -> Result<AgentId> {
        let id = self.next_id();
        let breed = agent.breed();
        self.scheduler.add(id, agent)?;
        if let Some(pos) = pos {
            self.grid.place(id, pos)?;
        }
        if let Some(parent) = parent {
            let tick = self.tick();
            self.emit(SimEvent::Born {
                tick,
                id,
                breed,
                parent,
            });
        }
        Ok(id)
    }

    /// Remove a dead agent from the scheduler, and from the grid when it
    /// is standing on it
    pub(crate) fn despawn(&mut self, id: AgentId, on_grid: bool) -> Result<Agent> {
        if on_grid {
            self.grid.remove_agent(id)?;
        }
        let agent = self.scheduler.remove(id)?;
        let tick = self.tick();
        self.emit(SimEvent::Died {
            tick,
            id,
            breed: agent.breed(),
        });
        Ok(agent)
    }

    /// Draw once from the RNG and compare against `p`
    pub(crate) fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    pub(crate) fn prey_reproduction_chance(&self, age: f64) -> f64 {
        evaluate(self.curves.reproduction.as_deref(), age).unwrap_or(self.params.prey_reproduce)
    }

    pub(crate) fn predation_chance(&self, age: f64) -> Option<f64> {
        evaluate(self.curves.predation.as_deref(), age)
    }

    pub(crate) fn patch_at(&self, pos: Position) -> Option<AgentId> {
        self.grid
            .occupants(pos)
            .iter()
            .copied()
            .find(|&id| self.scheduler.breed_of(id) == Some(Breed::Patch))
    }

    pub(crate) fn prey_at(&self, pos: Position) -> Vec<AgentId> {
        self.grid
            .occupants(pos)
            .iter()
            .copied()
            .filter(|&id| self.scheduler.breed_of(id) == Some(Breed::Prey))
            .collect()
    }

    /// Pick one prey on `pos` uniformly, returning it with its age
    pub(crate) fn pick_prey(&mut self, pos: Position) -> Result<Option<(AgentId, f64)>> {
        let prey = self.prey_at(pos);
        let Some(&victim) = prey.choose(&mut self.rng) else {
            return Ok(None);
        };
        let age = self.scheduler.prey_mut(victim)?.age;
        Ok(Some((victim, age)))
    }

    /// Remove `victim` from the world as eaten by `by`
    pub(crate) fn eat_prey(&mut self, victim: AgentId, by: AgentId) -> Result<()> {
        self.despawn(victim, true)?;
        let tick = self.tick();
        self.emit(SimEvent::Killed {
            tick,
            prey: victim,
            by,
        });
        Ok(())
    }

    pub fn spawn_prey(&mut self, pos: Position, energy: f64, age: f64) -> Result<AgentId> {
        self.spawn(Agent::Prey(Prey::new(energy, age)), Some(pos), None)
    }

    pub fn spawn_predator(&mut self, pos: Position, energy: f64) -> Result<AgentId> {
        self.spawn(Agent::Predator(Predator::new(energy)), Some(pos), None)
    }

    /// Gather existing solo predators into a new pack at `pos`
    pub fn spawn_pack(&mut self, pos: Position, members: &[AgentId]) -> Result<AgentId> {
        let pack = Pack::new(self.params.min_pack_size, self.params.pack_attack_size);
        let id = self.spawn(Agent::Pack(pack), Some(pos), None)?;
        for &member in members {
            self.absorb(id, member)?;
        }
        Ok(id)
    }

    /// Advance one tick and report the resulting aggregates
    pub fn step(&mut self) -> Result<TickSnapshot> {
        match self.params.activation {
            Activation::ByBreed => {
                for breed in self.scheduler.active_breeds() {
                    let order = self.scheduler.shuffled(breed, &mut self.rng);
                    self.activate_all(order)?;
                }
            }
            Activation::Uniform => {
                let order = self.scheduler.shuffled_all(&mut self.rng);
                self.activate_all(order)?;
            }
        }
        self.scheduler.advance_tick();

        let snapshot = self.snapshot();
        debug!(
            "Tick {}: {} prey, {} predators, {} packs",
            snapshot.tick, snapshot.prey_count, snapshot.predator_count, snapshot.pack_count
        );
        Ok(snapshot)
    }

    fn activate_all(&mut self, order: Vec<AgentId>) -> Result<()> {
        for id in order {
            // agents eaten, merged or starved earlier in the pass are skipped
            let Some(breed) = self.scheduler.breed_of(id) else {
                continue;
            };
            match breed {
                Breed::Prey => self.step_prey(id)?,
                Breed::Predator => self.step_predator(id)?,
                Breed::Pack => self.step_pack(id)?,
                Breed::Patch => self.step_patch(id)?,
            }
        }
        Ok(())
    }

    /// Run `ticks` steps, collecting every snapshot
    pub fn run(&mut self, ticks: u64) -> Result<Vec<TickSnapshot>> {
        info!(
            "Starting run of {} ticks: {} prey, {} predators",
            ticks,
            self.scheduler.count(Breed::Prey),
            self.scheduler.count(Breed::Predator)
        );

        let mut snapshots = Vec::new();
        for _ in 0..ticks {
            snapshots.push(self.step()?);
        }

        info!(
            "Finished at tick {}: {} prey, {} predators",
            self.tick(),
            self.scheduler.count(Breed::Prey),
            self.scheduler.count(Breed::Predator)
        );
        Ok(snapshots)
    }

    /// Endless lazy sequence of ticks; combine with `take`
    pub fn ticks(&mut self) -> Ticks<'_> {
        Ticks { model: self }
    }

    /// Aggregates for the current state
    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            tick: self.tick(),
            prey_count: self.scheduler.count(Breed::Prey),
            predator_count: self.scheduler.count(Breed::Predator),
            pack_count: self.scheduler.count(Breed::Pack),
            average_kills_per_predator: self.scheduler.average(Breed::Predator, AgentField::Kills),
            average_prey_age: self.scheduler.average(Breed::Prey, AgentField::Age),
        }
    }

    /// Verify that grid, scheduler and pack membership agree.
    ///
    /// Prey, patches, packs and solo predators stand on exactly one cell;
    /// grouped predators stand on none and are listed by the pack they
    /// point at.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        self.grid.verify()?;

        for (id, _) in self.grid.placements() {
            if !self.scheduler.contains(id) {
                return Err(ConsistencyError::NotFound(id));
            }
        }

        for breed in [Breed::Prey, Breed::Patch, Breed::Pack] {
            for (id, _) in self.scheduler.agents(breed) {
                if !self.grid.contains(id) {
                    return Err(ConsistencyError::NotFound(id));
                }
            }
        }

        for (id, agent) in self.scheduler.agents(Breed::Predator) {
            let Agent::Predator(predator) = agent else {
                continue;
            };
            match predator.pack {
                None if !self.grid.contains(id) => return Err(ConsistencyError::NotFound(id)),
                None => {}
                Some(pack) => {
                    let listed = self
                        .scheduler
                        .pack(pack)
                        .is_some_and(|p| p.members.contains(&id));
                    if !listed || self.grid.contains(id) {
                        return Err(ConsistencyError::MembershipMismatch { member: id, pack });
                    }
                }
            }
        }

        for (id, agent) in self.scheduler.agents(Breed::Pack) {
            let Agent::Pack(pack) = agent else {
                continue;
            };
            for &member in &pack.members {
                if self.scheduler.predator(member).and_then(|p| p.pack) != Some(id) {
                    return Err(ConsistencyError::MembershipMismatch { member, pack: id });
                }
            }
        }

        Ok(())
    }
}

/// Iterator returned by [`Model::ticks`]
pub struct Ticks<'a> {
    model: &'a mut Model,
}

impl Iterator for Ticks<'_> {
    type Item = Result<TickSnapshot, SimError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.model.step())
    }
}
