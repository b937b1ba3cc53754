use crate::agent::{Agent, AgentId, Breed, Pack};
use crate::error::{ConsistencyError, Result};
use crate::grid::Position;
use crate::model::Model;
use crate::movement;
use crate::trace::SimEvent;
use tracing::{debug, trace};

impl Model {
    /// Solo predator turn. Grouped predators are driven by their pack.
    ///
    /// A hungry predator first looks for a pack to join, then for another
    /// hungry loner to found one with; failing both it tries to make a kill
    /// on its own cell.
    pub(crate) fn step_predator(&mut self, id: AgentId) -> Result<()> {
        if self.scheduler.predator_mut(id)?.is_grouped() {
            return Ok(());
        }

        let pos = movement::move_random(&mut self.grid, id, &mut self.rng)?;

        let cost = self.params.predator_energy_cost;
        let threshold = self.params.hunger_threshold;
        let predator = self.scheduler.predator_mut(id)?;
        predator.energy -= cost;

        if predator.is_hungry(threshold) {
            if self.join_nearby_pack(id)? || self.found_pack(id)? {
                return Ok(());
            }
            self.hunt_alone(id, pos)?;
        }

        let predator = self.scheduler.predator_mut(id)?;
        if predator.is_dead() {
            trace!("Predator {} starved", id);
            self.despawn(id, true)?;
            return Ok(());
        }

        if self.chance(self.params.predator_reproduce) {
            let cub = self.scheduler.predator_mut(id)?.give_birth();
            self.spawn(Agent::Predator(cub), Some(pos), Some(id))?;
        }
        Ok(())
    }

    /// Move onto the nearest pack within territory, forming or not, and join it
    fn join_nearby_pack(&mut self, id: AgentId) -> Result<bool> {
        let radius = self.params.territory_radius;
        let found = movement::move_toward_kind(
            &mut self.grid,
            &self.scheduler,
            id,
            Breed::Pack,
            radius,
            |_, _| true,
        )?;
        let Some(pack) = found else {
            return Ok(false);
        };

        self.absorb(pack, id)?;
        let tick = self.tick();
        self.emit(SimEvent::PackJoined {
            tick,
            pack,
            member: id,
        });
        Ok(true)
    }

    fn found_pack(&mut self, id: AgentId) -> Result<bool> {
        let radius = self.params.territory_radius;
        let threshold = self.params.hunger_threshold;
        let found = movement::move_toward_kind(
            &mut self.grid,
            &self.scheduler,
            id,
            Breed::Predator,
            radius,
            |_, agent| agent.as_predator().is_some_and(|p| p.seeks_pack(threshold)),
        )?;
        let Some(partner) = found else {
            return Ok(false);
        };

        let at = self
            .grid
            .position_of(partner)
            .ok_or(ConsistencyError::NotFound(partner))?;
        let pack = Pack::new(self.params.min_pack_size, self.params.pack_attack_size);
        let pack = self.spawn(Agent::Pack(pack), Some(at), None)?;
        self.absorb(pack, partner)?;
        self.absorb(pack, id)?;

        debug!("Predators {} and {} formed pack {}", id, partner, pack);
        let tick = self.tick();
        self.emit(SimEvent::PackFormed {
            tick,
            pack,
            founders: [id, partner],
            at,
        });
        Ok(true)
    }

    fn hunt_alone(&mut self, id: AgentId, pos: Position) -> Result<()> {
        let Some((victim, age)) = self.pick_prey(pos)? else {
            return Ok(());
        };

        let base = self.params.solo_attack_prob;
        let p = self.predation_chance(age).map_or(base, |curve| base * curve);
        if !self.chance(p) {
            return Ok(());
        }

        self.eat_prey(victim, id)?;
        let gain = self.params.predator_gain_from_food;
        self.scheduler.predator_mut(id)?.record_kill(gain);
        trace!("Predator {} killed prey {} alone", id, victim);
        Ok(())
    }
}
