use crate::agent::{Agent, AgentId};
use crate::error::Result;
use crate::model::Model;
use crate::movement;
use tracing::trace;

impl Model {
    /// Wander, graze, then starve or calve
    pub(crate) fn step_prey(&mut self, id: AgentId) -> Result<()> {
        let pos = movement::move_random(&mut self.grid, id, &mut self.rng)?;

        let cost = self.params.prey_energy_cost;
        let increment = self.params.age_increment;
        self.scheduler.prey_mut(id)?.metabolize(cost, increment);

        if let Some(patch) = self.patch_at(pos) {
            let regrowth = self.params.grass_regrowth_time;
            if self.scheduler.patch_mut(patch)?.graze(regrowth) {
                self.scheduler.prey_mut(id)?.energy += self.params.prey_gain_from_food;
            }
        }

        let prey = self.scheduler.prey_mut(id)?;
        if prey.is_dead() {
            trace!("Prey {} starved at ({}, {})", id, pos.x, pos.y);
            self.despawn(id, true)?;
            return Ok(());
        }

        let age = prey.age;
        let p = self.prey_reproduction_chance(age);
        if self.chance(p) {
            let calf = self.scheduler.prey_mut(id)?.give_birth();
            self.spawn(Agent::Prey(calf), Some(pos), Some(id))?;
        }
        Ok(())
    }
}
