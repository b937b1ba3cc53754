//! Pack behaviour: recruiting, merging, group hunts and disbanding.
//!
//! Members of a live pack are registered with the scheduler but have no
//! grid position. Only the pack itself stands on a cell.

use crate::agent::{Agent, AgentId, Breed};
use crate::error::{ConsistencyError, Result};
use crate::grid::Position;
use crate::model::Model;
use crate::movement;
use crate::trace::SimEvent;
use tracing::{debug, trace};

impl Model {
    /// Take a solo predator off the grid and into `pack`
    pub(crate) fn absorb(&mut self, pack: AgentId, predator: AgentId) -> Result<()> {
        self.grid.remove_agent(predator)?;
        self.scheduler.predator_mut(predator)?.pack = Some(pack);
        self.scheduler.pack_mut(pack)?.members.push(predator);
        Ok(())
    }

    pub(crate) fn step_pack(&mut self, id: AgentId) -> Result<()> {
        movement::move_random(&mut self.grid, id, &mut self.rng)?;

        if self.scheduler.pack_mut(id)?.is_forming() && !self.recruit(id)? {
            self.merge_nearby(id)?;
        }
        // recruiting or merging may have moved the pack
        let pos = self
            .grid
            .position_of(id)
            .ok_or(ConsistencyError::NotFound(id))?;

        let fed = self.hunt(id, pos)?;
        let members = if fed {
            self.disband(id, pos, true)?
        } else {
            self.scheduler.pack_mut(id)?.members.clone()
        };

        self.upkeep(id, pos, &members, fed)?;

        if !fed && self.scheduler.pack_mut(id)?.below_minimum() {
            self.disband(id, pos, false)?;
        }
        Ok(())
    }

    /// Move onto the nearest hungry solo predator within territory and
    /// absorb it
    fn recruit(&mut self, id: AgentId) -> Result<bool> {
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
        let Some(recruit) = found else {
            return Ok(false);
        };

        self.absorb(id, recruit)?;
        trace!("Pack {} recruited predator {}", id, recruit);
        let tick = self.tick();
        self.emit(SimEvent::PackJoined {
            tick,
            pack: id,
            member: recruit,
        });
        Ok(true)
    }

    /// Move onto the nearest other forming pack and fold it into this one
    fn merge_nearby(&mut self, id: AgentId) -> Result<bool> {
        let radius = self.params.territory_radius;
        let found = movement::move_toward_kind(
            &mut self.grid,
            &self.scheduler,
            id,
            Breed::Pack,
            radius,
            |_, agent| agent.as_pack().is_some_and(|p| p.is_forming()),
        )?;
        let Some(other) = found else {
            return Ok(false);
        };

        self.grid.remove_agent(other)?;
        let absorbed = self.scheduler.remove_pack(other)?;
        for &member in &absorbed.members {
            self.scheduler.predator_mut(member)?.pack = Some(id);
        }
        self.scheduler
            .pack_mut(id)?
            .members
            .extend_from_slice(&absorbed.members);

        debug!(
            "Pack {} absorbed pack {} ({} members)",
            id,
            other,
            absorbed.len()
        );
        let tick = self.tick();
        self.emit(SimEvent::PacksMerged {
            tick,
            into: id,
            absorbed: other,
        });
        Ok(true)
    }

    /// Attack prey on the pack's cell once the pack is large enough.
    /// Every member shares the kill.
    fn hunt(&mut self, id: AgentId, pos: Position) -> Result<bool> {
        if !self.scheduler.pack_mut(id)?.is_viable() {
            return Ok(false);
        }
        let Some((victim, age)) = self.pick_prey(pos)? else {
            return Ok(false);
        };
        if let Some(p) = self.predation_chance(age) {
            if !self.chance(p) {
                return Ok(false);
            }
        }

        self.eat_prey(victim, id)?;
        let gain = self.params.predator_gain_from_food;
        let members = self.scheduler.pack_mut(id)?.members.clone();
        for member in members {
            self.scheduler.predator_mut(member)?.record_kill(gain);
        }
        trace!("Pack {} killed prey {}", id, victim);
        Ok(true)
    }

    /// Energy cost, starvation and reproduction for every member.
    ///
    /// After feeding the members are already back on the grid as solo
    /// predators, so the dead leave the grid and cubs are placed beside
    /// their parent. Otherwise the dead leave the member list and cubs join
    /// the pack without a cell.
    fn upkeep(&mut self, id: AgentId, pos: Position, members: &[AgentId], fed: bool) -> Result<()> {
        let cost = self.params.predator_energy_cost;
        for &member in members {
            let predator = self.scheduler.predator_mut(member)?;
            predator.energy -= cost;

            if predator.is_dead() {
                self.despawn(member, fed)?;
                if !fed {
                    self.scheduler.pack_mut(id)?.members.retain(|&m| m != member);
                }
                continue;
            }

            if !self.chance(self.params.predator_reproduce) {
                continue;
            }
            let cub = self.scheduler.predator_mut(member)?.give_birth();
            if fed {
                self.spawn(Agent::Predator(cub), Some(pos), Some(member))?;
            } else {
                let cub = self.spawn(Agent::Predator(cub), None, Some(member))?;
                self.scheduler.pack_mut(id)?.members.push(cub);
            }
        }
        Ok(())
    }

    /// Put every member back on `pos` as a solo predator and remove the
    /// pack. Returns the released members.
    pub(crate) fn disband(&mut self, id: AgentId, pos: Position, fed: bool) -> Result<Vec<AgentId>> {
        let pack = self.scheduler.remove_pack(id)?;
        self.grid.remove(pos, id)?;

        for &member in &pack.members {
            self.scheduler.predator_mut(member)?.pack = None;
            self.grid.place(member, pos)?;
        }

        debug!(
            "Pack {} disbanded at ({}, {}) with {} members{}",
            id,
            pos.x,
            pos.y,
            pack.len(),
            if fed { " after feeding" } else { "" }
        );
        let tick = self.tick();
        self.emit(SimEvent::PackDisbanded {
            tick,
            pack: id,
            members: pack.len(),
            fed,
        });
        Ok(pack.members)
    }
}

#[cfg(test)]
mod tests {
    use crate::agent::{AgentId, Breed};
    use crate::grid::Position;
    use crate::model::Model;
    use crate::trace::{EventLog, SimEvent};
    use shared::ModelParams;

    fn params(width: usize, height: usize) -> ModelParams {
        ModelParams {
            width,
            height,
            initial_prey: 0,
            initial_predators: 0,
            prey_reproduce: 0.0,
            predator_reproduce: 0.0,
            ..Default::default()
        }
    }

    fn wolves(model: &mut Model, pos: Position, energies: &[f64]) -> Vec<AgentId> {
        energies
            .iter()
            .map(|&e| model.spawn_predator(pos, e).unwrap())
            .collect()
    }

    #[test]
    fn test_spawn_pack_takes_members_off_grid() {
        let mut model = Model::new(params(10, 10)).unwrap();
        let pos = Position::new(3, 3);
        let members = wolves(&mut model, pos, &[20.0, 20.0]);
        let pack = model.spawn_pack(pos, &members).unwrap();

        assert_eq!(model.grid().position_of(pack), Some(pos));
        for id in &members {
            assert!(!model.grid().contains(*id));
            assert_eq!(model.scheduler().predator(*id).unwrap().pack, Some(pack));
        }
        model.check_consistency().unwrap();
    }

    #[test]
    fn test_forming_pack_recruits_hungry_loner() {
        let mut model = Model::new(params(20, 20)).unwrap();
        let pos = Position::new(5, 5);
        // packs registered ahead of predators act first
        let pack = model.spawn_pack(pos, &[]).unwrap();
        for id in wolves(&mut model, pos, &[30.0, 30.0]) {
            model.absorb(pack, id).unwrap();
        }
        let loner = model.spawn_predator(Position::new(9, 9), 4.0).unwrap();
        let sated = model.spawn_predator(Position::new(6, 6), 50.0).unwrap();

        model.step().unwrap();

        let members = &model.scheduler().pack(pack).unwrap().members;
        assert_eq!(members.len(), 3);
        assert!(members.contains(&loner));
        assert!(!members.contains(&sated));
        assert!(!model.grid().contains(loner));
        // the pack moved onto the recruit's cell
        assert_eq!(model.grid().position_of(pack), Some(Position::new(9, 9)));
        // recruited before its own turn, so only the pack upkeep applied
        assert_eq!(model.scheduler().predator(loner).unwrap().energy, 3.0);
        model.check_consistency().unwrap();
    }

    #[test]
    fn test_forming_packs_merge() {
        let params = ModelParams {
            territory_radius: 3,
            ..params(20, 20)
        };
        let mut model = Model::new(params).unwrap();
        let log = EventLog::new();
        model.set_trace_sink(log.clone());
        let a_members = wolves(&mut model, Position::new(5, 5), &[30.0, 30.0]);
        let b_members = wolves(&mut model, Position::new(6, 5), &[30.0, 30.0]);
        let a = model.spawn_pack(Position::new(5, 5), &a_members).unwrap();
        model.spawn_pack(Position::new(6, 5), &b_members).unwrap();

        let snapshot = model.step().unwrap();

        assert_eq!(snapshot.pack_count, 1);
        assert_eq!(snapshot.predator_count, 4);
        let (survivor, pack) = model.scheduler().agents(Breed::Pack).next().unwrap();
        assert_eq!(pack.as_pack().unwrap().len(), 4);
        for id in a_members.iter().chain(&b_members) {
            assert_eq!(model.scheduler().predator(*id).unwrap().pack, Some(survivor));
        }
        let merges = log
            .events()
            .into_iter()
            .filter(|e| matches!(e, SimEvent::PacksMerged { .. }))
            .count();
        assert_eq!(merges, 1);
        // the absorbed pack never moved, so the survivor stands on its start cell
        let expected = if survivor == a {
            Position::new(6, 5)
        } else {
            Position::new(5, 5)
        };
        assert_eq!(model.grid().position_of(survivor), Some(expected));
        model.check_consistency().unwrap();
    }

    #[test]
    fn test_merged_pack_hunts_where_it_lands() {
        let params = ModelParams {
            territory_radius: 3,
            ..params(20, 20)
        };
        let mut model = Model::new(params).unwrap();
        let log = EventLog::new();
        model.set_trace_sink(log.clone());
        let left = Position::new(5, 5);
        let right = Position::new(7, 5);
        let a_members = wolves(&mut model, left, &[30.0, 30.0]);
        let b_members = wolves(&mut model, right, &[30.0, 30.0]);
        let a = model.spawn_pack(left, &a_members).unwrap();
        model.spawn_pack(right, &b_members).unwrap();
        // prey registered last, so they stay put until both packs have acted
        let prey_left = model.spawn_prey(left, 50.0, 2.0).unwrap();
        let prey_right = model.spawn_prey(right, 50.0, 2.0).unwrap();

        let snapshot = model.step().unwrap();

        assert_eq!(snapshot.pack_count, 0);
        assert_eq!(snapshot.prey_count, 1);
        let into = log
            .events()
            .into_iter()
            .find_map(|e| match e {
                SimEvent::PacksMerged { into, .. } => Some(into),
                _ => None,
            })
            .unwrap();
        let (landed, eaten, spared) = if into == a {
            (right, prey_right, prey_left)
        } else {
            (left, prey_left, prey_right)
        };
        assert!(!model.scheduler().contains(eaten));
        assert!(model.scheduler().contains(spared));
        for id in a_members.iter().chain(&b_members) {
            assert_eq!(model.scheduler().predator(*id).unwrap().kills, 1);
            assert_eq!(model.grid().position_of(*id), Some(landed));
        }
        model.check_consistency().unwrap();
    }

    #[test]
    fn test_small_pack_does_not_attack() {
        let mut model = Model::new(params(1, 1)).unwrap();
        let origin = Position::new(0, 0);
        let prey = model.spawn_prey(origin, 50.0, 2.0).unwrap();
        let members = wolves(&mut model, origin, &[30.0, 30.0, 30.0]);
        let pack = model.spawn_pack(origin, &members).unwrap();

        model.step().unwrap();

        assert!(model.scheduler().contains(prey));
        assert!(model.scheduler().contains(pack));
        for id in &members {
            assert_eq!(model.scheduler().predator(*id).unwrap().energy, 29.0);
        }
    }

    #[test]
    fn test_starved_member_is_dropped() {
        let mut model = Model::new(params(10, 10)).unwrap();
        let pos = Position::new(2, 2);
        let members = wolves(&mut model, pos, &[30.0, 30.0, 0.5]);
        let pack = model.spawn_pack(pos, &members).unwrap();

        model.step().unwrap();

        let remaining = &model.scheduler().pack(pack).unwrap().members;
        assert_eq!(remaining, &members[..2].to_vec());
        assert!(!model.scheduler().contains(members[2]));
        model.check_consistency().unwrap();
    }

    #[test]
    fn test_pack_disbands_below_minimum() {
        let mut model = Model::new(params(10, 10)).unwrap();
        let log = EventLog::new();
        model.set_trace_sink(log.clone());
        let pos = Position::new(2, 2);
        let members = wolves(&mut model, pos, &[30.0, 0.5]);
        let pack = model.spawn_pack(pos, &members).unwrap();

        model.step().unwrap();

        assert!(!model.scheduler().contains(pack));
        let survivor = model.scheduler().predator(members[0]).unwrap();
        assert!(!survivor.is_grouped());
        assert_eq!(survivor.energy, 29.0);
        assert!(model.grid().contains(members[0]));
        assert!(log.events().iter().any(|e| matches!(
            e,
            SimEvent::PackDisbanded { members: 1, fed: false, .. }
        )));
        model.check_consistency().unwrap();
    }

    #[test]
    fn test_cub_born_inside_pack_has_no_cell() {
        let params = ModelParams {
            predator_reproduce: 1.0,
            ..params(10, 10)
        };
        let mut model = Model::new(params).unwrap();
        let pos = Position::new(2, 2);
        let members = wolves(&mut model, pos, &[41.0, 41.0]);
        let pack = model.spawn_pack(pos, &members).unwrap();

        model.step().unwrap();

        let all = model.scheduler().pack(pack).unwrap().members.clone();
        assert_eq!(all.len(), 4);
        for id in &all {
            let predator = model.scheduler().predator(*id).unwrap();
            assert_eq!(predator.pack, Some(pack));
            assert_eq!(predator.energy, 20.0);
            assert!(!model.grid().contains(*id));
        }
        model.check_consistency().unwrap();
    }

    #[test]
    fn test_fed_pack_cubs_land_on_grid() {
        let params = ModelParams {
            predator_reproduce: 1.0,
            ..params(1, 1)
        };
        let mut model = Model::new(params).unwrap();
        let origin = Position::new(0, 0);
        model.spawn_prey(origin, 50.0, 2.0).unwrap();
        let members = wolves(&mut model, origin, &[10.0; 4]);
        model.spawn_pack(origin, &members).unwrap();

        let snapshot = model.step().unwrap();

        assert_eq!(snapshot.pack_count, 0);
        assert_eq!(snapshot.predator_count, 8);
        for (id, agent) in model.scheduler().agents(Breed::Predator) {
            let predator = agent.as_predator().unwrap();
            assert!(!predator.is_grouped());
            assert_eq!(predator.energy, (10.0 + 30.0 - 1.0) / 2.0);
            assert_eq!(model.grid().position_of(id), Some(origin));
        }
        model.check_consistency().unwrap();
    }
}
