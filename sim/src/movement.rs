//! Stateless movement and targeting built on the grid.

use crate::agent::{Agent, AgentId, Breed};
use crate::error::ConsistencyError;
use crate::grid::{Grid, Position};
use crate::scheduler::Scheduler;
use rand::Rng;

/// Step `id` onto a uniformly chosen adjacent cell
pub fn move_random<R: Rng + ?Sized>(
    grid: &mut Grid,
    id: AgentId,
    rng: &mut R,
) -> Result<Position, ConsistencyError> {
    let pos = grid.position_of(id).ok_or(ConsistencyError::NotFound(id))?;
    let next = grid.random_adjacent(pos, rng);
    grid.move_to(id, next)
}

/// Closest agent of `breed` within `radius` of `id` that satisfies `predicate`.
///
/// The searcher's own cell is scanned but the searcher itself never matches.
/// Distance is torus Chebyshev; on ties the first candidate in
/// [`Grid::neighbors`] scan order wins.
pub fn find_nearest<P>(
    grid: &Grid,
    agents: &Scheduler,
    id: AgentId,
    breed: Breed,
    radius: usize,
    predicate: P,
) -> Result<Option<(AgentId, Position)>, ConsistencyError>
where
    P: Fn(AgentId, &Agent) -> bool,
{
    let origin = grid.position_of(id).ok_or(ConsistencyError::NotFound(id))?;

    let mut best: Option<(usize, AgentId, Position)> = None;
    for candidate in grid.neighbors(origin, radius, true) {
        if candidate == id {
            continue;
        }
        let Some(agent) = agents.get(candidate) else {
            return Err(ConsistencyError::NotFound(candidate));
        };
        if agent.breed() != breed || !predicate(candidate, agent) {
            continue;
        }
        let pos = grid
            .position_of(candidate)
            .ok_or(ConsistencyError::NotFound(candidate))?;
        let dist = grid.distance(origin, pos);
        if best.map_or(true, |(d, _, _)| dist < d) {
            best = Some((dist, candidate, pos));
        }
    }

    Ok(best.map(|(_, candidate, pos)| (candidate, pos)))
}

/// Move `id` onto the cell of the nearest matching agent and return that
/// agent, or leave `id` in place and return `None`.
pub fn move_toward_kind<P>(
    grid: &mut Grid,
    agents: &Scheduler,
    id: AgentId,
    breed: Breed,
    radius: usize,
    predicate: P,
) -> Result<Option<AgentId>, ConsistencyError>
where
    P: Fn(AgentId, &Agent) -> bool,
{
    match find_nearest(grid, agents, id, breed, radius, predicate)? {
        Some((target, pos)) => {
            grid.move_to(id, pos)?;
            Ok(Some(target))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Predator, Prey};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn world() -> (Grid, Scheduler) {
        (Grid::new(20, 20, true), Scheduler::new())
    }

    fn put(grid: &mut Grid, agents: &mut Scheduler, id: u64, agent: Agent, x: i64, y: i64) {
        agents.add(AgentId(id), agent).unwrap();
        grid.place(AgentId(id), Position::new(x, y)).unwrap();
    }

    #[test]
    fn test_move_random_takes_one_step() {
        let (mut grid, mut agents) = world();
        put(&mut grid, &mut agents, 1, Agent::Prey(Prey::new(1.0, 0.0)), 0, 0);
        let mut rng = StdRng::seed_from_u64(11);

        let pos = move_random(&mut grid, AgentId(1), &mut rng).unwrap();
        assert_eq!(grid.distance(Position::new(0, 0), pos), 1);
        assert_eq!(grid.position_of(AgentId(1)), Some(pos));
    }

    #[test]
    fn test_move_toward_closest_match() {
        let (mut grid, mut agents) = world();
        put(&mut grid, &mut agents, 1, Agent::Predator(Predator::new(5.0)), 10, 10);
        put(&mut grid, &mut agents, 2, Agent::Predator(Predator::new(5.0)), 13, 10);
        put(&mut grid, &mut agents, 3, Agent::Predator(Predator::new(5.0)), 11, 11);
        put(&mut grid, &mut agents, 4, Agent::Prey(Prey::new(5.0, 1.0)), 10, 11);

        let found =
            move_toward_kind(&mut grid, &agents, AgentId(1), Breed::Predator, 4, |_, _| true)
                .unwrap();
        assert_eq!(found, Some(AgentId(3)));
        assert_eq!(grid.position_of(AgentId(1)), Some(Position::new(11, 11)));
    }

    #[test]
    fn test_predicate_filters_candidates() {
        let (mut grid, mut agents) = world();
        put(&mut grid, &mut agents, 1, Agent::Predator(Predator::new(5.0)), 10, 10);
        put(&mut grid, &mut agents, 2, Agent::Predator(Predator::new(50.0)), 11, 10);
        put(&mut grid, &mut agents, 3, Agent::Predator(Predator::new(5.0)), 13, 13);

        let hungry = |_: AgentId, agent: &Agent| {
            agent.as_predator().is_some_and(|p| p.seeks_pack(10.0))
        };
        let found =
            move_toward_kind(&mut grid, &agents, AgentId(1), Breed::Predator, 4, hungry).unwrap();
        assert_eq!(found, Some(AgentId(3)));
    }

    #[test]
    fn test_same_cell_candidate_and_self_exclusion() {
        let (mut grid, mut agents) = world();
        put(&mut grid, &mut agents, 1, Agent::Predator(Predator::new(5.0)), 3, 3);
        let none = find_nearest(&grid, &agents, AgentId(1), Breed::Predator, 2, |_, _| true).unwrap();
        assert_eq!(none, None);

        put(&mut grid, &mut agents, 2, Agent::Predator(Predator::new(5.0)), 3, 3);
        let found = find_nearest(&grid, &agents, AgentId(1), Breed::Predator, 2, |_, _| true).unwrap();
        assert_eq!(found, Some((AgentId(2), Position::new(3, 3))));
    }

    #[test]
    fn test_search_wraps_and_ties_use_scan_order() {
        let (mut grid, mut agents) = world();
        put(&mut grid, &mut agents, 1, Agent::Predator(Predator::new(5.0)), 0, 0);
        put(&mut grid, &mut agents, 2, Agent::Predator(Predator::new(5.0)), 1, 1);
        put(&mut grid, &mut agents, 3, Agent::Predator(Predator::new(5.0)), 19, 19);

        // both are one step away; (19, 19) is scanned first (row above, column left)
        let found = find_nearest(&grid, &agents, AgentId(1), Breed::Predator, 1, |_, _| true).unwrap();
        assert_eq!(found, Some((AgentId(3), Position::new(19, 19))));
    }

    #[test]
    fn test_nothing_in_range_leaves_agent_in_place() {
        let (mut grid, mut agents) = world();
        put(&mut grid, &mut agents, 1, Agent::Predator(Predator::new(5.0)), 0, 0);
        put(&mut grid, &mut agents, 2, Agent::Predator(Predator::new(5.0)), 10, 10);

        let found =
            move_toward_kind(&mut grid, &agents, AgentId(1), Breed::Predator, 4, |_, _| true)
                .unwrap();
        assert_eq!(found, None);
        assert_eq!(grid.position_of(AgentId(1)), Some(Position::new(0, 0)));
    }
}
