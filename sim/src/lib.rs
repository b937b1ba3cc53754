pub mod agent;
pub mod error;
pub mod grid;
pub mod model;
pub mod movement;
pub mod scheduler;
pub mod trace;

mod pack;
mod patch;
mod predator;
mod prey;

pub use agent::{Agent, AgentId, Breed, Pack, Predator, Prey, ResourcePatch};
pub use error::{ConsistencyError, Result, SimError};
pub use grid::{Grid, Position};
pub use model::{AgeCurves, Model, Ticks};
pub use scheduler::Scheduler;
pub use trace::{EventLog, SimEvent, TraceSink};

use shared::{ModelParams, TickSnapshot};

/// Run a complete simulation from freshly seeded `params`
pub fn run_simulation(params: ModelParams, ticks: u64) -> Result<Vec<TickSnapshot>> {
    let mut model = Model::new(params)?;
    model.run(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_runs() {
        let params = ModelParams {
            width: 20,
            height: 20,
            initial_prey: 50,
            initial_predators: 10,
            ..Default::default()
        };
        let history = run_simulation(params, 30).unwrap();

        assert_eq!(history.len(), 30);
        for (i, snapshot) in history.iter().enumerate() {
            assert_eq!(snapshot.tick, i as u64 + 1);
            assert!(snapshot.average_kills_per_predator >= 0.0);
        }
    }

    #[test]
    fn test_simulation_rejects_bad_params() {
        let params = ModelParams {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(
            run_simulation(params, 5),
            Err(SimError::Config(_))
        ));
    }
}
