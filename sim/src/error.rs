use crate::agent::{AgentId, Breed};
use crate::grid::Position;
use shared::ConfigError;
use thiserror::Error;

/// Grid/scheduler desynchronisation. These never occur while the engine's
/// bookkeeping is correct and are not meant to be recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("agent {0} is already registered")]
    DuplicateId(AgentId),

    #[error("agent {0} not found")]
    NotFound(AgentId),

    #[error("position ({}, {}) is outside the grid", .0.x, .0.y)]
    OutOfBounds(Position),

    #[error("agent {id} is a {actual:?}, expected {expected:?}")]
    BreedMismatch {
        id: AgentId,
        expected: Breed,
        actual: Breed,
    },

    #[error("predator {member} and pack {pack} disagree about membership")]
    MembershipMismatch { member: AgentId, pack: AgentId },
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("engine invariant violated: {0}")]
    Consistency(#[from] ConsistencyError),
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;
