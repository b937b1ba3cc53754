use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the scheduler orders agent activations within a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Run every agent of one breed before moving on to the next breed
    #[default]
    ByBreed,
    /// Run all agents in a single shuffled order regardless of breed
    Uniform,
}

/// Errors raised while building or validating a parameter set
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("grid dimensions must be non-zero (got {width}x{height})")]
    InvalidDimensions { width: usize, height: usize },

    #[error("{field} must be a probability in [0, 1] (got {value})")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },

    #[error("{field} must be finite and non-negative (got {value})")]
    InvalidAmount { field: &'static str, value: f64 },

    #[error("{field} must be at least {min} (got {value})")]
    TooSmall {
        field: &'static str,
        min: u64,
        value: u64,
    },

    #[error("pack_attack_size ({attack}) must not be smaller than min_pack_size ({min})")]
    PackSizes { min: usize, attack: usize },

    #[error("failed to parse parameters: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Construction parameters for a wolf/elk model.
///
/// Energies are plain units; one tick costs `*_energy_cost` and one meal
/// yields `*_gain_from_food`. Unknown fields are rejected when loading from
/// JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelParams {
    pub width: usize,
    pub height: usize,
    pub initial_prey: usize,
    pub initial_predators: usize,

    /// Per-tick probability that a prey reproduces
    pub prey_reproduce: f64,
    /// Per-tick probability that a predator reproduces
    pub predator_reproduce: f64,

    /// Energy a prey gains from a fully grown patch
    pub prey_gain_from_food: f64,
    /// Energy each predator gains from a kill
    pub predator_gain_from_food: f64,
    pub prey_energy_cost: f64,
    pub predator_energy_cost: f64,

    /// Ticks a patch needs to regrow after being eaten
    pub grass_regrowth_time: u32,

    /// Predators with less energy than this go looking for a pack
    pub hunger_threshold: f64,
    /// Packs with fewer members than this disband
    pub min_pack_size: usize,
    /// Packs need at least this many members to attack
    pub pack_attack_size: usize,
    /// Chebyshev radius used for pack and mate searches
    pub territory_radius: usize,
    /// Probability that a lone predator kills prey on its cell
    pub solo_attack_prob: f64,

    /// Real time simulated per tick, added to prey age
    pub age_increment: f64,
    /// 8-neighbourhood random steps when true, 4-neighbourhood otherwise
    pub moore: bool,
    pub activation: Activation,
    pub seed: u64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            width: 40,
            height: 40,
            initial_prey: 200,
            initial_predators: 20,
            prey_reproduce: 0.04,
            predator_reproduce: 0.03,
            prey_gain_from_food: 6.0,
            predator_gain_from_food: 30.0,
            prey_energy_cost: 1.0,
            predator_energy_cost: 1.0,
            grass_regrowth_time: 30,
            hunger_threshold: 10.0,
            min_pack_size: 2,
            pack_attack_size: 4,
            territory_radius: 8,
            solo_attack_prob: 0.2,
            age_increment: 1.0 / 26.0,
            moore: true,
            activation: Activation::ByBreed,
            seed: 42,
        }
    }
}

impl ModelParams {
    /// Parse a parameter set from JSON, filling omitted fields with defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let params: ModelParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        for (field, value) in [
            ("prey_reproduce", self.prey_reproduce),
            ("predator_reproduce", self.predator_reproduce),
            ("solo_attack_prob", self.solo_attack_prob),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { field, value });
            }
        }

        for (field, value) in [
            ("prey_gain_from_food", self.prey_gain_from_food),
            ("predator_gain_from_food", self.predator_gain_from_food),
            ("prey_energy_cost", self.prey_energy_cost),
            ("predator_energy_cost", self.predator_energy_cost),
            ("hunger_threshold", self.hunger_threshold),
            ("age_increment", self.age_increment),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidAmount { field, value });
            }
        }

        for (field, min, value) in [
            ("grass_regrowth_time", 1, u64::from(self.grass_regrowth_time)),
            ("min_pack_size", 1, self.min_pack_size as u64),
            ("territory_radius", 1, self.territory_radius as u64),
        ] {
            if value < min {
                return Err(ConfigError::TooSmall { field, min, value });
            }
        }

        if self.pack_attack_size < self.min_pack_size {
            return Err(ConfigError::PackSizes {
                min: self.min_pack_size,
                attack: self.pack_attack_size,
            });
        }

        Ok(())
    }
}
