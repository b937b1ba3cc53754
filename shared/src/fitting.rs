use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A precomputed function of age, such as a fitted reproduction or
/// predation rate. Values outside [0, 1] are clamped by the caller.
pub trait AgeCurve {
    fn at(&self, age: f64) -> f64;
}

impl<F> AgeCurve for F
where
    F: Fn(f64) -> f64,
{
    fn at(&self, age: f64) -> f64 {
        self(age)
    }
}

/// Polynomial in age with coefficients ordered highest degree first,
/// the layout a least-squares polynomial fit produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    pub coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }
}

impl AgeCurve for Polynomial {
    fn at(&self, age: f64) -> f64 {
        self.coefficients.iter().fold(0.0, |acc, c| acc * age + c)
    }
}

/// Discrete distribution over starting ages for seeded prey
#[derive(Debug, Clone)]
pub struct AgeDistribution {
    ages: Vec<f64>,
    weights: WeightedIndex<f64>,
}

impl AgeDistribution {
    /// Ages `start, start + step, ...` up to and including `end`, all equally likely
    pub fn uniform(start: f64, end: f64, step: f64) -> Option<Self> {
        Self::from_curve(&|_: f64| 1.0, start, end, step)
    }

    /// Weight each age on the grid by `curve`; negative values count as zero.
    /// Returns `None` if the grid is empty or every weight is zero.
    pub fn from_curve(curve: &dyn AgeCurve, start: f64, end: f64, step: f64) -> Option<Self> {
        if !(step > 0.0) || !start.is_finite() || !end.is_finite() || end < start {
            return None;
        }

        let count = ((end - start) / step + 1e-9).floor() as usize + 1;
        let ages: Vec<f64> = (0..count).map(|i| start + i as f64 * step).collect();
        let weights: Vec<f64> = ages
            .iter()
            .map(|&age| {
                let w = curve.at(age);
                if w.is_finite() && w > 0.0 {
                    w
                } else {
                    0.0
                }
            })
            .collect();

        let weights = WeightedIndex::new(weights).ok()?;
        Some(Self { ages, weights })
    }

    pub fn ages(&self) -> &[f64] {
        &self.ages
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.ages[self.weights.sample(rng)]
    }
}
