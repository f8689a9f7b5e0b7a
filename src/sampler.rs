use rand::prelude::*;
use rand_distr::weighted::WeightedIndex;

use crate::error::{OccupancyError, OccupancyResult};

/// Reusable sampler over a fixed weight vector.
#[derive(Debug, Clone)]
pub struct DiscreteSampler {
    dist: WeightedIndex<f64>,
}

impl DiscreteSampler {
    /// Build a sampler from non-negative weights.
    ///
    /// # Errors
    /// Fails if `weights` is empty, holds a negative or non-finite entry,
    /// or sums to zero or overflows.
    pub fn new(weights: &[f64]) -> OccupancyResult<Self> {
        if weights.is_empty() {
            return Err(OccupancyError::EmptyWeights);
        }
        if let Some((index, &weight)) = weights
            .iter()
            .enumerate()
            .find(|&(_, &w)| !w.is_finite() || w < 0.0)
        {
            return Err(OccupancyError::InvalidWeight { index, weight });
        }
        let total: f64 = weights.iter().sum();
        if !(total > 0.0 && total.is_finite()) {
            return Err(OccupancyError::InvalidTotal(total));
        }

        let dist = WeightedIndex::new(weights)?;
        Ok(Self { dist })
    }

    /// Draw one index, consuming one draw from `rng`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.dist.sample(rng)
    }
}

/// Draw one index from `weights` in a single call.
pub fn sample<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> OccupancyResult<usize> {
    Ok(DiscreteSampler::new(weights)?.sample(rng))
}
