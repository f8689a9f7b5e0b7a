use thiserror::Error;

use crate::tables::{DayType, Variant};

#[derive(Debug, Error)]
pub enum OccupancyError {
    #[error("`run` must be called before reading simulation results")]
    NotRun,

    #[error("no-activity series is only produced by the four-state variant")]
    VariantMismatch,

    #[error("no {0} tables available")]
    MissingVariant(Variant),

    #[error("no {variant} tables for {day_type} with {residents} residents")]
    MissingTables {
        variant: Variant,
        day_type: DayType,
        residents: usize,
    },

    #[error("resident count must be at least 1, but is {0}")]
    InvalidResidents(usize),

    #[error("weight vector must not be empty")]
    EmptyWeights,

    #[error("weight {index} must be non-negative and finite, but is {weight}")]
    InvalidWeight { index: usize, weight: f64 },

    #[error("weights must have a positive finite total, but sum to {0}")]
    InvalidTotal(f64),

    #[error("transition row {row} requested, but the table has {len} rows")]
    MissingRow { row: usize, len: usize },

    #[error("state {state} is outside the chain's {num_states} states")]
    StateOutOfRange { state: usize, num_states: usize },

    #[error("failed to build weighted index")]
    Weights(#[from] rand_distr::weighted::Error),
}

pub type OccupancyResult<T> = Result<T, OccupancyError>;
