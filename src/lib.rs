pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod manager;
pub mod model;
pub mod rng;
pub mod sampler;
pub mod stats;
pub mod tables;
pub mod types;
pub mod utils;

pub use error::{OccupancyError, OccupancyResult};
pub use model::{DayResult, INTERVALS_PER_DAY, OccupancyModel, Phase, decode_state};
pub use rng::set_seed;
pub use sampler::DiscreteSampler;
pub use tables::{DayType, TableProvider, TableSet, Variant, VariantTables};
