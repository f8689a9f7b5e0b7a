use crate::model::DayResult;
use serde::{Deserialize, Serialize};

/// Record of one simulated day.
///
/// Contains the day index since the start of the run and the day's results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Days simulated before this one in the same run.
    pub day: usize,

    /// Results of the day.
    pub result: DayResult,
}
