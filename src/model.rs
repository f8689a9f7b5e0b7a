use crate::error::{OccupancyError, OccupancyResult};
use crate::rng;
use crate::sampler;
use crate::tables::{DayType, START_CLASSES, TableProvider, Variant, VariantTables};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of ten-minute intervals in a simulated day.
pub const INTERVALS_PER_DAY: usize = 144;

/// Result of one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayResult {
    pub day_type: DayType,
    /// State the chain was in before the first interval.
    pub initial_state: usize,
    /// Raw chain state of every interval.
    pub trajectory: Vec<usize>,
    /// Residents at home and active.
    pub activity: Vec<usize>,
    /// Residents at home but not active (four-state variant only).
    pub no_activity: Option<Vec<usize>>,
}

/// Run state of a simulator.
///
/// Once a day has been simulated the phase stays `Ran`, and the final state
/// of the latest day seeds the next one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    NotRun,
    Ran(DayResult),
}

impl Phase {
    /// Final chain state of the latest simulated day.
    pub fn last_state(&self) -> Option<usize> {
        match self {
            Self::NotRun => None,
            Self::Ran(day) => day.trajectory.last().copied(),
        }
    }
}

/// Decode a four-state chain state into `(active, inactive)` residents at home.
///
/// The state packs `home * (residents + 1) + active`. Tables are not trusted
/// to keep `active <= home`, so both counts are clipped.
pub fn decode_state(state: usize, residents: usize) -> (usize, usize) {
    let home = state / (residents + 1);
    let active = state % (residents + 1);
    (home.min(active), home.saturating_sub(active))
}

/// Occupancy simulator of a single household.
pub struct OccupancyModel<'a> {
    residents: usize,
    variant: Variant,
    tables: &'a VariantTables,
    phase: Phase,
}

impl<'a> OccupancyModel<'a> {
    /// Create a simulator, resolving the tables of `variant` right away.
    ///
    /// # Errors
    /// Fails if `residents` is zero or `provider` has no tables for `variant`.
    pub fn new<P>(provider: &'a P, residents: usize, variant: Variant) -> OccupancyResult<Self>
    where
        P: TableProvider + ?Sized,
    {
        Self::resume(provider, residents, variant, Phase::NotRun)
    }

    /// Create a simulator that continues from a previously saved [`Phase`].
    pub fn resume<P>(
        provider: &'a P,
        residents: usize,
        variant: Variant,
        phase: Phase,
    ) -> OccupancyResult<Self>
    where
        P: TableProvider + ?Sized,
    {
        if residents < 1 {
            return Err(OccupancyError::InvalidResidents(residents));
        }
        let tables = provider.resolve(variant)?;
        Ok(Self {
            residents,
            variant,
            tables,
            phase,
        })
    }

    /// Reseed the process-wide random stream used by [`Self::run`].
    pub fn set_seed(seed: u64) {
        rng::set_seed(seed);
    }

    /// Simulate one day drawing from the process-wide random stream.
    pub fn run(&mut self, day_type: DayType) -> OccupancyResult<()> {
        rng::with_default_rng(|rng| self.run_with_rng(day_type, rng))
    }

    /// Simulate one day drawing from `rng`.
    ///
    /// On the first call the initial state is drawn from the start
    /// distribution; afterwards it is the final state of the previous day.
    /// On error the results of the previous day are left untouched.
    pub fn run_with_rng<R: Rng + ?Sized>(
        &mut self,
        day_type: DayType,
        rng: &mut R,
    ) -> OccupancyResult<()> {
        let tables = self.tables;
        let day = tables.lookup(self.variant, day_type, self.residents)?;
        let n_states = self.num_states();

        // The start draw is consumed even when the previous day overrides it.
        let start_ix = sampler::sample(&day.start, rng)?;
        let mut state = match self.variant {
            // Start classes come in rows of seven per home count.
            Variant::FourState => {
                (self.residents + 1) * (start_ix / START_CLASSES) + start_ix % START_CLASSES
            }
            Variant::SevenState => start_ix,
        };
        if let Some(last_state) = self.phase.last_state() {
            state = last_state;
        }
        check_state(state, n_states)?;
        let initial_state = state;

        let mut trajectory = Vec::with_capacity(INTERVALS_PER_DAY);
        for interval in 0..INTERVALS_PER_DAY {
            let row = day.transitions.row(n_states * interval + state)?;
            state = sampler::sample(row, rng)?;
            check_state(state, n_states)?;
            trajectory.push(state);
        }

        let (activity, no_activity) = match self.variant {
            Variant::FourState => {
                let (activity, no_activity): (Vec<_>, Vec<_>) = trajectory
                    .iter()
                    .map(|&state| decode_state(state, self.residents))
                    .unzip();
                (activity, Some(no_activity))
            }
            Variant::SevenState => (trajectory.clone(), None),
        };

        log::debug!(
            "simulated {day_type} for {} residents from state {initial_state}",
            self.residents
        );

        self.phase = Phase::Ran(DayResult {
            day_type,
            initial_state,
            trajectory,
            activity,
            no_activity,
        });

        Ok(())
    }

    pub fn residents(&self) -> usize {
        self.residents
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn num_states(&self) -> usize {
        self.variant.num_states(self.residents)
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn into_phase(self) -> Phase {
        self.phase
    }

    /// Result of the latest simulated day.
    pub fn day_result(&self) -> OccupancyResult<&DayResult> {
        match &self.phase {
            Phase::NotRun => Err(OccupancyError::NotRun),
            Phase::Ran(day) => Ok(day),
        }
    }

    pub fn initial_state(&self) -> OccupancyResult<usize> {
        Ok(self.day_result()?.initial_state)
    }

    pub fn trajectory(&self) -> OccupancyResult<&[usize]> {
        Ok(&self.day_result()?.trajectory)
    }

    /// Number of residents at home and active in each interval.
    pub fn activity(&self) -> OccupancyResult<&[usize]> {
        Ok(&self.day_result()?.activity)
    }

    /// Number of residents at home but not active in each interval.
    ///
    /// # Errors
    /// Fails before the first run and for the seven-state variant.
    pub fn no_activity(&self) -> OccupancyResult<&[usize]> {
        self.day_result()?
            .no_activity
            .as_deref()
            .ok_or(OccupancyError::VariantMismatch)
    }
}

fn check_state(state: usize, num_states: usize) -> OccupancyResult<()> {
    if state >= num_states {
        return Err(OccupancyError::StateOutOfRange { state, num_states });
    }
    Ok(())
}
