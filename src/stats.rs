use serde::{Deserialize, Serialize};

/// Online mean and standard deviation (Welford).
#[derive(Default)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

/// Series of correlated values, such as day-to-day averages of one run.
#[derive(Default)]
pub struct TimeSeries {
    vals: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimeSeriesReport {
    pub mean: f64,
    pub std_dev: f64,
    pub sem: f64,
    pub is_equil: bool,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, val: f64) {
        self.vals.push(val);
    }

    /// Report statistics of the series after discarding its equilibration part.
    pub fn report(&self) -> TimeSeriesReport {
        if self.vals.is_empty() {
            return TimeSeriesReport {
                mean: f64::NAN,
                std_dev: f64::NAN,
                sem: f64::NAN,
                is_equil: false,
            };
        }
        let i_equil = compute_opt_i_equil(&self.vals);
        let equil_vals = &self.vals[i_equil..];
        TimeSeriesReport {
            mean: compute_mean(equil_vals),
            std_dev: compute_var(equil_vals).sqrt(),
            sem: compute_sem(equil_vals),
            is_equil: i_equil != self.vals.len() / 2,
        }
    }
}

fn compute_mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

fn compute_var(vals: &[f64]) -> f64 {
    let n_vals = vals.len();
    if n_vals < 2 {
        return f64::NAN;
    }
    let mean = compute_mean(vals);
    vals.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / (n_vals - 1) as f64
}

/// Standard error of the mean by Flyvbjerg-Petersen blocking.
///
/// Consecutive simulated days share their boundary state, so the plain
/// `std_dev / sqrt(n)` estimate is too optimistic.
fn compute_sem(vals: &[f64]) -> f64 {
    let mut blk_vals = vals.to_vec();
    let mut sem2_ests = Vec::new();
    let mut sem2_errs = Vec::new();

    while blk_vals.len() >= 2 {
        let n_vals = blk_vals.len() as f64;
        let sem2_est = compute_var(&blk_vals) / n_vals;
        sem2_ests.push(sem2_est);
        sem2_errs.push(sem2_est * (2.0 / (n_vals - 1.0)).sqrt());

        blk_vals = blk_vals
            .chunks_exact(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect();
    }

    // First blocking level that is compatible with all coarser ones.
    for (idx, &sem2_est) in sem2_ests.iter().enumerate() {
        let max_low = sem2_ests[idx..]
            .iter()
            .zip(&sem2_errs[idx..])
            .map(|(est, err)| est - err)
            .fold(f64::NEG_INFINITY, f64::max);
        if sem2_est > max_low {
            return sem2_est.sqrt();
        }
    }

    sem2_ests.last().copied().unwrap_or(f64::NAN).sqrt()
}

/// Equilibration index minimizing the marginal standard error.
fn compute_opt_i_equil(vals: &[f64]) -> usize {
    let n_vals = vals.len();
    let n_idxs = n_vals.ilog2() + 1;
    let mut min_mse = f64::INFINITY;
    let mut opt_i_equil = n_vals / 2;

    for i_equil in (0..n_idxs).map(|idx| n_vals / 2usize.pow(n_idxs - idx)) {
        let tail = &vals[i_equil..];
        let n_tail = tail.len();
        let mse = compute_var(tail) * (n_tail - 1) as f64 / n_tail.pow(2) as f64;
        if mse < min_mse {
            min_mse = mse;
            opt_i_equil = i_equil;
        }
    }

    opt_i_equil
}
