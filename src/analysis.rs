use crate::config::Config;
use crate::model::INTERVALS_PER_DAY;
use crate::stats::{Accumulator, AccumulatorReport, TimeSeries, TimeSeriesReport};
use crate::tables::DayType;
use crate::types::Record;
use anyhow::{Context, Result, bail};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Report of a single observable.
#[derive(Debug, Serialize, Deserialize)]
pub enum ObsReport {
    /// Per-interval occupancy of one day type.
    Profile {
        day_type: DayType,
        n_days: usize,
        activity: Vec<AccumulatorReport>,
        no_activity: Vec<AccumulatorReport>,
    },
    /// Daily mean of active occupants over the whole run.
    DailyActivity(TimeSeriesReport),
}

pub trait Obs {
    fn update(&mut self, record: &Record) -> Result<()>;
    fn report(&self) -> ObsReport;
}

/// Mean occupancy in each interval, over the days of one day type.
pub struct Profile {
    day_type: DayType,
    n_days: usize,
    activity: Vec<Accumulator>,
    no_activity: Vec<Accumulator>,
}

impl Profile {
    pub fn new(day_type: DayType) -> Self {
        let mut activity = Vec::new();
        activity.resize_with(INTERVALS_PER_DAY, Accumulator::new);
        let mut no_activity = Vec::new();
        no_activity.resize_with(INTERVALS_PER_DAY, Accumulator::new);
        Self {
            day_type,
            n_days: 0,
            activity,
            no_activity,
        }
    }
}

impl Obs for Profile {
    fn update(&mut self, record: &Record) -> Result<()> {
        let result = &record.result;
        if result.day_type != self.day_type {
            return Ok(());
        }
        check_len(&result.activity).context("invalid activity series")?;
        for (acc, &val) in self.activity.iter_mut().zip(&result.activity) {
            acc.add(val as f64);
        }
        if let Some(no_activity) = &result.no_activity {
            check_len(no_activity).context("invalid no-activity series")?;
            for (acc, &val) in self.no_activity.iter_mut().zip(no_activity) {
                acc.add(val as f64);
            }
        }
        self.n_days += 1;
        Ok(())
    }

    fn report(&self) -> ObsReport {
        let reports = |accs: &[Accumulator]| -> Vec<AccumulatorReport> {
            accs.iter().map(Accumulator::report).collect()
        };
        ObsReport::Profile {
            day_type: self.day_type,
            n_days: self.n_days,
            activity: reports(&self.activity),
            no_activity: reports(&self.no_activity),
        }
    }
}

pub struct DailyActivity {
    time_series: TimeSeries,
}

impl DailyActivity {
    pub fn new() -> Self {
        Self {
            time_series: TimeSeries::new(),
        }
    }
}

impl Obs for DailyActivity {
    fn update(&mut self, record: &Record) -> Result<()> {
        let activity = &record.result.activity;
        check_len(activity).context("invalid activity series")?;
        let sum: usize = activity.iter().sum();
        self.time_series.push(sum as f64 / INTERVALS_PER_DAY as f64);
        Ok(())
    }

    fn report(&self) -> ObsReport {
        ObsReport::DailyActivity(self.time_series.report())
    }
}

fn check_len(series: &[usize]) -> Result<()> {
    let len = series.len();
    if len != INTERVALS_PER_DAY {
        bail!("series length must be {INTERVALS_PER_DAY}, but is {len}");
    }
    Ok(())
}

pub struct Analyzer {
    cfg: Config,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(Profile::new(DayType::Weekday)),
            Box::new(Profile::new(DayType::Weekend)),
            Box::new(DailyActivity::new()),
        ];
        Self { cfg, obs_ptr_vec }
    }

    pub fn add_record(&mut self, record: &Record) -> Result<()> {
        for obs in &mut self.obs_ptr_vec {
            obs.update(record).context("failed to update observable")?;
        }
        Ok(())
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..self.cfg.days_per_file {
            let record: Record = decode::from_read(&mut reader).context("failed to read record")?;
            self.add_record(&record)?;
        }
        Ok(())
    }

    pub fn reports(&self) -> Vec<ObsReport> {
        self.obs_ptr_vec.iter().map(|obs| obs.report()).collect()
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        encode::write(&mut writer, &self.reports()).context("failed to serialize results")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DayResult, OccupancyModel};
    use crate::tables::{
        START_CLASSES, StartStates, TableSet, TransitionTable, Variant, VariantTables,
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;
    use std::path::PathBuf;

    fn cfg() -> Config {
        Config {
            residents: 1,
            four_states: true,
            tables: PathBuf::from("tables.toml"),
            start_day: 0,
            days_per_file: 1,
            seed: None,
        }
    }

    fn record(day: usize, day_type: DayType, active: usize) -> Record {
        Record {
            day,
            result: DayResult {
                day_type,
                initial_state: 0,
                trajectory: vec![0; INTERVALS_PER_DAY],
                activity: vec![active; INTERVALS_PER_DAY],
                no_activity: Some(vec![1 - active; INTERVALS_PER_DAY]),
            },
        }
    }

    #[test]
    fn profiles_split_by_day_type() {
        let mut analyzer = Analyzer::new(cfg());
        analyzer.add_record(&record(0, DayType::Weekday, 1)).unwrap();
        analyzer.add_record(&record(1, DayType::Weekday, 0)).unwrap();
        analyzer.add_record(&record(2, DayType::Weekend, 1)).unwrap();

        let reports = analyzer.reports();
        match &reports[0] {
            ObsReport::Profile {
                day_type,
                n_days,
                activity,
                no_activity,
            } => {
                assert_eq!(*day_type, DayType::Weekday);
                assert_eq!(*n_days, 2);
                assert_eq!(activity[0].mean, 0.5);
                assert_eq!(no_activity[143].mean, 0.5);
            }
            other => panic!("unexpected report {other:?}"),
        }
        match &reports[1] {
            ObsReport::Profile {
                n_days, activity, ..
            } => {
                assert_eq!(*n_days, 1);
                assert_eq!(activity[10].mean, 1.0);
            }
            other => panic!("unexpected report {other:?}"),
        }
        match &reports[2] {
            ObsReport::DailyActivity(report) => {
                assert!((report.mean - 2.0 / 3.0).abs() < 1e-12);
            }
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[test]
    fn short_series_is_rejected() {
        let mut analyzer = Analyzer::new(cfg());
        let mut bad = record(0, DayType::Weekday, 1);
        bad.result.activity.pop();
        assert!(analyzer.add_record(&bad).is_err());
    }

    /// Seven-state tables whose chain starts in state 0 and leaves states
    /// 0, 1 and 2 slowly, one step at a time, for states 3 to 6, where it
    /// then draws uniformly every interval.
    fn slow_start_tables() -> VariantTables {
        let n_states = 7;
        let p_step = 1.0 / 1440.0;
        let row = |state: usize| {
            let mut row = vec![0.0; n_states];
            if state < 3 {
                row[state] = 1.0 - p_step;
                row[state + 1] = p_step;
            } else {
                row[3..].fill(1.0);
            }
            row
        };
        let rows: Vec<_> = (0..INTERVALS_PER_DAY * n_states)
            .map(|idx| row(idx % n_states))
            .collect();
        let mut start = vec![vec![0.0]; START_CLASSES];
        start[0][0] = 1.0;
        VariantTables {
            start: StartStates {
                wd: start.clone(),
                we: start,
            },
            transitions: [DayType::Weekday, DayType::Weekend]
                .into_iter()
                .map(|day_type| TransitionTable {
                    day_type,
                    residents: 1,
                    rows: rows.clone(),
                })
                .collect(),
        }
    }

    #[test]
    fn equilibration_cut_drops_the_initial_transient() {
        let tables = TableSet {
            seven_state: Some(slow_start_tables()),
            ..Default::default()
        };
        let mut model = OccupancyModel::new(&tables, 1, Variant::SevenState).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let mut analyzer = Analyzer::new(cfg());
        let n_days = 512;
        let mut daily_means = Vec::with_capacity(n_days);
        for day in 0..n_days {
            let day_type = DayType::from_day_of_week(day);
            model.run_with_rng(day_type, &mut rng).unwrap();
            let record = Record {
                day,
                result: model.day_result().unwrap().clone(),
            };
            let sum: usize = record.result.activity.iter().sum();
            daily_means.push(sum as f64 / INTERVALS_PER_DAY as f64);
            analyzer.add_record(&record).unwrap();
        }
        assert!(daily_means[0] < 3.0, "got {}", daily_means[0]);
        let raw_mean = daily_means.iter().sum::<f64>() / n_days as f64;

        match &analyzer.reports()[2] {
            ObsReport::DailyActivity(report) => {
                // states 3 to 6 are equally likely once the chain has left 0, 1 and 2
                assert!((report.mean - 4.5).abs() < 0.05, "got {}", report.mean);
                assert!(raw_mean < report.mean);
                assert!(report.sem.is_finite() && report.sem < 0.05, "got {}", report.sem);
                assert!(report.is_equil);
            }
            other => panic!("unexpected report {other:?}"),
        }
    }
}
