use crate::config::Config;
use crate::model::{OccupancyModel, Phase};
use crate::tables::{DayType, TableSet};
use crate::types::Record;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Simulation engine.
///
/// Holds the configuration, the simulator phase, the number of simulated
/// days and the random number generator, and provides methods to run,
/// save, and load multi-day simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    day: usize,
    phase: Phase,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` that has not simulated any day yet.
    pub fn new(cfg: Config) -> Result<Self> {
        let rng = match cfg.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng().context("failed to seed rng")?,
        };
        Ok(Self {
            cfg,
            day: 0,
            phase: Phase::NotRun,
            rng,
        })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    /// Number of days simulated so far.
    pub fn day(&self) -> usize {
        self.day
    }

    /// Simulate the next `days_per_file` days and save their records to a binary file.
    ///
    /// The first day continues from the final state of the previous call.
    /// The engine state only advances if the whole block succeeds.
    pub fn perform_simulation<P: AsRef<Path>>(&mut self, tables: &TableSet, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let mut model = OccupancyModel::resume(
            tables,
            self.cfg.residents,
            self.cfg.variant(),
            self.phase.clone(),
        )
        .context("failed to construct model")?;
        let mut rng = self.rng.clone();

        let n_days = self.cfg.days_per_file;
        for i_day in 0..n_days {
            let day = self.day + i_day;
            let day_type = DayType::from_day_of_week(self.cfg.start_day + day);
            model
                .run_with_rng(day_type, &mut rng)
                .with_context(|| format!("failed to simulate day {day}"))?;

            let record = Record {
                day,
                result: model.day_result()?.clone(),
            };
            encode::write(&mut writer, &record).context("failed to serialize record")?;

            let progress = 100.0 * (i_day + 1) as f64 / n_days as f64;
            log::info!("completed {progress:06.2}%");
        }

        writer.flush().context("failed to flush writer stream")?;

        self.day += n_days;
        self.phase = model.into_phase();
        self.rng = rng;

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::INTERVALS_PER_DAY;
    use crate::tables::{START_CLASSES, StartStates, TransitionTable, VariantTables};
    use std::{env, fs, path::PathBuf};

    fn tables() -> TableSet {
        let start = vec![vec![1.0; 2]; START_CLASSES];
        let transitions = [DayType::Weekday, DayType::Weekend]
            .into_iter()
            .map(|day_type| TransitionTable {
                day_type,
                residents: 2,
                rows: vec![vec![1.0; START_CLASSES]; INTERVALS_PER_DAY * START_CLASSES],
            })
            .collect();
        TableSet {
            four_state: None,
            seven_state: Some(VariantTables {
                start: StartStates {
                    wd: start.clone(),
                    we: start,
                },
                transitions,
            }),
        }
    }

    fn cfg() -> Config {
        Config {
            residents: 2,
            four_states: false,
            tables: PathBuf::from("tables.toml"),
            start_day: 4,
            days_per_file: 3,
            seed: Some(11),
        }
    }

    fn test_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("occupancy-sim-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn read_records(file: &Path, n_records: usize) -> Vec<Record> {
        let mut reader = BufReader::new(File::open(file).unwrap());
        (0..n_records)
            .map(|_| decode::from_read(&mut reader).unwrap())
            .collect()
    }

    #[test]
    fn records_follow_the_calendar() {
        let dir = test_dir("calendar");
        let file = dir.join("trajectory.msgpack");
        let mut engine = Engine::new(cfg()).unwrap();
        engine.perform_simulation(&tables(), &file).unwrap();
        assert_eq!(engine.day(), 3);

        let records = read_records(&file, 3);
        let day_types: Vec<_> = records.iter().map(|r| r.result.day_type).collect();
        assert_eq!(
            day_types,
            [DayType::Weekday, DayType::Weekend, DayType::Weekend]
        );
        for pair in records.windows(2) {
            let last = *pair[0].result.trajectory.last().unwrap();
            assert_eq!(pair[1].result.initial_state, last);
        }
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn failed_block_leaves_engine_untouched() {
        let dir = test_dir("failed-block");
        let mut weekdays_only = tables();
        if let Some(tables) = weekdays_only.seven_state.as_mut() {
            tables
                .transitions
                .retain(|table| table.day_type == DayType::Weekday);
        }

        // the block starts on a Friday and fails on Saturday
        let mut engine = Engine::new(cfg()).unwrap();
        let err = engine
            .perform_simulation(&weekdays_only, dir.join("failed.msgpack"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to simulate day 1"));
        assert_eq!(engine.day(), 0);

        engine
            .perform_simulation(&tables(), dir.join("retry.msgpack"))
            .unwrap();
        let mut fresh = Engine::new(cfg()).unwrap();
        fresh
            .perform_simulation(&tables(), dir.join("fresh.msgpack"))
            .unwrap();
        assert_eq!(engine.day(), 3);

        let retry_records = read_records(&dir.join("retry.msgpack"), 3);
        let fresh_records = read_records(&dir.join("fresh.msgpack"), 3);
        for (a, b) in retry_records.iter().zip(&fresh_records) {
            assert_eq!(a.day, b.day);
            assert_eq!(a.result, b.result);
        }
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn checkpoint_resumes_the_same_stream() {
        let dir = test_dir("checkpoint");
        let tables = tables();

        // one engine simulating two blocks in a row
        let mut straight = Engine::new(cfg()).unwrap();
        straight
            .perform_simulation(&tables, dir.join("a-0.msgpack"))
            .unwrap();
        straight
            .perform_simulation(&tables, dir.join("a-1.msgpack"))
            .unwrap();

        // the same, going through a checkpoint in between
        let mut engine = Engine::new(cfg()).unwrap();
        engine
            .perform_simulation(&tables, dir.join("b-0.msgpack"))
            .unwrap();
        engine.save_checkpoint(dir.join("checkpoint.msgpack")).unwrap();
        let mut resumed = Engine::load_checkpoint(dir.join("checkpoint.msgpack")).unwrap();
        assert_eq!(resumed.cfg(), &cfg());
        assert_eq!(resumed.day(), 3);
        resumed
            .perform_simulation(&tables, dir.join("b-1.msgpack"))
            .unwrap();

        let straight_records = read_records(&dir.join("a-1.msgpack"), 3);
        let resumed_records = read_records(&dir.join("b-1.msgpack"), 3);
        for (a, b) in straight_records.iter().zip(&resumed_records) {
            assert_eq!(a.day, b.day);
            assert_eq!(a.result, b.result);
        }
        fs::remove_dir_all(&dir).ok();
    }
}
