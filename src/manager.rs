use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::Engine;
use crate::tables::{DayType, TableProvider, TableSet};
use anyhow::{Context, Result, bail};
use glob::glob;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Layout of a simulation directory.
///
/// `config.toml` and the tables file sit at the top; every run gets a
/// `run-NNNN` directory with its trajectory files, checkpoint and results.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
    tables: TableSet,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        let tables_file = sim_dir.join(&cfg.tables);
        let tables = TableSet::from_file(&tables_file)
            .with_context(|| format!("failed to load {tables_file:?}"))?;
        log::info!("loaded {tables_file:?}");

        check_household(&tables, &cfg).context("tables do not match config")?;

        Ok(Self {
            sim_dir,
            cfg,
            tables,
        })
    }

    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let result = Engine::new(self.cfg.clone())
            .context("failed to construct engine")
            .and_then(|engine| self.simulate(run_idx, 0, engine));
        if result.is_err() {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        result
    }

    pub fn resume_run(&self, run_idx: usize) -> Result<()> {
        let file_idx = self
            .count_trajectory_files(run_idx)
            .context("failed to count trajectory files")?;

        let checkpoint_file = self.checkpoint_file(run_idx);
        let engine = Engine::load_checkpoint(&checkpoint_file)
            .with_context(|| format!("failed to load {checkpoint_file:?}"))?;
        if engine.cfg() != &self.cfg {
            bail!("checkpoint config differs from the current config");
        }
        log::info!("loaded {checkpoint_file:?}");

        self.simulate(run_idx, file_idx, engine)
    }

    fn simulate(&self, run_idx: usize, file_idx: usize, mut engine: Engine) -> Result<()> {
        let trajectory_file = self.trajectory_file(run_idx, file_idx);
        if let Err(error) = engine.perform_simulation(&self.tables, &trajectory_file) {
            if trajectory_file.exists() {
                fs::remove_file(&trajectory_file)
                    .with_context(|| format!("failed to remove {trajectory_file:?}"))?;
            }
            return Err(error.context("failed to perform simulation"));
        }
        log::info!("simulated {} days in run {run_idx}", engine.day());

        engine
            .save_checkpoint(self.checkpoint_file(run_idx))
            .context("failed to save checkpoint")?;

        Ok(())
    }

    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            self.analyze_run(run_idx)
                .with_context(|| format!("failed to analyze run {run_idx}"))?;
        }
        Ok(())
    }

    pub fn analyze_run(&self, run_idx: usize) -> Result<()> {
        let run_dir = self.run_dir(run_idx);
        if !run_dir.is_dir() {
            bail!("{run_dir:?} does not exist");
        }

        let mut analyzer = Analyzer::new(self.cfg.clone());
        let n_files = self
            .count_trajectory_files(run_idx)
            .context("failed to count trajectory files")?;
        for file_idx in 0..n_files {
            analyzer
                .add_file(self.trajectory_file(run_idx, file_idx))
                .context("failed to add file")?;
        }

        let results_file = self.results_file(run_idx);
        analyzer
            .save_results(&results_file)
            .context("failed to save results")?;
        log::info!("saved {results_file:?}");

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs()? {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        Ok(self.run_dirs()?.len())
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn count_trajectory_files(&self, run_idx: usize) -> Result<usize> {
        let pattern = self.run_dir(run_idx).join("trajectory-*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob(pattern)
            .context("failed to glob trajectory files")?
            .filter_map(Result::ok)
            .count();
        Ok(count)
    }

    fn checkpoint_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("checkpoint.msgpack")
    }

    fn trajectory_file(&self, run_idx: usize, file_idx: usize) -> PathBuf {
        self.run_dir(run_idx)
            .join(format!("trajectory-{file_idx:04}.msgpack"))
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.msgpack")
    }
}

/// Check that `tables` cover every day type of the configured household.
fn check_household(tables: &TableSet, cfg: &Config) -> Result<()> {
    let variant = cfg.variant();
    let variant_tables = tables.resolve(variant)?;
    for day_type in [DayType::Weekday, DayType::Weekend] {
        variant_tables.lookup(variant, day_type, cfg.residents)?;
    }
    Ok(())
}
