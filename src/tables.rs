use crate::error::{OccupancyError, OccupancyResult};
use crate::model::INTERVALS_PER_DAY;
use crate::utils::{check_mat, check_num, check_vec};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, fs, path::Path};

/// Number of coarse classes in the start-state distributions.
pub const START_CLASSES: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayType {
    #[serde(rename = "wd")]
    Weekday,
    #[serde(rename = "we")]
    Weekend,
}

impl DayType {
    /// Day type of a day of the week, `0` being Monday.
    pub fn from_day_of_week(day: usize) -> Self {
        match day % 7 {
            5 | 6 => Self::Weekend,
            _ => Self::Weekday,
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekday => f.write_str("weekday"),
            Self::Weekend => f.write_str("weekend"),
        }
    }
}

/// Modeling mode of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    /// States encode `(home, active)` resident counts.
    FourState,
    /// States are the number of active occupants directly.
    SevenState,
}

impl Variant {
    pub fn from_four_states(four_states: bool) -> Self {
        if four_states {
            Self::FourState
        } else {
            Self::SevenState
        }
    }

    /// Number of chain states, which is also the row jump between intervals.
    pub fn num_states(self, residents: usize) -> usize {
        match self {
            Self::FourState => (residents + 1).pow(2),
            Self::SevenState => START_CLASSES,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FourState => f.write_str("four-state"),
            Self::SevenState => f.write_str("seven-state"),
        }
    }
}

/// Start-state matrices; rows are start classes, columns household sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartStates {
    pub wd: Vec<Vec<f64>>,
    pub we: Vec<Vec<f64>>,
}

impl StartStates {
    pub fn matrix(&self, day_type: DayType) -> &[Vec<f64>] {
        match day_type {
            DayType::Weekday => &self.wd,
            DayType::Weekend => &self.we,
        }
    }

    /// Start distribution of a household with `residents` members.
    ///
    /// Returns `None` if the matrix has no column for that household size.
    pub fn distribution(&self, day_type: DayType, residents: usize) -> Option<Vec<f64>> {
        let col = residents.checked_sub(1)?;
        let mat = self.matrix(day_type);
        if mat.is_empty() {
            return None;
        }
        mat.iter().map(|row| row.get(col).copied()).collect()
    }
}

/// Stacked per-interval transition rows of one household size and day type.
///
/// Block `t` spans rows `t * num_states .. (t + 1) * num_states`; row
/// `t * num_states + s` holds the weights of moving from state `s`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionTable {
    pub day_type: DayType,
    pub residents: usize,
    pub rows: Vec<Vec<f64>>,
}

impl TransitionTable {
    pub fn row(&self, row: usize) -> OccupancyResult<&[f64]> {
        self.rows
            .get(row)
            .map(Vec::as_slice)
            .ok_or(OccupancyError::MissingRow {
                row,
                len: self.rows.len(),
            })
    }
}

/// Tables of one day type and household size, resolved for a run.
#[derive(Debug)]
pub struct DayTables<'a> {
    pub start: Vec<f64>,
    pub transitions: &'a TransitionTable,
}

/// All tables of one variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantTables {
    pub start: StartStates,
    #[serde(default)]
    pub transitions: Vec<TransitionTable>,
}

impl VariantTables {
    /// Resolve the start distribution and transition table for one run.
    pub fn lookup(
        &self,
        variant: Variant,
        day_type: DayType,
        residents: usize,
    ) -> OccupancyResult<DayTables<'_>> {
        let missing = || OccupancyError::MissingTables {
            variant,
            day_type,
            residents,
        };
        let start = self
            .start
            .distribution(day_type, residents)
            .ok_or_else(missing)?;
        let transitions = self
            .transitions
            .iter()
            .find(|table| table.day_type == day_type && table.residents == residents)
            .ok_or_else(missing)?;
        Ok(DayTables { start, transitions })
    }

    /// Check table shapes. Probabilities are only required to be
    /// non-negative and finite, with a finite sum per distribution.
    pub fn validate(&self, variant: Variant) -> Result<()> {
        for day_type in [DayType::Weekday, DayType::Weekend] {
            let mat = self.start.matrix(day_type);
            let n_cols = mat.first().map_or(0, Vec::len);
            check_num(n_cols, 1..)
                .with_context(|| format!("invalid {day_type} start table width"))?;
            check_mat(mat, (mat.len(), n_cols))
                .with_context(|| format!("invalid {day_type} start table"))?;
            for i_col in 0..n_cols {
                let col: Vec<f64> = mat.iter().map(|row| row[i_col]).collect();
                check_vec(&col, mat.len())
                    .with_context(|| format!("invalid {day_type} start column {i_col}"))?;
            }
        }

        let mut seen = HashSet::new();
        for table in &self.transitions {
            let key = (table.day_type, table.residents);
            if !seen.insert(key) {
                bail!(
                    "duplicate {} transition table for {} residents",
                    table.day_type,
                    table.residents
                );
            }
            check_num(table.residents, 1..)
                .context("invalid number of residents in transition table")?;
            let n_states = variant.num_states(table.residents);
            check_mat(&table.rows, (INTERVALS_PER_DAY * n_states, n_states)).with_context(
                || {
                    format!(
                        "invalid {} transition table for {} residents",
                        table.day_type, table.residents
                    )
                },
            )?;
        }
        Ok(())
    }
}

/// Lookup service supplying the tables of a variant.
pub trait TableProvider {
    fn resolve(&self, variant: Variant) -> OccupancyResult<&VariantTables>;
}

/// Tables of both variants, as loaded from a tables file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSet {
    pub four_state: Option<VariantTables>,
    pub seven_state: Option<VariantTables>,
}

impl TableSet {
    /// Load a [`TableSet`] from a TOML file and validate its shapes.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if any table has the wrong shape.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        let tables: TableSet = toml::from_str(&contents).context("failed to deserialize tables")?;
        tables.validate().context("failed to validate tables")?;
        Ok(tables)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(tables) = &self.four_state {
            tables
                .validate(Variant::FourState)
                .context("invalid four-state tables")?;
        }
        if let Some(tables) = &self.seven_state {
            tables
                .validate(Variant::SevenState)
                .context("invalid seven-state tables")?;
        }
        Ok(())
    }
}

impl TableProvider for TableSet {
    fn resolve(&self, variant: Variant) -> OccupancyResult<&VariantTables> {
        let tables = match variant {
            Variant::FourState => self.four_state.as_ref(),
            Variant::SevenState => self.seven_state.as_ref(),
        };
        tables.ok_or(OccupancyError::MissingVariant(variant))
    }
}
