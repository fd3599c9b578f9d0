//! The individual filter and modification stages a [Pipeline](crate::Pipeline) is assembled from.
//!
//! Every stage borrows its input and returns a new [Dataset], so stages can be run and tested
//! independently and composed in any order.
use crate::{
    PipelineError,
    config::{CycleColumn, Interval, OffsetMode},
    cycles::compute_absolute_cycle,
    dataset::{Column, Dataset, DatasetError},
    step_change::step_change_filter,
};
use h2f_common::{Count, Real, columns};
use itertools::Itertools;
use std::fmt::Debug;

/// Whether a stage removes rows or derives values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    /// Selects a subset of rows. The result may be empty.
    Filter,
    /// Adds or replaces columns, keeping every row.
    Modification,
}

/// Implement for every operation which can be applied by a pipeline.
pub trait Stage: Debug {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    fn kind(&self) -> StageKind;

    /// Applies the stage, returning a new dataset.
    fn apply(&self, dataset: &Dataset) -> Result<Dataset, PipelineError>;
}

/// Attaches the stage name to missing column errors.
fn in_stage(stage: &'static str) -> impl Fn(DatasetError) -> PipelineError {
    move |error| match error {
        DatasetError::ColumnNotFound(column) => PipelineError::MissingColumn { stage, column },
        other => PipelineError::Dataset(other),
    }
}

/// Keeps the rows for which `predicate` holds on the named text column.
fn filter_text(
    dataset: &Dataset,
    column: &str,
    predicate: impl Fn(&str) -> bool,
) -> Result<Dataset, DatasetError> {
    let mask = dataset
        .texts(column)?
        .iter()
        .map(|value| predicate(value))
        .collect::<Vec<_>>();
    dataset.filter_rows(&mask)
}

/// Drops rows whose command is exactly `Pause`.
#[derive(Debug)]
pub struct RemovePause;

impl Stage for RemovePause {
    fn name(&self) -> &'static str {
        "pause removal"
    }

    fn kind(&self) -> StageKind {
        StageKind::Filter
    }

    fn apply(&self, dataset: &Dataset) -> Result<Dataset, PipelineError> {
        filter_text(dataset, columns::COMMAND, |command| {
            command != columns::command::PAUSE
        })
        .map_err(in_stage(self.name()))
    }
}

/// Keeps the rows of a single cycle.
///
/// When the absolute cycle is requested and not yet present, it is derived first.
#[derive(Debug)]
pub struct SelectCycle {
    pub column: CycleColumn,
    /// The cycle to keep, or [None] to keep every cycle.
    pub cycle: Option<Count>,
}

impl Stage for SelectCycle {
    fn name(&self) -> &'static str {
        "cycle selection"
    }

    fn kind(&self) -> StageKind {
        StageKind::Filter
    }

    fn apply(&self, dataset: &Dataset) -> Result<Dataset, PipelineError> {
        let dataset = match self.column {
            CycleColumn::AbsCycle if !dataset.has_column(columns::ABS_CYCLE) => {
                compute_absolute_cycle(dataset).map_err(in_stage(self.name()))?
            }
            _ => dataset.clone(),
        };
        let Some(cycle) = self.cycle else {
            return Ok(dataset);
        };
        let mask = dataset
            .integers(self.column.name())
            .map_err(in_stage(self.name()))?
            .iter()
            .map(|&value| value == cycle)
            .collect::<Vec<_>>();
        Ok(dataset.filter_rows(&mask)?)
    }
}

/// Keeps the rows whose command contains a pattern, e.g. `Charge` also matches `Charge CC`.
///
/// Matching is case sensitive, so `Charge` does not match `Discharge`.
#[derive(Debug)]
pub struct SelectHalfCycle {
    pub pattern: &'static str,
}

impl SelectHalfCycle {
    pub fn charge() -> Self {
        Self {
            pattern: columns::command::CHARGE,
        }
    }

    pub fn discharge() -> Self {
        Self {
            pattern: columns::command::DISCHARGE,
        }
    }
}

impl Stage for SelectHalfCycle {
    fn name(&self) -> &'static str {
        "half cycle selection"
    }

    fn kind(&self) -> StageKind {
        StageKind::Filter
    }

    fn apply(&self, dataset: &Dataset) -> Result<Dataset, PipelineError> {
        filter_text(dataset, columns::COMMAND, |command| {
            command.contains(self.pattern)
        })
        .map_err(in_stage(self.name()))
    }
}

/// Keeps the last row of each run of equal values in a column.
#[derive(Debug)]
pub struct StepChange {
    pub column: String,
}

impl Stage for StepChange {
    fn name(&self) -> &'static str {
        "step change filter"
    }

    fn kind(&self) -> StageKind {
        StageKind::Filter
    }

    fn apply(&self, dataset: &Dataset) -> Result<Dataset, PipelineError> {
        step_change_filter(dataset, &self.column).map_err(in_stage(self.name()))
    }
}

/// Keeps the rows whose value in a numeric column lies in an inclusive interval.
#[derive(Debug)]
pub struct RangeFilter {
    pub column: String,
    pub interval: Interval<Real>,
}

impl Stage for RangeFilter {
    fn name(&self) -> &'static str {
        "range filter"
    }

    fn kind(&self) -> StageKind {
        StageKind::Filter
    }

    fn apply(&self, dataset: &Dataset) -> Result<Dataset, PipelineError> {
        let mask = dataset
            .reals(&self.column)
            .map_err(in_stage(self.name()))?
            .into_iter()
            .map(|value| self.interval.is_in(value))
            .collect::<Vec<_>>();
        Ok(dataset.filter_rows(&mask)?)
    }
}

/// Adds the `abs_cycle` column.
#[derive(Debug)]
pub struct AbsoluteCycle;

impl Stage for AbsoluteCycle {
    fn name(&self) -> &'static str {
        "absolute cycle"
    }

    fn kind(&self) -> StageKind {
        StageKind::Modification
    }

    fn apply(&self, dataset: &Dataset) -> Result<Dataset, PipelineError> {
        compute_absolute_cycle(dataset).map_err(in_stage(self.name()))
    }
}

/// Adds `dU/dQ`, the backward difference of voltage over the difference of capacity.
///
/// The first row has no predecessor, so its derivative is `NaN`.
#[derive(Debug)]
pub struct DifferentialVoltage {
    pub capacity_column: &'static str,
}

impl Stage for DifferentialVoltage {
    fn name(&self) -> &'static str {
        "dU/dQ"
    }

    fn kind(&self) -> StageKind {
        StageKind::Modification
    }

    fn apply(&self, dataset: &Dataset) -> Result<Dataset, PipelineError> {
        let voltage = dataset
            .reals(columns::VOLTAGE)
            .map_err(in_stage(self.name()))?;
        let capacity = dataset
            .reals(self.capacity_column)
            .map_err(in_stage(self.name()))?;
        let derivative = std::iter::once(Real::NAN)
            .chain(
                voltage
                    .iter()
                    .tuple_windows()
                    .zip(capacity.iter().tuple_windows())
                    .map(|((u0, u1), (q0, q1))| (u1 - u0) / (q1 - q0)),
            )
            .take(dataset.num_rows())
            .collect();
        Ok(dataset
            .clone()
            .with_column(columns::DU_DQ, Column::Float(derivative))?)
    }
}

/// Adds `U_normalized`, the voltage divided by its maximum over the dataset.
#[derive(Debug)]
pub struct NormalizeVoltage;

impl Stage for NormalizeVoltage {
    fn name(&self) -> &'static str {
        "voltage normalization"
    }

    fn kind(&self) -> StageKind {
        StageKind::Modification
    }

    fn apply(&self, dataset: &Dataset) -> Result<Dataset, PipelineError> {
        let voltage = dataset
            .reals(columns::VOLTAGE)
            .map_err(in_stage(self.name()))?;
        // `max` ignores NaN, so NaN is only produced when every value is NaN.
        let max = voltage.iter().copied().fold(Real::NAN, Real::max);
        let normalized = voltage.iter().map(|u| u / max).collect();
        Ok(dataset
            .clone()
            .with_column(columns::VOLTAGE_NORMALIZED, Column::Float(normalized))?)
    }
}

/// Adds a constant to a numeric column.
#[derive(Debug)]
pub struct Offset {
    pub column: String,
    pub value: Real,
    pub mode: OffsetMode,
}

impl Offset {
    pub fn target_column(&self) -> String {
        match self.mode {
            OffsetMode::Replace => self.column.clone(),
            OffsetMode::NewColumn => format!("{}{}", self.column, columns::OFFSET_SUFFIX),
        }
    }
}

impl Stage for Offset {
    fn name(&self) -> &'static str {
        "offset"
    }

    fn kind(&self) -> StageKind {
        StageKind::Modification
    }

    fn apply(&self, dataset: &Dataset) -> Result<Dataset, PipelineError> {
        let shifted = dataset
            .reals(&self.column)
            .map_err(in_stage(self.name()))?
            .into_iter()
            .map(|value| value + self.value)
            .collect();
        Ok(dataset
            .clone()
            .with_column(self.target_column(), Column::Float(shifted))?)
    }
}
