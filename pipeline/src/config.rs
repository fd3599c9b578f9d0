//! Serializable settings describing which filters and modifications a pipeline run applies.
//!
//! Field names match the keys stored in project files, so a configuration can be read directly
//! from the JSON written alongside a saved dataset.
use h2f_common::{Count, Real, columns};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, ops::RangeInclusive, str::FromStr};
use strum::{Display as StrumDisplay, EnumString};
use thiserror::Error;

/// An inclusive range of values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Interval<T> {
    pub fn range_inclusive(&self) -> RangeInclusive<T> {
        self.min..=self.max
    }

    pub fn is_in(&self, value: T) -> bool {
        self.range_inclusive().contains(&value)
    }
}

/// Which cycle counter the cycle selection refers to.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, StrumDisplay, EnumString, Serialize, Deserialize,
)]
pub enum CycleColumn {
    /// The raw counter written by the cycler.
    #[default]
    #[strum(serialize = "Cyc-Count")]
    #[serde(rename = "Cyc-Count")]
    CycCount,
    /// The derived, monotonically non-decreasing counter.
    #[strum(serialize = "abs_cycle")]
    #[serde(rename = "abs_cycle")]
    AbsCycle,
}

impl CycleColumn {
    pub fn name(&self) -> &'static str {
        match self {
            CycleColumn::CycCount => columns::CYCLE_COUNT,
            CycleColumn::AbsCycle => columns::ABS_CYCLE,
        }
    }
}

/// The cycle to keep when cycle selection is enabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CycleValueRepr", into = "CycleValueRepr")]
pub enum CycleValue {
    /// Keep every cycle.
    #[default]
    All,
    Cycle(Count),
}

const ALL_CYCLES: &str = "All";

#[derive(Debug, Error)]
#[error("Expected a cycle number or \"{ALL_CYCLES}\", found \"{0}\"")]
pub struct InvalidCycleValue(String);

impl FromStr for CycleValue {
    type Err = InvalidCycleValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == ALL_CYCLES {
            Ok(CycleValue::All)
        } else {
            s.parse()
                .map(CycleValue::Cycle)
                .map_err(|_| InvalidCycleValue(s.to_owned()))
        }
    }
}

impl Display for CycleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleValue::All => f.write_str(ALL_CYCLES),
            CycleValue::Cycle(cycle) => write!(f, "{cycle}"),
        }
    }
}

/// On-disk form of [CycleValue]: either a number or a string.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CycleValueRepr {
    Number(Count),
    Text(String),
}

impl TryFrom<CycleValueRepr> for CycleValue {
    type Error = InvalidCycleValue;

    fn try_from(value: CycleValueRepr) -> Result<Self, Self::Error> {
        match value {
            CycleValueRepr::Number(cycle) => Ok(CycleValue::Cycle(cycle)),
            CycleValueRepr::Text(text) => text.parse(),
        }
    }
}

impl From<CycleValue> for CycleValueRepr {
    fn from(value: CycleValue) -> Self {
        match value {
            CycleValue::All => CycleValueRepr::Text(ALL_CYCLES.to_owned()),
            CycleValue::Cycle(cycle) => CycleValueRepr::Number(cycle),
        }
    }
}

/// How an offset is applied to its column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetMode {
    /// The column is replaced by the offset values.
    #[default]
    Replace,
    /// The offset values are added as a new column named `<column>_offset`.
    NewColumn,
}

/// What happens when a stage refers to a column the dataset does not have.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingColumnPolicy {
    /// The run fails with [PipelineError::MissingColumn](crate::PipelineError::MissingColumn).
    #[default]
    Fail,
    /// The error is logged and the stage is skipped, leaving the dataset unchanged.
    Skip,
}

/// Selection of filters and modifications for one pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub remove_pause: bool,

    pub select_cycle: bool,
    pub cycle_value: CycleValue,
    pub cycle_column: CycleColumn,

    #[serde(alias = "select_charge_half_cycle")]
    pub select_charge: bool,
    #[serde(alias = "select_discharge_half_cycle")]
    pub select_discharge: bool,

    pub apply_step_change: bool,
    pub step_change_column: String,

    pub apply_range_filter: bool,
    pub range_column: String,
    pub range_min: Real,
    pub range_max: Real,

    pub compute_abs_cycle: bool,
    pub compute_du_dq: bool,
    pub normalize_voltage: bool,

    pub apply_offset: bool,
    pub offset_column: String,
    pub offset_value: Real,
    pub offset_mode: OffsetMode,

    pub missing_column: MissingColumnPolicy,
}

impl FilterConfig {
    /// The cycle to keep, if cycle selection is enabled and not set to [CycleValue::All].
    pub fn selected_cycle(&self) -> Option<Count> {
        match (self.select_cycle, self.cycle_value) {
            (true, CycleValue::Cycle(cycle)) => Some(cycle),
            _ => None,
        }
    }

    pub fn range(&self) -> Interval<Real> {
        Interval {
            min: self.range_min,
            max: self.range_max,
        }
    }

    /// The capacity column matching the selected half cycle.
    ///
    /// Discharge capacity is used only when discharge alone is selected.
    pub fn capacity_column(&self) -> &'static str {
        if self.select_discharge && !self.select_charge {
            columns::DISCHARGE_CAPACITY
        } else {
            columns::CHARGE_CAPACITY
        }
    }
}
