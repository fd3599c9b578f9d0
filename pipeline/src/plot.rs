//! Data series to be charted for a filtered dataset. Rendering is left to the caller.
use crate::{
    config::{CycleColumn, FilterConfig},
    dataset::{Dataset, DatasetError},
    spline::{Fit, SplineError, compute_linear_spline},
};
use h2f_common::{Real, columns};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{instrument, warn};

/// The pair of quantities plotted against each other.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum PlotAxes {
    /// Voltage against time.
    #[default]
    #[strum(serialize = "U-t")]
    #[serde(rename = "U-t")]
    VoltageTime,
    /// Current against time.
    #[strum(serialize = "I-t")]
    #[serde(rename = "I-t")]
    CurrentTime,
    /// Voltage against capacity.
    #[strum(serialize = "Q-U")]
    #[serde(rename = "Q-U")]
    CapacityVoltage,
}

impl PlotAxes {
    /// The x and y columns to chart.
    ///
    /// Capacity is read from the discharge column when discharge is selected, otherwise from the
    /// charge column.
    pub fn columns(&self, config: &FilterConfig) -> (&'static str, &'static str) {
        match self {
            PlotAxes::VoltageTime => (columns::TIME, columns::VOLTAGE),
            PlotAxes::CurrentTime => (columns::TIME, columns::CURRENT),
            PlotAxes::CapacityVoltage if config.select_discharge => {
                (columns::DISCHARGE_CAPACITY, columns::VOLTAGE)
            }
            PlotAxes::CapacityVoltage => (columns::CHARGE_CAPACITY, columns::VOLTAGE),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PlotError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("Spline error: {0}")]
    Spline(#[from] SplineError),
}

/// A labelled sequence of points.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub x: Vec<Real>,
    pub y: Vec<Real>,
}

/// How the series of a plot are produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlotOptions {
    pub axes: PlotAxes,
    /// If set, one series is produced per value of this column.
    pub split_cycles: Option<CycleColumn>,
    /// If set, a linear spline through all points is added, with this optional step size.
    pub spline: Option<Option<Real>>,
}

/// Everything needed to draw a plot of one dataset.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Plot {
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub series: Vec<Series>,
    /// The spline overlay. A failed fit is logged and leaves this empty.
    pub spline: Option<Series>,
}

fn axis_label(column: &str) -> &'static str {
    match column {
        columns::TIME => "Time (h)",
        columns::VOLTAGE => "Voltage (V)",
        columns::CURRENT => "Current (A)",
        _ => "Charge (Ah)",
    }
}

/// Extracts the series to chart for `dataset`, filtered according to `config`.
#[instrument(skip_all, level = "debug", fields(axes = %options.axes, rows = dataset.num_rows()), err(level = "warn"))]
pub fn plot_series(
    dataset: &Dataset,
    config: &FilterConfig,
    options: &PlotOptions,
) -> Result<Plot, PlotError> {
    let (x_column, y_column) = options.axes.columns(config);
    let x = dataset.reals(x_column)?;
    let y = dataset.reals(y_column)?;

    let series = match options.split_cycles {
        Some(cycle_column) => dataset
            .group_by(cycle_column.name())?
            .into_iter()
            .map(|(cycle, group)| {
                Ok(Series {
                    label: format!("Cycle {cycle}"),
                    x: group.reals(x_column)?,
                    y: group.reals(y_column)?,
                })
            })
            .collect::<Result<Vec<_>, DatasetError>>()?,
        None => vec![Series {
            label: "Filtered Data".to_owned(),
            x: x.clone(),
            y: y.clone(),
        }],
    };

    let spline = match options.spline {
        Some(step_size) => match compute_linear_spline(&x, &y, step_size) {
            Ok(Fit { x, y }) => Some(Series {
                label: "Linear Spline Fit".to_owned(),
                x,
                y,
            }),
            Err(e) => {
                warn!("Failed to compute linear spline: {e}");
                None
            }
        },
        None => None,
    };

    Ok(Plot {
        x_label: axis_label(x_column),
        y_label: axis_label(y_column),
        series,
        spline,
    })
}
