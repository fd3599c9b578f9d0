//! Resampled fit data, stored or exported in place of the filtered rows.
use crate::{
    config::FilterConfig,
    dataset::{Column, Dataset, DatasetError},
    plot::PlotAxes,
    spline::{SplineError, compute_linear_spline},
};
use h2f_common::{Count, Real, columns};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error, PartialEq)]
pub enum FitDataError {
    #[error("Select either the charge or the discharge half cycle to fit capacity against voltage")]
    HalfCycleRequired,
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("{0}")]
    Spline(#[from] SplineError),
}

/// The curve to fit, and how densely to resample it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FitSettings {
    pub axes: PlotAxes,
    pub step_size: Option<Real>,
}

impl FitSettings {
    /// The step size, if it is positive.
    pub fn step_size(&self) -> Option<Real> {
        self.step_size.filter(|&step| step > 0.0)
    }

    /// The x and y columns to fit.
    ///
    /// For capacity against voltage the charge column is used when charge is selected, and the
    /// discharge column when only discharge is selected.
    pub fn columns(
        &self,
        config: &FilterConfig,
    ) -> Result<(&'static str, &'static str), FitDataError> {
        match self.axes {
            PlotAxes::CapacityVoltage if config.select_charge => {
                Ok((columns::CHARGE_CAPACITY, columns::VOLTAGE))
            }
            PlotAxes::CapacityVoltage if config.select_discharge => {
                Ok((columns::DISCHARGE_CAPACITY, columns::VOLTAGE))
            }
            PlotAxes::CapacityVoltage => Err(FitDataError::HalfCycleRequired),
            axes => Ok(axes.columns(config)),
        }
    }
}

/// Fits a linear spline through the chosen columns of `dataset` and returns the resampled curve,
/// with a `row` column numbering the points.
///
/// The x column must be strictly increasing.
#[instrument(skip_all, fields(axes = %settings.axes, rows = dataset.num_rows()), err(level = "warn"))]
pub fn generate_fit_data(
    dataset: &Dataset,
    config: &FilterConfig,
    settings: &FitSettings,
) -> Result<Dataset, FitDataError> {
    let (x_column, y_column) = settings.columns(config)?;
    let fit = compute_linear_spline(
        &dataset.reals(x_column)?,
        &dataset.reals(y_column)?,
        settings.step_size(),
    )?;
    let rows = (0..fit.x.len() as Count).collect();
    Ok(Dataset::from_columns([
        (x_column, Column::Float(fit.x)),
        (y_column, Column::Float(fit.y)),
        (columns::FIT_ROW, Column::Int(rows)),
    ])?)
}
