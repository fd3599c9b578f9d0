//! Filtering, resampling and full cell synthesis of battery cycler data.
//!
//! A cycler export is loaded into a [Dataset] and passed through a [Pipeline] assembled from a
//! [FilterConfig]. The result can be summarised with [compute_key_values], resampled with
//! [compute_linear_spline] or, given an anode and a cathode, combined into a full cell curve with
//! [calculate_full_cell_voltage].
pub mod config;
pub mod cycles;
pub mod dataset;
pub mod fit;
pub mod full_cell;
pub mod key_values;
pub mod loader;
pub mod naming;
mod pipeline;
pub mod plot;
pub mod registry;
pub mod spline;
pub mod stages;
pub mod step_change;

pub use config::{FilterConfig, MissingColumnPolicy};
pub use dataset::{Column, Dataset, DatasetError};
pub use fit::{FitDataError, FitSettings, generate_fit_data};
pub use full_cell::{FullCellError, calculate_full_cell_voltage};
pub use key_values::{KeyValueSelection, compute_key_values, locate_key_points};
pub use loader::{LoadError, MetadataHeader};
pub use pipeline::{Pipeline, PipelineError, apply_filters};
pub use plot::{PlotAxes, plot_series};
pub use registry::{DatasetKind, DatasetRegistry, NamedDataset};
pub use spline::{Fit, SplineError, compute_linear_spline};
