//! Defines the parameters of each subcommand.
use clap::{Args, Parser, Subcommand};
use h2f_common::Real;
use h2f_pipeline::{KeyValueSelection, MetadataHeader, PlotAxes, loader::DEFAULT_HEADER_LINES};
use std::path::PathBuf;

/// Determines how the metadata block at the top of each input file is skipped.
#[derive(Clone, Debug, Args)]
pub(crate) struct HeaderOpts {
    /// Number of metadata lines preceding the column header.
    #[clap(long, default_value_t = DEFAULT_HEADER_LINES, conflicts_with = "tilde_header")]
    pub(crate) header_lines: usize,

    /// Skip every leading line beginning with '~' instead of a fixed number of lines.
    #[clap(long)]
    pub(crate) tilde_header: bool,
}

impl HeaderOpts {
    pub(crate) fn metadata_header(&self) -> MetadataHeader {
        if self.tilde_header {
            MetadataHeader::TildePrefixed
        } else {
            MetadataHeader::Fixed(self.header_lines)
        }
    }
}

/// Encapsulates the parameters of the filter subcommand.
#[derive(Debug, Clone, Parser)]
pub(crate) struct FilterParameters {
    /// Cycler export to filter.
    #[clap(long)]
    pub(crate) input: PathBuf,

    /// JSON file holding the filter configuration. If omitted, nothing is filtered.
    #[clap(long)]
    pub(crate) config: Option<PathBuf>,

    /// Path of the CSV file to write. Defaults to a name describing the filters, in the current directory.
    #[clap(long)]
    pub(crate) output: Option<PathBuf>,

    /// If set, a linear spline fit over these axes is written instead of the filtered rows.
    #[clap(long)]
    pub(crate) fit: Option<PlotAxes>,

    /// Spacing of the fitted points. If omitted or not positive, 500 evenly spaced points are used.
    #[clap(long, requires = "fit")]
    pub(crate) step_size: Option<Real>,
}

/// Encapsulates the parameters of the key-values subcommand.
#[derive(Debug, Clone, Parser)]
pub(crate) struct KeyValueParameters {
    /// Cycler export to summarise.
    #[clap(long)]
    pub(crate) input: PathBuf,

    /// JSON file holding the filter configuration applied before summarising.
    #[clap(long)]
    pub(crate) config: Option<PathBuf>,

    /// Extract the maximum voltage of each cycle.
    #[clap(long)]
    pub(crate) max_voltage: bool,

    /// Extract the maximum charge capacity of each cycle.
    #[clap(long)]
    pub(crate) max_charge: bool,

    /// Extract the maximum discharge capacity of each cycle.
    #[clap(long)]
    pub(crate) max_discharge: bool,
}

impl KeyValueParameters {
    pub(crate) fn selection(&self) -> KeyValueSelection {
        KeyValueSelection {
            max_voltage: self.max_voltage,
            max_charge: self.max_charge,
            max_discharge: self.max_discharge,
        }
    }
}

/// Encapsulates the parameters of the spline subcommand.
#[derive(Debug, Clone, Parser)]
pub(crate) struct SplineParameters {
    /// Cycler export holding the points to fit.
    #[clap(long)]
    pub(crate) input: PathBuf,

    /// JSON file holding the filter configuration applied before fitting.
    #[clap(long)]
    pub(crate) config: Option<PathBuf>,

    /// Column of strictly increasing x-values.
    #[clap(long)]
    pub(crate) x_column: String,

    /// Column of y-values.
    #[clap(long)]
    pub(crate) y_column: String,

    /// Spacing of the resampled points. If omitted or not positive, 500 evenly spaced points are used.
    #[clap(long)]
    pub(crate) step_size: Option<Real>,

    /// Path of the CSV file to write. If omitted the fit is printed as JSON.
    #[clap(long)]
    pub(crate) output: Option<PathBuf>,
}

/// Encapsulates the parameters of the full-cell subcommand.
#[derive(Debug, Clone, Parser)]
pub(crate) struct FullCellParameters {
    /// Anode half cell export.
    #[clap(long)]
    pub(crate) anode: PathBuf,

    /// JSON filter configuration applied to the anode.
    #[clap(long)]
    pub(crate) anode_config: Option<PathBuf>,

    /// Cathode half cell export.
    #[clap(long)]
    pub(crate) cathode: PathBuf,

    /// JSON filter configuration applied to the cathode.
    #[clap(long)]
    pub(crate) cathode_config: Option<PathBuf>,

    /// Path of the CSV file to write. Defaults to the full cell's name, in the current directory.
    #[clap(long)]
    pub(crate) output: Option<PathBuf>,
}

/// Specifies the operation to perform, and wraps the operation-specific options in each variant.
#[derive(Subcommand, Debug)]
pub(crate) enum Mode {
    /// Applies filters and modifications to an export and writes the result as CSV.
    Filter(FilterParameters),
    /// Prints the maximum voltage and capacities of each cycle.
    KeyValues(KeyValueParameters),
    /// Fits a linear spline through two columns and resamples it.
    Spline(SplineParameters),
    /// Combines an anode discharge and a cathode charge into a full cell voltage curve.
    FullCell(FullCellParameters),
}
