//! # Half to Full Cell
//!
//! Command line front end of the half cell processing pipeline:
//! * Loads cycler exports, applies the filters and modifications given in a JSON configuration, and
//!   writes the result, or a resampled fit of it, as CSV.
//! * Prints per-cycle key values of a filtered export.
//! * Fits and resamples a linear spline through any two columns.
//! * Synthesises a full cell voltage curve from an anode and a cathode export.
//!
mod parameters;

use clap::Parser;
use h2f_common::{LoggingOpts, init_tracing};
use h2f_pipeline::{
    Column, Dataset, DatasetKind, DatasetRegistry, FilterConfig, FitSettings, NamedDataset,
    apply_filters, calculate_full_cell_voltage, compute_key_values, compute_linear_spline,
    generate_fit_data, loader, naming,
};
use miette::IntoDiagnostic;
use parameters::{
    FilterParameters, FullCellParameters, HeaderOpts, KeyValueParameters, Mode, SplineParameters,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// [clap] derived struct to handle command line parameters.
#[derive(Debug, Parser)]
#[clap(author, version = h2f_common::version!(), about)]
struct Cli {
    #[clap(flatten)]
    logging: LoggingOpts,

    #[clap(flatten)]
    header: HeaderOpts,

    #[command(subcommand)]
    pub(crate) mode: Mode,
}

fn main() -> miette::Result<()> {
    let args = Cli::parse();
    init_tracing(&args.logging).into_diagnostic()?;
    debug!("{args:?}");

    match &args.mode {
        Mode::Filter(parameters) => filter(&args.header, parameters),
        Mode::KeyValues(parameters) => key_values(&args.header, parameters),
        Mode::Spline(parameters) => spline(&args.header, parameters),
        Mode::FullCell(parameters) => full_cell(&args.header, parameters),
    }
}

/// Reads a filter configuration, or returns the default configuration which applies no stage.
fn read_config(path: Option<&Path>) -> miette::Result<FilterConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).into_diagnostic()?;
            let config: FilterConfig = serde_json::from_str(&text).into_diagnostic()?;
            debug!("Using filter configuration {config:?}");
            Ok(config)
        }
        None => Ok(FilterConfig::default()),
    }
}

/// Loads an export and applies the filter configuration to it.
fn load_filtered(
    header: &HeaderOpts,
    input: &Path,
    config: &FilterConfig,
) -> miette::Result<Dataset> {
    let raw = loader::load(input, header.metadata_header()).into_diagnostic()?;
    apply_filters(&raw, config).into_diagnostic()
}

fn default_output(name: &str) -> PathBuf {
    PathBuf::from(format!("{name}.csv"))
}

#[instrument(skip_all, fields(input = %parameters.input.display()))]
fn filter(header: &HeaderOpts, parameters: &FilterParameters) -> miette::Result<()> {
    let config = read_config(parameters.config.as_deref())?;
    let filtered = load_filtered(header, &parameters.input, &config)?;

    let fit = parameters.fit.map(|axes| FitSettings {
        axes,
        step_size: parameters.step_size,
    });
    let output = match &fit {
        Some(settings) => generate_fit_data(&filtered, &config, settings).into_diagnostic()?,
        None => filtered,
    };

    let path = parameters.output.clone().unwrap_or_else(|| {
        default_output(&naming::dataset_name(
            &parameters.input,
            &config,
            fit.as_ref(),
        ))
    });
    loader::save(&output, &path).into_diagnostic()?;
    info!("Wrote {} rows to {}", output.num_rows(), path.display());
    Ok(())
}

#[instrument(skip_all, fields(input = %parameters.input.display()))]
fn key_values(header: &HeaderOpts, parameters: &KeyValueParameters) -> miette::Result<()> {
    let config = read_config(parameters.config.as_deref())?;
    let filtered = load_filtered(header, &parameters.input, &config)?;
    match compute_key_values(&filtered, &parameters.selection()).into_diagnostic()? {
        Some(table) => print!("{table}"),
        None => warn!("No rows to summarise"),
    }
    Ok(())
}

#[instrument(skip_all, fields(input = %parameters.input.display()))]
fn spline(header: &HeaderOpts, parameters: &SplineParameters) -> miette::Result<()> {
    let config = read_config(parameters.config.as_deref())?;
    let filtered = load_filtered(header, &parameters.input, &config)?;
    let x = filtered.reals(&parameters.x_column).into_diagnostic()?;
    let y = filtered.reals(&parameters.y_column).into_diagnostic()?;
    let fit = compute_linear_spline(&x, &y, parameters.step_size).into_diagnostic()?;
    info!("Resampled {} points onto {} points", x.len(), fit.x.len());

    match &parameters.output {
        Some(path) => {
            let dataset = Dataset::from_columns([
                (parameters.x_column.as_str(), Column::Float(fit.x)),
                (parameters.y_column.as_str(), Column::Float(fit.y)),
            ])
            .into_diagnostic()?;
            loader::save(&dataset, path).into_diagnostic()?;
        }
        None => println!("{}", serde_json::to_string(&fit).into_diagnostic()?),
    }
    Ok(())
}

/// Loads and filters one electrode's export into the registry, returning its name.
fn store_electrode(
    registry: &mut DatasetRegistry,
    kind: DatasetKind,
    header: &HeaderOpts,
    input: &Path,
    config: Option<&Path>,
) -> miette::Result<String> {
    let config = read_config(config)?;
    let data = load_filtered(header, input, &config)?;
    let name = naming::dataset_name(input, &config, None);
    info!("Filtered {kind} '{name}' has {} rows", data.num_rows());
    registry.store(
        kind,
        NamedDataset {
            name: name.clone(),
            data,
        },
    );
    Ok(name)
}

#[instrument(skip_all, fields(anode = %parameters.anode.display(), cathode = %parameters.cathode.display()))]
fn full_cell(header: &HeaderOpts, parameters: &FullCellParameters) -> miette::Result<()> {
    let mut registry = DatasetRegistry::default();
    let anode = store_electrode(
        &mut registry,
        DatasetKind::Anode,
        header,
        &parameters.anode,
        parameters.anode_config.as_deref(),
    )?;
    let cathode = store_electrode(
        &mut registry,
        DatasetKind::Cathode,
        header,
        &parameters.cathode,
        parameters.cathode_config.as_deref(),
    )?;

    let full_cell = calculate_full_cell_voltage(
        registry
            .single_selected(DatasetKind::Anode, &[anode.as_str()])
            .into_diagnostic()?,
        registry
            .single_selected(DatasetKind::Cathode, &[cathode.as_str()])
            .into_diagnostic()?,
    )
    .into_diagnostic()?;

    let path = parameters
        .output
        .clone()
        .unwrap_or_else(|| default_output(&full_cell.name));
    loader::save(&full_cell.data, &path).into_diagnostic()?;
    info!("Wrote {} to {}", full_cell.name, path.display());
    Ok(())
}
