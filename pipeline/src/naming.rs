//! Descriptive names for filtered datasets, recording which filters and modifications produced them.
//!
//! A name has the form `<stem>_<filters>_<modifications><datatype>`, for instance
//! `cell3_nopause-cycle2-charge_U_norm` or `cell3_charge_nomod_FitData_linSpline_step_0.05`.
use crate::{
    config::{CycleValue, FilterConfig},
    fit::FitSettings,
};
use h2f_common::Real;
use std::path::Path;

/// Formats a number so that whole numbers keep their decimal point, e.g. `4.0`.
fn format_number(value: Real) -> String {
    format!("{value:?}")
}

/// Joins the enabled filters with `-`, or returns `nofilter`.
pub fn filter_suffix(config: &FilterConfig) -> String {
    let mut parts = Vec::new();
    if config.remove_pause {
        parts.push("nopause".to_owned());
    }
    if config.select_cycle {
        parts.push(match config.cycle_value {
            CycleValue::Cycle(cycle) => format!("cycle{cycle}"),
            CycleValue::All => "allcycles".to_owned(),
        });
    }
    if config.select_charge {
        parts.push("charge".to_owned());
    }
    if config.select_discharge {
        parts.push("discharge".to_owned());
    }
    if config.apply_step_change {
        parts.push("sc".to_owned());
    }
    if config.apply_range_filter {
        parts.push(format!(
            "{}_range_{}-{}",
            config.range_column,
            format_number(config.range_min),
            format_number(config.range_max)
        ));
    }
    if parts.is_empty() {
        "nofilter".to_owned()
    } else {
        parts.join("-")
    }
}

/// Joins the enabled modifications with `-`, or returns `nomod`.
pub fn modification_suffix(config: &FilterConfig) -> String {
    let mut parts = Vec::new();
    if config.compute_abs_cycle {
        parts.push("abs_cycle".to_owned());
    }
    if config.compute_du_dq {
        parts.push("du_dq".to_owned());
    }
    if config.normalize_voltage {
        parts.push("U_norm".to_owned());
    }
    if config.apply_offset {
        parts.push(format!("offset_{}", config.offset_column));
    }
    if parts.is_empty() {
        "nomod".to_owned()
    } else {
        parts.join("-")
    }
}

/// Empty for filtered data, otherwise describes the fit.
pub fn datatype_suffix(fit: Option<&FitSettings>) -> String {
    match fit {
        None => String::new(),
        Some(settings) => match settings.step_size() {
            Some(step) => format!("_FitData_linSpline_step_{}", format_number(step)),
            None => "_FitData_linSpline".to_owned(),
        },
    }
}

/// Name of a dataset derived from the file at `source`.
pub fn dataset_name(source: &Path, config: &FilterConfig, fit: Option<&FitSettings>) -> String {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    format!(
        "{stem}_{}_{}{}",
        filter_suffix(config),
        modification_suffix(config),
        datatype_suffix(fit)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::PlotAxes;

    #[test]
    fn unfiltered() {
        let name = dataset_name(
            Path::new("data/anode_01.txt"),
            &FilterConfig::default(),
            None,
        );
        assert_eq!(name, "anode_01_nofilter_nomod");
    }

    #[test]
    fn filters_in_order() {
        let config = FilterConfig {
            remove_pause: true,
            select_cycle: true,
            cycle_value: CycleValue::Cycle(2),
            select_charge: true,
            apply_step_change: true,
            apply_range_filter: true,
            range_column: "U[V]".to_owned(),
            range_min: 3.0,
            range_max: 4.25,
            ..Default::default()
        };
        assert_eq!(
            filter_suffix(&config),
            "nopause-cycle2-charge-sc-U[V]_range_3.0-4.25"
        );
        let all = FilterConfig {
            select_cycle: true,
            ..Default::default()
        };
        assert_eq!(filter_suffix(&all), "allcycles");
    }

    #[test]
    fn modifications() {
        let config = FilterConfig {
            normalize_voltage: true,
            apply_offset: true,
            offset_column: "Time[h]".to_owned(),
            compute_abs_cycle: true,
            ..Default::default()
        };
        assert_eq!(modification_suffix(&config), "abs_cycle-U_norm-offset_Time[h]");
    }

    #[test]
    fn fit_data() {
        let config = FilterConfig {
            select_discharge: true,
            ..Default::default()
        };
        let stepped = FitSettings {
            axes: PlotAxes::CapacityVoltage,
            step_size: Some(0.05),
        };
        assert_eq!(
            dataset_name(Path::new("cell.csv"), &config, Some(&stepped)),
            "cell_discharge_nomod_FitData_linSpline_step_0.05"
        );
        let unstepped = FitSettings {
            step_size: Some(0.0),
            ..stepped
        };
        assert_eq!(datatype_suffix(Some(&unstepped)), "_FitData_linSpline");
    }
}
