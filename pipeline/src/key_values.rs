//! Summary statistics of a filtered dataset, per cycle, and the points used to annotate charts.
use crate::{
    config::FilterConfig,
    dataset::{Dataset, DatasetError, GroupKey},
    plot::PlotAxes,
};
use h2f_common::{Real, columns};
use itertools::Itertools;
use std::fmt::{Display, Formatter};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error, PartialEq)]
pub enum KeyValueError {
    #[error("Cannot group by cycle: {0}")]
    Grouping(#[from] DatasetError),
}

/// Which statistics to extract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyValueSelection {
    pub max_voltage: bool,
    pub max_charge: bool,
    pub max_discharge: bool,
}

impl KeyValueSelection {
    /// Headers and source columns of the selected statistics, in table order.
    fn requested(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        [
            (self.max_voltage, "Max Voltage (V)", columns::VOLTAGE),
            (self.max_charge, "Max Charge (Ah)", columns::CHARGE_CAPACITY),
            (
                self.max_discharge,
                "Max Discharge (Ah)",
                columns::DISCHARGE_CAPACITY,
            ),
        ]
        .into_iter()
        .filter_map(|(selected, header, column)| selected.then_some((header, column)))
    }
}

/// A cell of the key value table, displayed with [smart_round].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeyValue {
    Value(Real),
    /// The source column is absent from the dataset.
    NotAvailable,
}

impl Display for KeyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyValue::Value(value) => f.write_str(&smart_round(*value)),
            KeyValue::NotAvailable => f.write_str("N/A"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyValueRow {
    /// The cycle, or [None] if the dataset has no cycle counter.
    pub cycle: Option<GroupKey>,
    pub values: Vec<KeyValue>,
}

/// One row per cycle, with a column per selected statistic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyValueTable {
    pub headers: Vec<&'static str>,
    pub rows: Vec<KeyValueRow>,
}

impl KeyValueTable {
    fn cells(&self) -> Vec<Vec<String>> {
        let header: Vec<String> = std::iter::once("Cycle")
            .chain(self.headers.iter().copied())
            .map(str::to_owned)
            .collect();
        std::iter::once(header)
            .chain(self.rows.iter().map(|row| {
                std::iter::once(row.cycle.as_ref().map(ToString::to_string).unwrap_or_default())
                    .chain(row.values.iter().map(ToString::to_string))
                    .collect::<Vec<_>>()
            }))
            .collect()
    }
}

impl Display for KeyValueTable {
    /// Right aligned, space separated columns.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let cells = self.cells();
        let widths = (0..=self.headers.len())
            .map(|column| {
                cells
                    .iter()
                    .filter_map(|row| row.get(column).map(String::len))
                    .max()
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();
        for row in cells {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:>width$}"))
                .join(" ");
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Largest non-`NaN` value, or `NaN` if there is none.
fn max_of(values: &[Real]) -> Real {
    values.iter().copied().fold(Real::NAN, Real::max)
}

/// Computes the selected statistics for each cycle of `dataset`.
///
/// Rows are grouped by `Cyc-Count` if present, otherwise the whole dataset forms a single group.
/// A float counter is grouped by its whole-number values, and rows without a cycle number are
/// left out.
/// Returns [None] if the dataset has no rows.
#[instrument(skip_all, level = "debug", fields(rows = dataset.num_rows()), err(level = "warn"))]
pub fn compute_key_values(
    dataset: &Dataset,
    selection: &KeyValueSelection,
) -> Result<Option<KeyValueTable>, KeyValueError> {
    if dataset.is_empty() {
        return Ok(None);
    }
    let groups = if dataset.has_column(columns::CYCLE_COUNT) {
        dataset
            .group_by(columns::CYCLE_COUNT)?
            .into_iter()
            .map(|(key, group)| (Some(key), group))
            .collect()
    } else {
        vec![(None, dataset.clone())]
    };
    let rows = groups
        .into_iter()
        .map(|(cycle, group)| {
            let values = selection
                .requested()
                .map(|(_, column)| match group.reals(column) {
                    Ok(values) => KeyValue::Value(max_of(&values)),
                    Err(e) => {
                        debug!("{e}");
                        KeyValue::NotAvailable
                    }
                })
                .collect();
            KeyValueRow { cycle, values }
        })
        .collect();
    Ok(Some(KeyValueTable {
        headers: selection.requested().map(|(header, _)| header).collect(),
        rows,
    }))
}

/// Values from this magnitude upwards are written in scientific notation.
const LARGE_MAGNITUDE: Real = 1e16;

/// Rewrites the exponent of `formatted` as signed with at least two digits, e.g. `1e16` as `1e+16`.
fn signed_exponent(formatted: String) -> String {
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent = exponent.parse::<i32>().unwrap_or_default();
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.abs())
        }
        None => formatted,
    }
}

/// Formats a value to two decimal places, or in scientific notation if it is below `0.01`.
///
/// Ties are rounded to even, so `0.125` becomes `0.12`. The exponent is signed and has at least
/// two digits, e.g. `4.52e-03`, and magnitudes of `1e16` and above are written as `1e+16`.
/// Non-finite values are written as `nan`, `inf` or `-inf`.
pub fn smart_round(value: Real) -> String {
    if value.is_nan() {
        "nan".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_owned()
    } else if value.abs() >= 0.01 {
        let rounded = (value * 100.0).round_ties_even() / 100.0;
        if rounded.abs() >= LARGE_MAGNITUDE {
            signed_exponent(format!("{rounded:e}"))
        } else {
            format!("{rounded:?}")
        }
    } else {
        signed_exponent(format!("{value:.2e}"))
    }
}

/// A point of interest on a chart.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyPoint {
    pub x: Real,
    pub y: Real,
    pub label: String,
}

/// Finds the maximum of `value_column` and the value of `other_column` in the same row.
///
/// If the maximum occurs more than once, the first occurrence is used.
fn locate_max(
    dataset: &Dataset,
    value_column: &str,
    other_column: &str,
) -> Result<Option<(Real, Real)>, DatasetError> {
    let values = dataset.reals(value_column)?;
    let others = dataset.reals(other_column)?;
    let max = max_of(&values);
    Ok(values
        .iter()
        .position(|&v| v == max)
        .and_then(|index| others.get(index))
        .map(|&other| (max, other)))
}

/// Locates the maxima to annotate on a chart of `dataset` with the given axes.
///
/// Points whose columns are missing are left out.
pub fn locate_key_points(
    dataset: &Dataset,
    config: &FilterConfig,
    selection: &KeyValueSelection,
    axes: PlotAxes,
) -> Vec<KeyPoint> {
    let mut points = Vec::new();
    let mut add = |value_column, other_column, value_is_x: bool, label: &str, unit: &str| {
        match locate_max(dataset, value_column, other_column) {
            Ok(Some((value, other))) => {
                let (x, y) = if value_is_x { (value, other) } else { (other, value) };
                points.push(KeyPoint {
                    x,
                    y,
                    label: format!("{label}: {} {unit}", smart_round(value)),
                });
            }
            Ok(None) => {}
            Err(e) => debug!("Key point '{label}' left out: {e}"),
        }
    };
    match axes {
        PlotAxes::VoltageTime if selection.max_voltage => {
            add(columns::VOLTAGE, columns::TIME, false, "Max Voltage", "V");
        }
        PlotAxes::CurrentTime if selection.max_charge => {
            add(columns::CURRENT, columns::TIME, false, "Max Current", "A");
        }
        PlotAxes::CapacityVoltage => {
            if selection.max_charge && !config.select_discharge {
                add(
                    columns::CHARGE_CAPACITY,
                    columns::VOLTAGE,
                    true,
                    "Max Charge",
                    "Ah",
                );
            }
            if selection.max_discharge && !config.select_charge {
                add(
                    columns::DISCHARGE_CAPACITY,
                    columns::VOLTAGE,
                    true,
                    "Max Discharge",
                    "Ah",
                );
            }
        }
        _ => {}
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, tests::sample_dataset};

    const ALL: KeyValueSelection = KeyValueSelection {
        max_voltage: true,
        max_charge: true,
        max_discharge: true,
    };

    #[test]
    fn smart_round_large_values() {
        assert_eq!(smart_round(1.23456), "1.23");
        assert_eq!(smart_round(4.0), "4.0");
        assert_eq!(smart_round(0.01), "0.01");
        assert_eq!(smart_round(-2.346), "-2.35");
    }

    #[test]
    fn smart_round_ties_to_even() {
        assert_eq!(smart_round(0.125), "0.12");
        assert_eq!(smart_round(4.125), "4.12");
        assert_eq!(smart_round(0.375), "0.38");
        assert_eq!(smart_round(-0.125), "-0.12");
    }

    #[test]
    fn smart_round_extreme_values() {
        assert_eq!(smart_round(1e16), "1e+16");
        assert_eq!(smart_round(2.5e17), "2.5e+17");
        assert_eq!(smart_round(1e15), "1000000000000000.0");
        assert_eq!(smart_round(Real::NAN), "nan");
        assert_eq!(smart_round(Real::NEG_INFINITY), "-inf");
    }

    #[test]
    fn smart_round_small_values() {
        assert_eq!(smart_round(0.004523), "4.52e-03");
        assert_eq!(smart_round(0.0), "0.00e+00");
        assert_eq!(smart_round(1.5e-12), "1.50e-12");
    }

    #[test]
    fn per_cycle_maxima() {
        let dataset = sample_dataset()
            .with_column(
                "Ah-Cyc-Charge-0",
                Column::Float(vec![0.0, 0.2, 0.4, 0.0, 0.0, 0.0]),
            )
            .unwrap();
        let table = compute_key_values(&dataset, &ALL).unwrap().unwrap();
        assert_eq!(
            table.headers,
            ["Max Voltage (V)", "Max Charge (Ah)", "Max Discharge (Ah)"]
        );
        assert_eq!(
            table.rows,
            vec![
                KeyValueRow {
                    cycle: Some(GroupKey::Int(1)),
                    values: vec![
                        KeyValue::Value(4.0),
                        KeyValue::Value(0.4),
                        KeyValue::NotAvailable
                    ],
                },
                KeyValueRow {
                    cycle: Some(GroupKey::Int(2)),
                    values: vec![
                        KeyValue::Value(3.9),
                        KeyValue::Value(0.0),
                        KeyValue::NotAvailable
                    ],
                },
            ]
        );
    }

    #[test]
    fn float_cycle_counter_is_grouped() {
        let dataset = sample_dataset()
            .with_column(
                "Cyc-Count",
                Column::Float(vec![1.0, 1.0, 1.0, 2.0, 2.0, Real::NAN]),
            )
            .unwrap();
        let selection = KeyValueSelection {
            max_voltage: true,
            ..Default::default()
        };
        let table = compute_key_values(&dataset, &selection).unwrap().unwrap();
        assert_eq!(
            table.rows,
            vec![
                KeyValueRow {
                    cycle: Some(GroupKey::Int(1)),
                    values: vec![KeyValue::Value(4.0)],
                },
                KeyValueRow {
                    cycle: Some(GroupKey::Int(2)),
                    values: vec![KeyValue::Value(3.9)],
                },
            ]
        );
    }

    #[test]
    fn single_group_without_cycle_count() {
        let dataset =
            Dataset::from_columns([("U[V]", Column::Float(vec![3.0, 4.1, Real::NAN]))]).unwrap();
        let selection = KeyValueSelection {
            max_voltage: true,
            ..Default::default()
        };
        let table = compute_key_values(&dataset, &selection).unwrap().unwrap();
        assert_eq!(
            table.rows,
            vec![KeyValueRow {
                cycle: None,
                values: vec![KeyValue::Value(4.1)]
            }]
        );
    }

    #[test]
    fn empty_dataset_has_no_table() {
        let empty = sample_dataset().filter_rows(&[false; 6]).unwrap();
        assert_eq!(compute_key_values(&empty, &ALL), Ok(None));
    }

    #[test]
    fn table_display() {
        let table = KeyValueTable {
            headers: vec!["Max Voltage (V)", "Max Charge (Ah)"],
            rows: vec![
                KeyValueRow {
                    cycle: Some(GroupKey::Int(1)),
                    values: vec![KeyValue::Value(4.2), KeyValue::NotAvailable],
                },
                KeyValueRow {
                    cycle: Some(GroupKey::Int(12)),
                    values: vec![KeyValue::Value(3.95), KeyValue::NotAvailable],
                },
            ],
        };
        assert_eq!(
            table.to_string(),
            "Cycle Max Voltage (V) Max Charge (Ah)\n\
             \x20   1             4.2             N/A\n\
             \x20  12            3.95             N/A\n"
        );
    }

    #[test]
    fn max_voltage_point() {
        let points = locate_key_points(
            &sample_dataset(),
            &FilterConfig::default(),
            &ALL,
            PlotAxes::VoltageTime,
        );
        assert_eq!(
            points,
            vec![KeyPoint {
                x: 0.2,
                y: 4.0,
                label: "Max Voltage: 4.0 V".to_owned()
            }]
        );
    }

    #[test]
    fn capacity_points_follow_half_cycle() {
        let dataset = Dataset::from_columns([
            ("U[V]", Column::Float(vec![3.0, 3.6, 3.4, 3.1])),
            ("Ah-Cyc-Charge-0", Column::Float(vec![0.1, 0.5, 0.0, 0.0])),
            ("Ah-Cyc-Discharge-0", Column::Float(vec![0.0, 0.0, 0.2, 0.004523])),
        ])
        .unwrap();
        let both = locate_key_points(
            &dataset,
            &FilterConfig::default(),
            &ALL,
            PlotAxes::CapacityVoltage,
        );
        assert_eq!(
            both,
            vec![
                KeyPoint {
                    x: 0.5,
                    y: 3.6,
                    label: "Max Charge: 0.5 Ah".to_owned()
                },
                KeyPoint {
                    x: 0.2,
                    y: 3.4,
                    label: "Max Discharge: 0.2 Ah".to_owned()
                },
            ]
        );
        let config = FilterConfig {
            select_charge: true,
            ..Default::default()
        };
        let charge_only = locate_key_points(&dataset, &config, &ALL, PlotAxes::CapacityVoltage);
        assert_eq!(charge_only.len(), 1);
        assert_eq!(charge_only[0].label, "Max Charge: 0.5 Ah");
    }

    #[test]
    fn missing_current_is_left_out() {
        let points = locate_key_points(
            &sample_dataset(),
            &FilterConfig::default(),
            &ALL,
            PlotAxes::CurrentTime,
        );
        assert!(points.is_empty());
    }
}
