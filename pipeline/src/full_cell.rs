//! Synthesises a full cell voltage curve from an anode and a cathode half cell measurement.
//!
//! The anode's discharge curve and the cathode's charge curve are interpolated over the capacity
//! range they share, and the full cell voltage is the cathode voltage minus the anode voltage.
use crate::{
    dataset::{Column, Dataset, DatasetError},
    registry::NamedDataset,
    spline::{DEFAULT_NUM_POINTS, LinearSpline, SplineError, linspace},
};
use h2f_common::{Real, columns};
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error, PartialEq)]
pub enum FullCellError {
    #[error("The {electrode} dataset has no {half_cycle} rows")]
    MissingHalfCycleData {
        electrode: &'static str,
        half_cycle: &'static str,
    },
    #[error(
        "Capacity ranges do not overlap: common range would be {q_min} to {q_max} Ah"
    )]
    NoOverlappingDomain { q_min: Real, q_max: Real },
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("Spline error: {0}")]
    Spline(#[from] SplineError),
}

/// Interpolant of voltage over capacity, fitted to the rows whose command contains `half_cycle`.
fn half_cycle_curve(
    electrode: &'static str,
    dataset: &Dataset,
    half_cycle: &'static str,
    capacity_column: &str,
) -> Result<LinearSpline, FullCellError> {
    let mask = dataset
        .texts(columns::COMMAND)?
        .iter()
        .map(|command| command.contains(half_cycle))
        .collect::<Vec<_>>();
    let subset = dataset.filter_rows(&mask)?;
    if subset.is_empty() {
        return Err(FullCellError::MissingHalfCycleData {
            electrode,
            half_cycle,
        });
    }
    Ok(LinearSpline::from_unordered(
        subset.reals(capacity_column)?,
        subset.reals(columns::VOLTAGE)?,
    )?)
}

/// Name under which a synthesised full cell is stored.
pub fn full_cell_name(anode: &str, cathode: &str) -> String {
    format!("Full_Cell_{anode}_+_{cathode}")
}

/// Combines the anode's discharge and the cathode's charge into a full cell curve of
/// [DEFAULT_NUM_POINTS] rows, with columns `Q (Ah)` and `U_full_cell (V)`.
///
/// Rows need not be ordered by capacity, and the two datasets need not have the same length.
#[instrument(skip_all, fields(anode = %anode.name, cathode = %cathode.name), err(level = "warn"))]
pub fn calculate_full_cell_voltage(
    anode: &NamedDataset,
    cathode: &NamedDataset,
) -> Result<NamedDataset, FullCellError> {
    let anode_curve = half_cycle_curve(
        "anode",
        &anode.data,
        columns::command::DISCHARGE,
        columns::DISCHARGE_CAPACITY,
    )?;
    let cathode_curve = half_cycle_curve(
        "cathode",
        &cathode.data,
        columns::command::CHARGE,
        columns::CHARGE_CAPACITY,
    )?;

    let (anode_min, anode_max) = anode_curve.domain();
    let (cathode_min, cathode_max) = cathode_curve.domain();
    let q_min = anode_min.max(cathode_min);
    let q_max = anode_max.min(cathode_max);
    if q_min >= q_max {
        return Err(FullCellError::NoOverlappingDomain { q_min, q_max });
    }

    let common_q = linspace(q_min, q_max, DEFAULT_NUM_POINTS);
    let voltage = common_q
        .iter()
        .map(|&q| cathode_curve.evaluate(q) - anode_curve.evaluate(q))
        .collect();

    let name = full_cell_name(&anode.name, &cathode.name);
    info!("Synthesised {name} over {q_min} to {q_max} Ah");
    Ok(NamedDataset {
        name,
        data: Dataset::from_columns([
            (columns::FULL_CELL_CAPACITY, Column::Float(common_q)),
            (columns::FULL_CELL_VOLTAGE, Column::Float(voltage)),
        ])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn commands(command: &str, n: usize) -> Column {
        Column::Text(vec![command.to_owned(); n])
    }

    /// Anode discharge with `U = 0.5 - 0.3 Q` for `Q` in `[0, 1]`, and a trailing pause row.
    fn anode() -> NamedDataset {
        let capacity = vec![0.0, 0.25, 0.5, 0.75, 1.0, 0.0];
        let voltage = capacity.iter().map(|q| 0.5 - 0.3 * q).collect();
        let mut command = vec!["Discharge".to_owned(); 5];
        command.push("Pause".to_owned());
        NamedDataset {
            name: "graphite".to_owned(),
            data: Dataset::from_columns([
                ("Ah-Cyc-Discharge-0", Column::Float(capacity)),
                ("U[V]", Column::Float(voltage)),
                ("Command", Column::Text(command)),
            ])
            .unwrap(),
        }
    }

    /// Cathode charge with `U = 3.5 + 0.5 Q` for `Q` in `[0.1, 1.2]`.
    fn cathode() -> NamedDataset {
        let capacity = vec![0.1, 0.4, 0.8, 1.2];
        let voltage = capacity.iter().map(|q| 3.5 + 0.5 * q).collect();
        NamedDataset {
            name: "nmc".to_owned(),
            data: Dataset::from_columns([
                ("Ah-Cyc-Charge-0", Column::Float(capacity)),
                ("U[V]", Column::Float(voltage)),
                ("Command", commands("Charge CC", 4)),
            ])
            .unwrap(),
        }
    }

    #[test]
    fn cathode_minus_anode() {
        let full_cell = calculate_full_cell_voltage(&anode(), &cathode()).unwrap();
        assert_eq!(full_cell.name, "Full_Cell_graphite_+_nmc");
        assert_eq!(full_cell.data.num_rows(), 500);
        let q = full_cell.data.reals("Q (Ah)").unwrap();
        let u = full_cell.data.reals("U_full_cell (V)").unwrap();
        assert_approx_eq!(q[0], 0.1);
        assert_approx_eq!(q[499], 1.0);
        assert!(q.windows(2).all(|w| w[0] < w[1]));
        for (q, u) in q.iter().zip(&u) {
            assert_approx_eq!(*u, 3.0 + 0.8 * q, 1e-9);
        }
    }

    #[test]
    fn row_order_does_not_matter() {
        let expected = calculate_full_cell_voltage(&anode(), &cathode()).unwrap();
        let mut reversed = anode();
        let order = [5, 4, 3, 2, 1, 0];
        let reorder = |name: &str| match reversed.data.column(name).unwrap() {
            Column::Float(v) => Column::Float(order.iter().map(|&i| v[i]).collect()),
            Column::Text(v) => Column::Text(order.iter().map(|&i| v[i].clone()).collect()),
            Column::Int(v) => Column::Int(order.iter().map(|&i| v[i]).collect()),
        };
        let columns = ["Ah-Cyc-Discharge-0", "U[V]", "Command"].map(|name| (name, reorder(name)));
        reversed.data = Dataset::from_columns(columns).unwrap();
        let result = calculate_full_cell_voltage(&reversed, &cathode()).unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn missing_half_cycle() {
        let mut cathode = cathode();
        cathode.data = cathode
            .data
            .with_column("Command", commands("Discharge", 4))
            .unwrap();
        assert_eq!(
            calculate_full_cell_voltage(&anode(), &cathode),
            Err(FullCellError::MissingHalfCycleData {
                electrode: "cathode",
                half_cycle: "Charge"
            })
        );
    }

    #[test]
    fn disjoint_capacity_ranges() {
        let mut cathode = cathode();
        cathode.data = cathode
            .data
            .with_column(
                "Ah-Cyc-Charge-0",
                Column::Float(vec![2.0, 2.5, 3.0, 3.5]),
            )
            .unwrap();
        assert_eq!(
            calculate_full_cell_voltage(&anode(), &cathode),
            Err(FullCellError::NoOverlappingDomain {
                q_min: 2.0,
                q_max: 1.0
            })
        );
    }

    #[test]
    fn missing_capacity_column() {
        let mut anode = anode();
        anode.data = Dataset::from_columns([
            ("U[V]", Column::Float(vec![0.5, 0.4])),
            ("Command", commands("Discharge", 2)),
        ])
        .unwrap();
        assert_eq!(
            calculate_full_cell_voltage(&anode, &cathode()),
            Err(FullCellError::Dataset(DatasetError::ColumnNotFound(
                "Ah-Cyc-Discharge-0".to_owned()
            )))
        );
    }
}
