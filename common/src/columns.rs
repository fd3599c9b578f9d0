//! Column names written by the cycler software, and the names of the columns derived from them.

/// Elapsed test time in hours.
pub const TIME: &str = "Time[h]";
/// Cell voltage in volts.
pub const VOLTAGE: &str = "U[V]";
/// Cell current in amperes.
pub const CURRENT: &str = "I[A]";
/// Name of the programme step, e.g. `"Charge"`, `"Discharge"` or `"Pause"`.
pub const COMMAND: &str = "Command";
/// Raw cycle counter, which may restart between phases.
pub const CYCLE_COUNT: &str = "Cyc-Count";
/// Capacity accumulated during the current charge phase.
pub const CHARGE_CAPACITY: &str = "Ah-Cyc-Charge-0";
/// Capacity accumulated during the current discharge phase.
pub const DISCHARGE_CAPACITY: &str = "Ah-Cyc-Discharge-0";
/// Row or step identifier.
pub const LINE: &str = "Line";

pub const ABS_CYCLE: &str = "abs_cycle";
pub const DU_DQ: &str = "dU/dQ";
pub const VOLTAGE_NORMALIZED: &str = "U_normalized";
pub const OFFSET_SUFFIX: &str = "_offset";

/// Capacity axis of a synthesised full cell.
pub const FULL_CELL_CAPACITY: &str = "Q (Ah)";
/// Voltage axis of a synthesised full cell.
pub const FULL_CELL_VOLTAGE: &str = "U_full_cell (V)";
/// Sample index column added to generated fit data.
pub const FIT_ROW: &str = "row";

/// Command names used to select rows.
pub mod command {
    pub const PAUSE: &str = "Pause";
    pub const CHARGE: &str = "Charge";
    pub const DISCHARGE: &str = "Discharge";
}
