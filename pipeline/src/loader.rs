//! Reads cycler exports into a [Dataset], and writes datasets back out as CSV.
//!
//! An export starts with a block of metadata lines, followed by a comma separated table with a
//! single header line. Column types are inferred: a column is integer if every cell parses as an
//! integer, float if every cell parses as a number (empty cells become `NaN`), and text otherwise.
use crate::dataset::{Column, Dataset, DatasetError, Value};
use csv::{ReaderBuilder, Trim, Writer};
use h2f_common::{Count, Real};
use std::{
    fs::File,
    io::{Read, Write},
    num::ParseFloatError,
    path::Path,
};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Number of metadata lines written by the cycler software before the table.
pub const DEFAULT_HEADER_LINES: usize = 12;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("No column header found after the metadata block")]
    NoHeader,
    #[error("No data rows found")]
    NoRows,
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// How the metadata block preceding the table is recognised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataHeader {
    /// A fixed number of lines.
    Fixed(usize),
    /// Every leading line beginning with `~`.
    TildePrefixed,
}

impl Default for MetadataHeader {
    fn default() -> Self {
        MetadataHeader::Fixed(DEFAULT_HEADER_LINES)
    }
}

impl MetadataHeader {
    /// Returns the text following the metadata block.
    fn strip<'a>(&self, text: &'a str) -> &'a str {
        let mut lines = text.split_inclusive('\n');
        let skipped: usize = match self {
            MetadataHeader::Fixed(count) => lines.by_ref().take(*count).map(str::len).sum(),
            MetadataHeader::TildePrefixed => lines
                .take_while(|line| line.starts_with('~'))
                .map(str::len)
                .sum(),
        };
        text.get(skipped..).unwrap_or_default()
    }
}

fn parse_real(cell: &str) -> Result<Real, ParseFloatError> {
    if cell.is_empty() {
        Ok(Real::NAN)
    } else {
        cell.parse()
    }
}

fn infer_column(cells: Vec<String>) -> Column {
    if let Ok(values) = cells
        .iter()
        .map(|cell| cell.parse::<Count>())
        .collect::<Result<Vec<_>, _>>()
    {
        Column::Int(values)
    } else if let Ok(values) = cells
        .iter()
        .map(|cell| parse_real(cell))
        .collect::<Result<Vec<_>, _>>()
    {
        Column::Float(values)
    } else {
        Column::Text(cells)
    }
}

/// Parses an export from any reader.
pub fn read_dataset(mut reader: impl Read, header: MetadataHeader) -> Result<Dataset, LoadError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut csv = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(header.strip(&text).as_bytes());
    let names = csv
        .headers()?
        .iter()
        .map(str::to_owned)
        .collect::<Vec<_>>();
    if names.iter().all(String::is_empty) {
        return Err(LoadError::NoHeader);
    }

    let mut cells = vec![Vec::<String>::new(); names.len()];
    let mut skipped = 0;
    for record in csv.records() {
        let record = record?;
        if record.len() != names.len() {
            skipped += 1;
            continue;
        }
        for (column, cell) in cells.iter_mut().zip(record.iter()) {
            column.push(cell.to_owned());
        }
    }
    if skipped > 0 {
        warn!("Skipped {skipped} malformed lines");
    }
    if cells.first().is_none_or(Vec::is_empty) {
        return Err(LoadError::NoRows);
    }
    Ok(Dataset::from_columns(
        names.into_iter().zip(cells.into_iter().map(infer_column)),
    )?)
}

/// Loads an export from a file.
#[instrument(skip_all, fields(path = %path.as_ref().display()), err(level = "warn"))]
pub fn load(path: impl AsRef<Path>, header: MetadataHeader) -> Result<Dataset, LoadError> {
    let dataset = read_dataset(File::open(path.as_ref())?, header)?;
    info!(
        "Loaded {} rows with columns: {}",
        dataset.num_rows(),
        dataset.column_names().collect::<Vec<_>>().join(", ")
    );
    Ok(dataset)
}

/// `NaN` is written as an empty cell, so that it is read back as `NaN`. Other floats always carry
/// a decimal point or an exponent, so whole numbers are not read back as integers.
fn format_cell(value: Value) -> String {
    match value {
        Value::Float(v) if v.is_nan() => String::new(),
        Value::Float(v) => format!("{v:?}"),
        other => other.to_string(),
    }
}

/// Writes the dataset as CSV with a single header line.
pub fn write_dataset(dataset: &Dataset, writer: impl Write) -> Result<(), LoadError> {
    let mut csv = Writer::from_writer(writer);
    csv.write_record(dataset.column_names())?;
    for row in (0..dataset.num_rows()).filter_map(|index| dataset.row(index)) {
        csv.write_record(row.into_iter().map(format_cell))?;
    }
    csv.flush()?;
    Ok(())
}

/// Saves the dataset to a CSV file.
#[instrument(skip_all, fields(path = %path.as_ref().display(), rows = dataset.num_rows()), err(level = "warn"))]
pub fn save(dataset: &Dataset, path: impl AsRef<Path>) -> Result<(), LoadError> {
    write_dataset(dataset, File::create(path.as_ref())?)?;
    debug!("Saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
~Cycler export
~Channel 3
Time[h], U[V], I[A], Command, Cyc-Count, Line
0.0, 3.01, 0.0, Pause, 1, 1
0.1, 3.52, 0.5, Charge, 1, 2
0.2, 4.05, 0.5, Charge CC, 1, 2
0.3, 3.90, -0.5, Discharge, 2, 3, extra
0.4, , -0.5, Discharge, 2, 3
";

    #[test]
    fn tilde_header() {
        let dataset = read_dataset(EXPORT.as_bytes(), MetadataHeader::TildePrefixed).unwrap();
        assert_eq!(
            dataset.column_names().collect::<Vec<_>>(),
            ["Time[h]", "U[V]", "I[A]", "Command", "Cyc-Count", "Line"]
        );
        assert_eq!(dataset.num_rows(), 4);
        assert_eq!(dataset.integers("Cyc-Count").unwrap(), &[1, 1, 1, 2]);
        assert_eq!(dataset.texts("Command").unwrap()[2], "Charge CC");
        let voltage = dataset.reals("U[V]").unwrap();
        assert_eq!(voltage[..3], [3.01, 3.52, 4.05]);
        assert!(voltage[3].is_nan());
    }

    #[test]
    fn fixed_header() {
        let dataset = read_dataset(EXPORT.as_bytes(), MetadataHeader::Fixed(2)).unwrap();
        assert_eq!(dataset.num_rows(), 4);
        assert!(matches!(dataset.column("Time[h]"), Ok(Column::Float(_))));
    }

    #[test]
    fn default_header_skips_twelve_lines() {
        let metadata = "meta\n".repeat(12);
        let text = format!("{metadata}a,b\n1,x\n");
        let dataset = read_dataset(text.as_bytes(), MetadataHeader::default()).unwrap();
        assert_eq!(dataset.integers("a").unwrap(), &[1]);
        assert_eq!(dataset.texts("b").unwrap(), &["x"]);
    }

    #[test]
    fn header_only() {
        let result = read_dataset("a,b\n".as_bytes(), MetadataHeader::Fixed(0));
        assert!(matches!(result, Err(LoadError::NoRows)));
    }

    #[test]
    fn nothing_after_metadata() {
        let result = read_dataset("~only metadata\n".as_bytes(), MetadataHeader::TildePrefixed);
        assert!(matches!(result, Err(LoadError::NoHeader)));
    }

    #[test]
    fn write_and_read_back() {
        let dataset = read_dataset(EXPORT.as_bytes(), MetadataHeader::TildePrefixed).unwrap();
        let mut buffer = Vec::new();
        write_dataset(&dataset, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("Time[h],U[V],I[A],Command,Cyc-Count,Line\n0.0,3.01,0.0,Pause,1,1\n"));
        assert!(text.ends_with("0.4,,-0.5,Discharge,2,3\n"));
    }

    #[test]
    fn whole_number_floats_stay_floats() {
        let dataset = Dataset::from_columns([
            ("Ah-Cyc-Charge-0", Column::Float(vec![0.0, 0.0, 2.0])),
            ("Time[h]", Column::Float(vec![1e-7, 1e16, -3.0])),
            ("Line", Column::Int(vec![1, 2, 3])),
        ])
        .unwrap();
        let mut buffer = Vec::new();
        write_dataset(&dataset, &mut buffer).unwrap();
        let read_back = read_dataset(buffer.as_slice(), MetadataHeader::Fixed(0)).unwrap();
        assert_eq!(read_back, dataset);
    }
}
