//! Collapses each run of equal values in a column down to the run's final row.
use crate::dataset::{Column, Dataset, DatasetError};
use std::iter::Peekable;
use tracing::instrument;

/// Iterator which reports, for each item, whether it is the last item of a run of equal items.
///
/// The final item always ends a run, as there is nothing after it to compare against.
/// Items which are not equal to themselves (e.g. `NaN`) always end a run.
pub struct RunEndIter<I>
where
    I: Iterator,
{
    source: Peekable<I>,
}

impl<I> Iterator for RunEndIter<I>
where
    I: Iterator,
    I::Item: PartialEq,
{
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        let current = self.source.next()?;
        Some(
            self.source
                .peek()
                .is_none_or(|following| current != *following),
        )
    }
}

/// Provides the `run_ends` method for any iterator over comparable items.
pub trait RunEndIterable<I>
where
    I: Iterator,
{
    fn run_ends(self) -> RunEndIter<I>;
}

impl<I> RunEndIterable<I> for I
where
    I: Iterator,
    I::Item: PartialEq,
{
    fn run_ends(self) -> RunEndIter<I> {
        RunEndIter {
            source: self.peekable(),
        }
    }
}

/// Mask selecting the last row before each change of value in the column.
fn run_end_mask(column: &Column) -> Vec<bool> {
    match column {
        Column::Float(values) => values.iter().run_ends().collect(),
        Column::Int(values) => values.iter().run_ends().collect(),
        Column::Text(values) => values.iter().run_ends().collect(),
    }
}

/// Keeps only the rows after which the value of `column` changes.
#[instrument(skip_all, level = "debug", fields(column = %column, rows_in = dataset.num_rows(), rows_out), err(level = "warn"))]
pub fn step_change_filter(dataset: &Dataset, column: &str) -> Result<Dataset, DatasetError> {
    let mask = run_end_mask(dataset.column(column)?);
    let filtered = dataset.filter_rows(&mask)?;
    tracing::Span::current().record("rows_out", filtered.num_rows());
    Ok(filtered)
}
