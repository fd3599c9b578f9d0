//! Derives a monotonically non-decreasing absolute cycle number from a raw cycle counter.
//!
//! Cyclers restart or reuse their cycle counter between programme phases. The absolute cycle
//! advances by exactly one every time the counter moves to a value different from the previous
//! raw value, unless that value is the one currently expected. Jumps of more than one are
//! collapsed into a single increment, so `[1, 1, 3, 3]` becomes `[1, 1, 2, 2]`.
//!
//! # Example
//! ```rust
//! use h2f_common::Count;
//! use h2f_pipeline::cycles::AbsoluteCycleIterable;
//!
//! let raw: [Count; 10] = [1, 1, 2, 2, 1, 1, 2, 2, 3, 4];
//! let absolute = raw
//!     .into_iter()
//!     .absolute_cycles()
//!     .collect::<Vec<_>>();
//! assert_eq!(absolute, [1, 1, 2, 2, 3, 3, 4, 4, 5, 6]);
//! ```
use crate::dataset::{Column, Dataset, DatasetError, GroupKey};
use h2f_common::{Count, columns};
use tracing::instrument;

/// Iterator which converts raw cycle counts into absolute cycle numbers.
#[derive(Clone)]
pub struct AbsoluteCycleIter<I>
where
    I: Iterator<Item = Count>,
{
    source: I,
    /// The absolute cycle currently being emitted.
    expected_cycle: Count,
    /// The raw value of the previous row.
    last_cycle: Count,
}

impl<I> Iterator for AbsoluteCycleIter<I>
where
    I: Iterator<Item = Count>,
{
    type Item = Count;

    fn next(&mut self) -> Option<Count> {
        let cycle = self.source.next()?;
        if cycle != self.expected_cycle && cycle != self.last_cycle {
            self.expected_cycle += 1;
        }
        self.last_cycle = cycle;
        Some(self.expected_cycle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.source.size_hint()
    }
}

/// Provides the `absolute_cycles` method for any iterator over raw cycle counts.
pub trait AbsoluteCycleIterable<I>
where
    I: Iterator<Item = Count>,
{
    fn absolute_cycles(self) -> AbsoluteCycleIter<I>;
}

impl<I> AbsoluteCycleIterable<I> for I
where
    I: Iterator<Item = Count>,
{
    /// Creates an [AbsoluteCycleIter], counting from one.
    fn absolute_cycles(self) -> AbsoluteCycleIter<I> {
        AbsoluteCycleIter {
            source: self,
            expected_cycle: 1,
            last_cycle: 1,
        }
    }
}

/// Returns a copy of the dataset with an `abs_cycle` column derived from `Cyc-Count`.
#[instrument(skip_all, level = "debug", fields(rows = dataset.num_rows()), err(level = "warn"))]
pub fn compute_absolute_cycle(dataset: &Dataset) -> Result<Dataset, DatasetError> {
    let absolute = dataset
        .integers(columns::CYCLE_COUNT)?
        .iter()
        .copied()
        .absolute_cycles()
        .collect();
    dataset
        .clone()
        .with_column(columns::ABS_CYCLE, Column::Int(absolute))
}

/// Distinct cycle numbers available for cycle selection, in ascending order.
///
/// Uses `Cyc-Count`, or `abs_cycle` if the raw counter is absent. Returns an empty list if
/// neither column is present. Rows without a cycle number are ignored.
pub fn cycle_options(dataset: &Dataset) -> Result<Vec<Count>, DatasetError> {
    let Some(column) = [columns::CYCLE_COUNT, columns::ABS_CYCLE]
        .into_iter()
        .find(|name| dataset.has_column(name))
    else {
        return Ok(Vec::new());
    };
    Ok(dataset
        .unique_keys(column)?
        .into_iter()
        .filter_map(|key| match key {
            GroupKey::Int(cycle) => Some(cycle),
            GroupKey::Text(_) => None,
        })
        .collect())
}
